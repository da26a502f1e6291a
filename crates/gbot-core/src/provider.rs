use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

/// Output of the grammar service for one sentence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CorrectionResult {
    pub corrected_text: String,
    pub explanation: String,
    pub examples: Vec<String>,
    pub has_changes: bool,
}

/// Port for the external grammar-correction service.
///
/// Implementations should honour `timeout` themselves where the client supports
/// it; the relay additionally bounds every call with the same deadline.
#[async_trait]
pub trait CorrectionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn correct(&self, text: &str, timeout: Duration) -> Result<CorrectionResult>;
}
