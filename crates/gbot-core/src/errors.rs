use std::time::Duration;

/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the relay can
/// decide between retrying and answering with a generic "try again later".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("external error: {0}")]
    External(String),

    #[error("correction provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("correction provider timed out after {0:?}")]
    ProviderTimeout(Duration),

    #[error("malformed provider payload: {0}")]
    ProviderPayload(String),
}

impl Error {
    /// Transient provider failures worth one more attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ProviderUnavailable(_) | Error::ProviderTimeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
