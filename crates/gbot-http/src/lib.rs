//! HTTP correction provider.
//!
//! Talks to a REST/JSON grammar service: `POST {endpoint}` with
//! `{"text": "..."}` and expects a correction object back.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gbot_core::{
    errors::Error,
    provider::{CorrectionProvider, CorrectionResult},
    Result,
};

/// How much of an error body we keep for logs.
const ERROR_BODY_PREVIEW: usize = 200;

#[derive(Clone, Debug)]
pub struct HttpCorrectionProvider {
    endpoint: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct CorrectionRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CorrectionPayload {
    #[serde(alias = "correctedText")]
    corrected_text: String,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    examples: Option<Vec<String>>,
    #[serde(default, alias = "hasChanges")]
    has_changes: Option<bool>,
}

impl HttpCorrectionProvider {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CorrectionProvider for HttpCorrectionProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn correct(&self, text: &str, timeout: Duration) -> Result<CorrectionResult> {
        let mut req = self
            .http
            .post(&self.endpoint)
            .timeout(timeout)
            .json(&CorrectionRequest { text });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| map_request_error(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::ProviderUnavailable(format!(
                "grammar service returned {status}: {}",
                body.chars().take(ERROR_BODY_PREVIEW).collect::<String>()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| map_request_error(e, timeout))?;
        tracing::debug!(bytes = body.len(), "grammar service responded");
        parse_correction(text, &body)
    }
}

fn map_request_error(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        return Error::ProviderTimeout(timeout);
    }
    Error::ProviderUnavailable(format!("grammar request error: {e}"))
}

/// Decode a service response for `input`.
///
/// A missing `has_changes` flag is derived by comparing the correction with the
/// input.
pub fn parse_correction(input: &str, body: &str) -> Result<CorrectionResult> {
    let payload: CorrectionPayload = serde_json::from_str(body)
        .map_err(|e| Error::ProviderPayload(format!("undecodable response: {e}")))?;

    if payload.corrected_text.trim().is_empty() {
        return Err(Error::ProviderPayload(
            "response has an empty corrected_text".to_string(),
        ));
    }

    let has_changes = payload
        .has_changes
        .unwrap_or_else(|| payload.corrected_text.trim() != input.trim());

    Ok(CorrectionResult {
        corrected_text: payload.corrected_text,
        explanation: payload.explanation.unwrap_or_default(),
        examples: payload.examples.unwrap_or_default(),
        has_changes,
    })
}
