use std::{env, time::Duration};

use crate::{errors::Error, Result};

/// Upper bound on automatic provider retries.
pub const MAX_PROVIDER_RETRIES: u32 = 1;

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,

    // Correction provider
    pub grammar_api_url: String,
    pub grammar_api_key: Option<String>,
    pub provider_timeout: Duration,
    pub provider_retries: u32,

    // Reply shape
    pub max_examples: usize,
    pub require_english: bool,

    // Rate limiting
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,

    // Telegram limits
    pub telegram_message_limit: usize,
    pub telegram_safe_limit: usize,
}

impl Config {
    /// Load from the process environment, after an optional `.env` file.
    ///
    /// Variables already set in the environment win over `.env` entries.
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(Error::Config(format!("failed to read .env: {e}")));
            }
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;
        let grammar_api_url = get("GRAMMAR_API_URL").ok_or_else(|| {
            Error::Config("GRAMMAR_API_URL environment variable is required".to_string())
        })?;
        if !grammar_api_url.starts_with("http://") && !grammar_api_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "GRAMMAR_API_URL must be an http(s) URL, got: {grammar_api_url}"
            )));
        }
        let grammar_api_key = get("GRAMMAR_API_KEY");

        let provider_timeout_ms = parse_or(&get, "PROVIDER_TIMEOUT_MS", 10_000u64)?;
        if provider_timeout_ms == 0 {
            return Err(Error::Config(
                "PROVIDER_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }
        let provider_timeout = Duration::from_millis(provider_timeout_ms);
        let provider_retries =
            parse_or(&get, "PROVIDER_RETRIES", MAX_PROVIDER_RETRIES)?.min(MAX_PROVIDER_RETRIES);

        let max_examples = parse_or(&get, "MAX_EXAMPLES", 3usize)?;
        let require_english = parse_bool_or(&get, "REQUIRE_ENGLISH", true);

        let rate_limit_enabled = parse_bool_or(&get, "RATE_LIMIT_ENABLED", true);
        let rate_limit_requests = parse_or(&get, "RATE_LIMIT_REQUESTS", 20u32)?;
        let rate_limit_window = Duration::from_secs(parse_or(&get, "RATE_LIMIT_WINDOW", 60u64)?);

        let telegram_message_limit = parse_or(&get, "TELEGRAM_MESSAGE_LIMIT", 4096usize)?;
        let telegram_safe_limit =
            parse_or(&get, "TELEGRAM_SAFE_LIMIT", 4000usize)?.min(telegram_message_limit);

        Ok(Self {
            telegram_bot_token,
            grammar_api_url,
            grammar_api_key,
            provider_timeout,
            provider_retries,
            max_examples,
            require_english,
            rate_limit_enabled,
            rate_limit_requests,
            rate_limit_window,
            telegram_message_limit,
            telegram_safe_limit,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}"))),
    }
}

fn parse_bool_or(get: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    get(key)
        .map(|s| {
            matches!(
                s.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
