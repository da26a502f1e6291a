//! Message relay: one correction cycle per inbound update.
//!
//! The relay is the only place that turns provider/guard/validation failures
//! into replies. Nothing returned from here is an error.

use std::{sync::Arc, time::Duration};

use crate::{
    config::{Config, MAX_PROVIDER_RETRIES},
    domain::Utterance,
    errors::Error,
    formatting::format_correction,
    guard::Guard,
    messaging::types::{Command, IncomingUpdate},
    provider::{CorrectionProvider, CorrectionResult},
    reply::{self, Reply, ReplyAction},
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct RelaySettings {
    pub max_examples: usize,
    pub provider_timeout: Duration,
    pub provider_retries: u32,
    pub require_english: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            max_examples: 3,
            provider_timeout: Duration::from_secs(10),
            provider_retries: MAX_PROVIDER_RETRIES,
            require_english: true,
        }
    }
}

impl From<&Config> for RelaySettings {
    fn from(cfg: &Config) -> Self {
        Self {
            max_examples: cfg.max_examples,
            provider_timeout: cfg.provider_timeout,
            provider_retries: cfg.provider_retries.min(MAX_PROVIDER_RETRIES),
            require_english: cfg.require_english,
        }
    }
}

pub struct MessageRelay {
    provider: Arc<dyn CorrectionProvider>,
    guard: Option<Arc<dyn Guard>>,
    settings: RelaySettings,
}

impl MessageRelay {
    pub fn new(provider: Arc<dyn CorrectionProvider>, settings: RelaySettings) -> Self {
        Self {
            provider,
            guard: None,
            settings,
        }
    }

    pub fn with_guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Answer any inbound update.
    pub async fn respond(&self, update: &IncomingUpdate) -> Reply {
        match update {
            IncomingUpdate::Text(msg) => {
                self.handle(Utterance {
                    text: msg.text.clone(),
                    user_id: msg.user_id,
                    timestamp: msg.timestamp,
                })
                .await
            }
            IncomingUpdate::Command(cmd) => self.handle_command(cmd),
            IncomingUpdate::Action(sel) => self.handle_action(&sel.action_id),
        }
    }

    /// Static greeting for `/start`.
    pub fn greet(&self) -> Reply {
        reply::welcome()
    }

    pub fn handle_command(&self, cmd: &Command) -> Reply {
        match cmd.name.as_str() {
            "start" => self.greet(),
            "help" => reply::help(),
            "rules" => reply::rules(),
            "about" => reply::about(),
            "check" => reply::check_prompt(),
            "stats" => reply::stats(),
            other => {
                tracing::debug!(command = other, "unknown command");
                reply::help()
            }
        }
    }

    pub fn handle_action(&self, action_id: &str) -> Reply {
        match ReplyAction::from_id(action_id) {
            Some(ReplyAction::CheckGrammar) => reply::check_prompt(),
            Some(ReplyAction::ViewRules) => reply::rules(),
            Some(ReplyAction::Help) => reply::help(),
            Some(ReplyAction::About) => reply::about(),
            None => {
                tracing::debug!(action_id, "unknown action");
                reply::help()
            }
        }
    }

    /// Run one correction cycle.
    pub async fn handle(&self, utterance: Utterance) -> Reply {
        let text = utterance.text.trim();
        if text.is_empty() {
            tracing::debug!(user_id = utterance.user_id.0, "empty utterance");
            return reply::empty_input();
        }
        if self.settings.require_english && !text.chars().any(|c| c.is_ascii_alphabetic()) {
            tracing::debug!(user_id = utterance.user_id.0, "non-english utterance");
            return reply::not_english();
        }

        if let Some(guard) = &self.guard {
            if !guard.allow(utterance.user_id).await {
                return reply::guard_rejected();
            }
        }

        match self.correct_with_retry(text).await {
            Ok(result) => format_correction(text, &result, self.settings.max_examples),
            Err(e) => {
                tracing::warn!(
                    user_id = utterance.user_id.0,
                    provider = self.provider.name(),
                    error = %e,
                    "correction failed"
                );
                reply::unavailable()
            }
        }
    }

    async fn correct_with_retry(&self, text: &str) -> Result<CorrectionResult> {
        let retries = self.settings.provider_retries.min(MAX_PROVIDER_RETRIES);
        let mut attempt = 0u32;
        loop {
            match self.correct_once(text).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < retries => {
                    attempt += 1;
                    tracing::info!(
                        provider = self.provider.name(),
                        attempt,
                        error = %e,
                        "retrying correction"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn correct_once(&self, text: &str) -> Result<CorrectionResult> {
        let deadline = self.settings.provider_timeout;
        match tokio::time::timeout(deadline, self.provider.correct(text, deadline)).await {
            Ok(result) => result,
            Err(_) => Err(Error::ProviderTimeout(deadline)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::{
        domain::{ChatId, UserId},
        messaging::types::{ActionSelection, TextMessage},
        reply::ReplyKind,
    };

    enum Behavior {
        Return(CorrectionResult),
        Fail(fn() -> Error),
        Hang,
        /// Hang on the first call, answer afterwards.
        HangOnce(CorrectionResult),
    }

    struct FakeProvider {
        behavior: Behavior,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CorrectionProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn correct(&self, text: &str, _timeout: Duration) -> Result<CorrectionResult> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(text.to_string());
            match &self.behavior {
                Behavior::Return(r) => Ok(r.clone()),
                Behavior::Fail(make) => Err(make()),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(Error::External("unreachable".to_string()))
                }
                Behavior::HangOnce(r) => {
                    if n == 0 {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                    Ok(r.clone())
                }
            }
        }
    }

    struct DenyAll {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Guard for DenyAll {
        async fn allow(&self, _user_id: UserId) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            false
        }
    }

    fn apple() -> CorrectionResult {
        CorrectionResult {
            corrected_text: "I have an apple.".to_string(),
            explanation: "Subject-verb agreement and article usage.".to_string(),
            examples: vec![
                "She has an apple.".to_string(),
                "They have apples.".to_string(),
            ],
            has_changes: true,
        }
    }

    fn settings() -> RelaySettings {
        RelaySettings {
            provider_timeout: Duration::from_millis(50),
            ..RelaySettings::default()
        }
    }

    fn relay(provider: Arc<FakeProvider>) -> MessageRelay {
        MessageRelay::new(provider, settings())
    }

    fn say(text: &str) -> Utterance {
        Utterance::new(UserId(1), text)
    }

    #[tokio::test]
    async fn end_to_end_apple_example() {
        let provider = FakeProvider::new(Behavior::Return(apple()));
        let reply = relay(provider.clone()).handle(say("I has a apple.")).await;

        assert_eq!(reply.kind, ReplyKind::Corrected);
        let b = &reply.body;
        let positions = [
            b.find("I has a apple.").unwrap(),
            b.find("I have an apple.").unwrap(),
            b.find("Subject-verb agreement and article usage.").unwrap(),
            b.find("She has an apple.").unwrap(),
            b.find("They have apples.").unwrap(),
        ];
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn provider_receives_trimmed_text() {
        let provider = FakeProvider::new(Behavior::Return(apple()));
        relay(provider.clone())
            .handle(say("   I has a apple.\n"))
            .await;
        assert_eq!(
            provider.seen.lock().unwrap().clone(),
            vec!["I has a apple.".to_string()]
        );
    }

    #[tokio::test]
    async fn blank_input_short_circuits() {
        let provider = FakeProvider::new(Behavior::Return(apple()));
        let relay = relay(provider.clone());
        for text in ["", "   ", "\n\t "] {
            assert_eq!(relay.handle(say(text)).await, reply::empty_input());
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn non_english_input_is_rejected_locally() {
        let provider = FakeProvider::new(Behavior::Return(apple()));
        let relay = relay(provider.clone());
        assert_eq!(relay.handle(say("Привет мир")).await, reply::not_english());
        assert_eq!(relay.handle(say("12345 !!")).await, reply::not_english());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn english_check_can_be_disabled() {
        let mut unchanged = apple();
        unchanged.has_changes = false;
        let provider = FakeProvider::new(Behavior::Return(unchanged));
        let relay = MessageRelay::new(
            provider.clone(),
            RelaySettings {
                require_english: false,
                ..settings()
            },
        );
        let reply = relay.handle(say("12345")).await;
        assert_eq!(reply.kind, ReplyKind::AlreadyCorrect);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn unchanged_sentences_report_no_errors() {
        let mut unchanged = apple();
        unchanged.has_changes = false;
        let provider = FakeProvider::new(Behavior::Return(unchanged));
        let relay = relay(provider);

        for text in ["I have an apple.", "  The cat sleeps. ", "x"] {
            let reply = relay.handle(say(text)).await;
            assert_eq!(reply.kind, ReplyKind::AlreadyCorrect);
            assert!(reply.body.contains("No grammar errors found"));
            assert!(!reply.body.contains("She has an apple."));
        }
    }

    #[tokio::test]
    async fn example_count_is_min_of_n_and_max() {
        for n in 0..6 {
            let mut r = apple();
            r.examples = (0..n).map(|i| format!("Sample {i}.")).collect();
            let reply = relay(FakeProvider::new(Behavior::Return(r)))
                .handle(say("I has a apple."))
                .await;
            assert_eq!(reply.body.matches("• ").count(), n.min(3));
        }
    }

    #[tokio::test]
    async fn provider_failure_becomes_unavailable_reply() {
        let provider = FakeProvider::new(Behavior::Fail(|| {
            Error::ProviderPayload("secret internal detail".to_string())
        }));
        let reply = relay(provider.clone()).handle(say("I has a apple.")).await;
        assert_eq!(reply, reply::unavailable());
        assert!(!reply.body.contains("secret"));
        // Malformed payloads are not retried.
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let provider = FakeProvider::new(Behavior::Fail(|| {
            Error::ProviderUnavailable("connection reset".to_string())
        }));
        let reply = relay(provider.clone()).handle(say("I has a apple.")).await;
        assert_eq!(reply, reply::unavailable());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn timeout_matches_unavailable_reply_within_one_retry() {
        let provider = FakeProvider::new(Behavior::Hang);
        let started = tokio::time::Instant::now();
        let reply = relay(provider.clone()).handle(say("I has a apple.")).await;

        assert_eq!(reply, reply::unavailable());
        assert_eq!(provider.calls(), 2);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn retry_after_timeout_can_succeed() {
        let provider = FakeProvider::new(Behavior::HangOnce(apple()));
        let reply = relay(provider.clone()).handle(say("I has a apple.")).await;
        assert_eq!(reply.kind, ReplyKind::Corrected);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let provider = FakeProvider::new(Behavior::Hang);
        let relay = MessageRelay::new(
            provider.clone(),
            RelaySettings {
                provider_retries: 0,
                ..settings()
            },
        );
        assert_eq!(relay.handle(say("I has a apple.")).await, reply::unavailable());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn retries_above_the_cap_are_ignored() {
        let provider = FakeProvider::new(Behavior::Hang);
        let relay = MessageRelay::new(
            provider.clone(),
            RelaySettings {
                provider_retries: 10,
                ..settings()
            },
        );
        relay.handle(say("I has a apple.")).await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn guard_rejection_skips_provider() {
        let provider = FakeProvider::new(Behavior::Return(apple()));
        let guard = Arc::new(DenyAll {
            calls: AtomicUsize::new(0),
        });
        let relay = relay(provider.clone()).with_guard(guard.clone());

        assert_eq!(relay.handle(say("I has a apple.")).await, reply::guard_rejected());
        assert_eq!(provider.calls(), 0);
        assert_eq!(guard.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn guard_is_not_consulted_for_invalid_input() {
        let provider = FakeProvider::new(Behavior::Return(apple()));
        let guard = Arc::new(DenyAll {
            calls: AtomicUsize::new(0),
        });
        let relay = relay(provider).with_guard(guard.clone());
        assert_eq!(relay.handle(say("  ")).await, reply::empty_input());
        assert_eq!(guard.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn commands_and_actions_map_to_static_replies() {
        let provider = FakeProvider::new(Behavior::Return(apple()));
        let relay = relay(provider.clone());

        let cmd = |name: &str| {
            IncomingUpdate::Command(Command {
                chat_id: ChatId(1),
                user_id: UserId(1),
                name: name.to_string(),
            })
        };
        let action = |id: &str| {
            IncomingUpdate::Action(ActionSelection {
                chat_id: ChatId(1),
                user_id: UserId(1),
                action_id: id.to_string(),
            })
        };

        assert_eq!(relay.respond(&cmd("start")).await, reply::welcome());
        assert_eq!(relay.respond(&cmd("help")).await, reply::help());
        assert_eq!(relay.respond(&cmd("rules")).await, reply::rules());
        assert_eq!(relay.respond(&cmd("about")).await, reply::about());
        assert_eq!(relay.respond(&cmd("stats")).await, reply::stats());
        assert_eq!(relay.respond(&cmd("unknown")).await, reply::help());

        assert_eq!(relay.respond(&action("check")).await, reply::check_prompt());
        assert_eq!(relay.respond(&action("rules")).await, reply::rules());
        assert_eq!(relay.respond(&action("about")).await, reply::about());
        assert_eq!(relay.respond(&action("bogus")).await, reply::help());

        assert_eq!(relay.greet().actions, reply::standard_actions());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn text_updates_run_a_correction_cycle() {
        let provider = FakeProvider::new(Behavior::Return(apple()));
        let relay = relay(provider.clone());
        let update = IncomingUpdate::Text(TextMessage {
            chat_id: ChatId(9),
            user_id: UserId(9),
            text: "I has a apple.".to_string(),
            timestamp: Utc::now(),
        });
        assert_eq!(relay.respond(&update).await.kind, ReplyKind::Corrected);
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn settings_from_config_clamp_retries() {
        let cfg = Config {
            telegram_bot_token: "x".to_string(),
            grammar_api_url: "https://x".to_string(),
            grammar_api_key: None,
            provider_timeout: Duration::from_secs(2),
            provider_retries: 7,
            max_examples: 1,
            require_english: false,
            rate_limit_enabled: true,
            rate_limit_requests: 20,
            rate_limit_window: Duration::from_secs(60),
            telegram_message_limit: 4096,
            telegram_safe_limit: 4000,
        };
        let s = RelaySettings::from(&cfg);
        assert_eq!(s.provider_retries, 1);
        assert_eq!(s.max_examples, 1);
        assert_eq!(s.provider_timeout, Duration::from_secs(2));
        assert!(!s.require_english);
    }
}
