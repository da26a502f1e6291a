use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::ChatAction,
    reply::Reply,
    Result,
};

/// Cross-messenger outbound port.
///
/// Adapters own presentation: how `Reply::actions` become buttons is up to them.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;

    /// Send a reply with its follow-up actions attached.
    async fn send_reply(&self, chat_id: ChatId, reply: &Reply) -> Result<MessageRef>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

/// Lifecycle of an inbound transport (polling loop, webhook server, ...).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Begin delivering updates. Returns once the transport is running.
    async fn start(&self) -> Result<()>;

    /// Stop delivering updates and wait for in-flight handlers to finish.
    async fn stop(&self) -> Result<()>;
}
