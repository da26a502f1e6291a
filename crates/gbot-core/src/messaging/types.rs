use chrono::{DateTime, Utc};

use crate::domain::{ChatId, UserId};

/// Prefix of inline-keyboard callback data produced for reply actions.
pub const ACTION_CALLBACK_PREFIX: &str = "action:";

/// Cross-messenger incoming update model.
///
/// Telegram-specific fields live in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Command(Command),
    Text(TextMessage),
    Action(ActionSelection),
}

#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A follow-up action picked from a reply keyboard.
#[derive(Clone, Debug)]
pub struct ActionSelection {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub action_id: String,
}

pub fn action_callback_data(action_id: &str) -> String {
    format!("{ACTION_CALLBACK_PREFIX}{action_id}")
}

pub fn parse_action_callback(data: &str) -> Option<&str> {
    data.strip_prefix(ACTION_CALLBACK_PREFIX)
        .filter(|id| !id.is_empty())
}

/// Outgoing "chat action" (typing indicator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
}
