//! Telegram update handlers.
//!
//! Each handler converts a teloxide update into a `gbot-core` IncomingUpdate,
//! asks the relay for a reply and hands it to the messenger. Failures to send
//! are logged; they never stop the dispatcher.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use gbot_core::{
    domain::{ChatId, UserId},
    messaging::{
        delivery::deliver_reply,
        types::{
            parse_action_callback, ActionSelection, ChatAction, Command, IncomingUpdate,
            TextMessage,
        },
    },
};

use crate::router::AppState;

mod commands;

pub use commands::{is_command, parse_command};

/// Classify a text message as a command or a sentence to correct.
pub fn text_update(
    chat_id: ChatId,
    user_id: UserId,
    text: &str,
    timestamp: DateTime<Utc>,
) -> IncomingUpdate {
    if is_command(text) {
        return IncomingUpdate::Command(Command {
            chat_id,
            user_id,
            name: parse_command(text),
        });
    }

    IncomingUpdate::Text(TextMessage {
        chat_id,
        user_id,
        text: text.to_string(),
        timestamp,
    })
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = UserId(user.id.0 as i64);

    let Some(text) = msg.text() else {
        tracing::debug!(chat_id = chat_id.0, "ignoring non-text message");
        return Ok(());
    };

    let update = text_update(chat_id, user_id, text, msg.date);

    // Sequentialize sentences per chat; commands answer immediately.
    let _guard = match &update {
        IncomingUpdate::Text(_) => {
            let guard = state.chat_locks.lock_chat(chat_id.0).await;
            if let Err(e) = state
                .messenger
                .send_chat_action(chat_id, ChatAction::Typing)
                .await
            {
                tracing::debug!(chat_id = chat_id.0, error = %e, "typing indicator failed");
            }
            Some(guard)
        }
        _ => None,
    };

    let reply = state.relay.respond(&update).await;
    send(&state, chat_id, &reply).await;
    Ok(())
}

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    // Always answer the callback so the client stops its spinner.
    if let Err(e) = state.messenger.answer_callback_query(&q.id, None).await {
        tracing::debug!(error = %e, "answer_callback_query failed");
    }

    let data = q.data.clone().unwrap_or_default();
    let Some(chat_id) = q.message.as_ref().map(|m| ChatId(m.chat.id.0)) else {
        return Ok(());
    };
    let Some(action_id) = parse_action_callback(&data) else {
        tracing::debug!(data = %data, "ignoring foreign callback data");
        return Ok(());
    };

    let update = IncomingUpdate::Action(ActionSelection {
        chat_id,
        user_id: UserId(q.from.id.0 as i64),
        action_id: action_id.to_string(),
    });
    let reply = state.relay.respond(&update).await;
    send(&state, chat_id, &reply).await;
    Ok(())
}

async fn send(state: &AppState, chat_id: ChatId, reply: &gbot_core::reply::Reply) {
    if let Err(e) = deliver_reply(
        state.messenger.as_ref(),
        chat_id,
        reply,
        state.safe_message_len,
    )
    .await
    {
        tracing::warn!(chat_id = chat_id.0, kind = ?reply.kind, error = %e, "failed to send reply");
    }
}
