use crate::{
    domain::{ChatId, MessageRef},
    formatting::split_message,
    messaging::port::MessagingPort,
    reply::Reply,
    Result,
};

/// Send a reply, splitting oversized bodies at line boundaries.
///
/// Leading chunks go out as plain HTML; the final chunk carries the actions.
pub async fn deliver_reply(
    messenger: &dyn MessagingPort,
    chat_id: ChatId,
    reply: &Reply,
    limit: usize,
) -> Result<MessageRef> {
    let limit = limit.max(200);
    let mut chunks = split_message(&reply.body, limit);
    let last = chunks.pop().unwrap_or_default();

    for chunk in &chunks {
        messenger.send_html(chat_id, chunk).await?;
    }

    let tail = Reply {
        kind: reply.kind,
        body: last,
        actions: reply.actions.clone(),
    };
    messenger.send_reply(chat_id, &tail).await
}
