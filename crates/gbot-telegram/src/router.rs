use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use teloxide::{
    dispatching::{Dispatcher, ShutdownToken},
    dptree,
    prelude::*,
};
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    task::JoinHandle,
};

use gbot_core::{
    config::Config,
    errors::Error,
    messaging::{
        port::{MessagingPort, Transport},
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    relay::MessageRelay,
    Result,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<MessageRelay>,
    pub messenger: Arc<dyn MessagingPort>,
    pub chat_locks: Arc<ChatLocks>,
    pub safe_message_len: usize,
}

/// Per-chat async locks so a chat's sentences are answered in order.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // Only the map holds it: no handler owns or waits on that chat.
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

struct Running {
    shutdown: ShutdownToken,
    task: JoinHandle<()>,
}

/// Long-polling Telegram transport with an explicit start/stop lifecycle.
pub struct TelegramTransport {
    bot: Bot,
    state: Arc<AppState>,
    running: Mutex<Option<Running>>,
}

impl TelegramTransport {
    pub fn new(cfg: &Config, relay: Arc<MessageRelay>) -> Self {
        let bot = Bot::new(cfg.telegram_bot_token.clone());

        // Throttle on top of the adapter's own RetryAfter handling.
        let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
        let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
            raw_messenger,
            ThrottleConfig::default(),
        ));

        let state = Arc::new(AppState {
            relay,
            messenger,
            chat_locks: Arc::new(ChatLocks::default()),
            safe_message_len: cfg.telegram_safe_limit,
        });

        Self {
            bot,
            state,
            running: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn start(&self) -> Result<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(());
        }

        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| Error::External(format!("telegram getMe failed: {e}")))?;
        tracing::info!(username = %me.username(), "bot started");

        let handler = dptree::entry()
            .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
            .branch(Update::filter_message().endpoint(handlers::handle_message));

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self.state.clone()])
            .build();
        let shutdown = dispatcher.shutdown_token();
        let task = tokio::spawn(async move {
            dispatcher.dispatch().await;
        });

        *running = Some(Running { shutdown, task });
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let Some(Running { shutdown, task }) = self.running.lock().await.take() else {
            return Ok(());
        };

        match shutdown.shutdown() {
            Ok(done) => done.await,
            Err(_) => {
                // Dispatcher never got going; nothing in flight to wait for.
                task.abort();
            }
        }

        match task.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => return Err(Error::External(format!("dispatcher task failed: {e}"))),
        }
        tracing::info!("bot stopped");
        Ok(())
    }
}
