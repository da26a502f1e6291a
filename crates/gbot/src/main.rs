use std::sync::Arc;

use anyhow::Context;

use gbot_core::{
    config::Config,
    guard::{RateLimitGuard, RateLimiter},
    messaging::port::Transport,
    relay::{MessageRelay, RelaySettings},
};
use gbot_http::HttpCorrectionProvider;
use gbot_telegram::router::TelegramTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gbot_core::logging::init("gbot")?;

    let cfg = Config::load()?;

    let provider = Arc::new(HttpCorrectionProvider::new(
        cfg.grammar_api_url.clone(),
        cfg.grammar_api_key.clone(),
    )?);
    tracing::info!(endpoint = provider.endpoint(), "using grammar service");

    let mut relay = MessageRelay::new(provider, RelaySettings::from(&cfg));
    if cfg.rate_limit_enabled {
        relay = relay.with_guard(Arc::new(RateLimitGuard::new(RateLimiter::new(
            true,
            cfg.rate_limit_requests,
            cfg.rate_limit_window,
        ))));
    }

    let transport = TelegramTransport::new(&cfg, Arc::new(relay));
    transport.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");

    transport.stop().await?;
    Ok(())
}
