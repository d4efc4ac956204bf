use tagrush::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), TagrushError> {
    // RUST_LOG=tagrush_room=debug for per-round detail.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        port = config.port,
        win_score = config.room.win_score,
        round_timeout_s = config.room.round_timeout.as_secs(),
        start_delay_s = config.room.start_delay.as_secs(),
        "starting tagrush"
    );

    let server = TagrushServer::builder()
        .bind(&config.bind_addr())
        .room_config(config.room)
        .idle_timeout(config.idle_timeout)
        .build()
        .await?;
    server.run().await
}
