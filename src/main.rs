use anyhow::Context;
use dotenv::dotenv;
use tracing::info;

mod app;
mod app_state;
mod config;
mod db;
mod error;
mod events;
mod identity;
mod middleware;
mod modules;
mod scheduling;
mod services;
mod telemetry;
mod websocket;

use app_state::AppState;
use events::EventSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let env = config::init().context("Failed to load configuration")?.clone();

    let telemetry_handles = telemetry::init_telemetry(None)
        .await
        .context("Failed to initialize telemetry")?;

    let pool = db::init_pool()
        .await
        .context("Failed to initialize database pool")?;

    let events = EventSink::new(env.events.channel_capacity);
    let state = AppState::new(pool, env.clone(), events);
    let router = app::create_router(state);

    let addr = env.server_addr();
    info!("{} listening on {}", env.app.name, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .await
        .context("Failed to serve application")?;

    telemetry_handles.shutdown().await?;
    Ok(())
}
