mod action;
mod app;
mod app_state;
mod component;
mod components;
mod core;
mod keymap;
mod media;
mod mpv;
mod navigation;
mod palette;
mod theme;
mod widgets;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use vinyl_proto::catalog::CatalogClient;
use vinyl_proto::protocol::Notice;

/// What the PlayerCore broadcasts to the UI.
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    /// A new PlayerState is in the StateManager.
    StateUpdated,
    /// A user-facing message, shown as a toast.
    Notice(Notice),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = vinyl_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("vinyl.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG overrides; HTTP client internals stay at warn.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("vinyl log: {}", log_path.display());
    tracing::info!("vinyl starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match vinyl_proto::config::Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("config: {:#}, using defaults", e);
            vinyl_proto::config::Config::default()
        }
    };
    let catalog = Arc::new(CatalogClient::new(&config.catalog));

    // ── Channels ─────────────────────────────────────────────────────────────
    let (broadcast_tx, broadcast_rx) = broadcast::channel::<BroadcastMessage>(1024);
    let (event_tx, event_rx) = mpsc::channel::<core::PlayerEvent>(1024);

    // ── PlayerCore ───────────────────────────────────────────────────────────
    let mpv_process = mpv::MpvProcess::new(media::volume_scale(config.playback.default_volume));
    let player_core = core::PlayerCore::new(
        config,
        mpv_process,
        Arc::clone(&catalog),
        broadcast_tx.clone(),
        event_tx.clone(),
    );
    let state_manager = player_core.state_manager();

    let core_task = tokio::spawn(async move {
        if let Err(e) = player_core.run(event_rx).await {
            tracing::error!("PlayerCore exited with error: {:#}", e);
        }
    });

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(event_tx, state_manager, catalog);
    let result = app.run(broadcast_rx).await;

    // Give the core a moment to stop mpv.
    if tokio::time::timeout(std::time::Duration::from_secs(2), core_task)
        .await
        .is_err()
    {
        tracing::warn!("PlayerCore did not stop in time");
    }
    tracing::info!("vinyl stopped");
    result
}
