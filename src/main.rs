//! Ember Book client binary wiring the animation engine, sequence
//! controllers, hub connection and event router together.

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dto;
mod engine;
mod error;
mod sequence;
mod services;
mod state;

use config::AppConfig;
use dto::commands::PlayerCommand;
use engine::{AnimationEngine, AssetCatalog, Viewport};
use sequence::{AnimationCoordinator, FormulaReveal, FormulaTuning, Sequences};
use services::hub::{self, ConnectionStatus, HubHandle};
use services::router::EventRouter;

/// Frame interval the engine is advanced at.
const FRAME: Duration = Duration::from_millis(16);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let player_id = required_id("PLAYER_ID")?;
    let provider_id = required_id("PROVIDER_ID")?;
    let hub_base = env::var("HUB_URL").unwrap_or_else(|_| "ws://localhost:5000/gameHub".into());
    let assets_dir = env::var("ASSETS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("assets"));

    let config = Arc::new(AppConfig::load());

    // asset load failure is unrecoverable for the session
    let catalog = match AssetCatalog::load(&assets_dir).await {
        Ok(catalog) => catalog,
        Err(err) => return Err(error::SessionFatal::AssetLoad(err.to_string()).into()),
    };
    let engine = Arc::new(AnimationEngine::new(catalog));
    engine.attach_surface(default_viewport());

    let formula = Arc::new(FormulaReveal::new(
        engine.clone(),
        FormulaTuning {
            skip_speed: config.glyph_skip_speed,
            spacing: config.glyph_spacing,
            max_scale: config.glyph_max_scale,
        },
    ));
    let coordinator = Arc::new(AnimationCoordinator::new(engine.clone(), formula.clone()));
    let sequences = Sequences::new(
        engine.clone(),
        coordinator.clone(),
        formula,
        config.clone(),
    );

    let hub_url = hub::build_hub_url(&hub_base, player_id, provider_id)
        .context("building hub url")?;
    let (hub_tx, hub_commands_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
    let (events_tx, events_rx) = mpsc::channel(64);
    let hub = HubHandle::new(hub_tx, status_rx.clone());

    tokio::spawn(hub::run_hub_supervisor(
        hub_url,
        config.reconnect_schedule_ms.clone(),
        events_tx,
        hub_commands_rx,
        status_tx,
    ));
    tokio::spawn(run_frame_loop(engine.clone()));
    tokio::spawn(watch_connection(status_rx));

    let (commands_tx, commands_rx) = mpsc::channel(16);
    tokio::spawn(read_player_commands(commands_tx));

    let (router, mut notice_rx, _loading_rx) = EventRouter::new(
        player_id,
        provider_id,
        sequences,
        coordinator,
        hub,
        config,
    );

    info!(player_id, provider_id, "session starting");
    tokio::select! {
        _ = router.run(events_rx, commands_rx) => {}
        _ = shutdown_signal() => info!("shutdown signal received"),
    }

    if let Some(fatal) = notice_rx.borrow_and_update().as_ref() {
        warn!(error = %fatal, "session ended with a blocking notice");
    }
    Ok(())
}

/// Read a numeric identity from the environment; missing identity is fatal.
fn required_id(name: &str) -> anyhow::Result<u64> {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .ok_or_else(|| anyhow::Error::new(error::SessionFatal::MissingIdentity))
        .with_context(|| format!("{name} must be set to a number"))
}

/// Advance the animation engine at a fixed frame cadence.
async fn run_frame_loop(engine: Arc<AnimationEngine>) {
    let mut ticker = interval(FRAME);
    loop {
        ticker.tick().await;
        engine.advance(FRAME.as_secs_f32());
    }
}

/// Log connection status changes for operators.
async fn watch_connection(mut status: watch::Receiver<ConnectionStatus>) {
    while status.changed().await.is_ok() {
        let current = *status.borrow();
        info!(status = ?current, "hub connection status changed");
    }
}

/// Feed player commands from stdin, one JSON object per line.
///
/// This is the seam the UI shell drives; reading stdin keeps the binary
/// exercisable without one.
async fn read_player_commands(commands: mpsc::Sender<PlayerCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<PlayerCommand>(&line) {
            Ok(command) => {
                if commands.send(command).await.is_err() {
                    return;
                }
            }
            Err(err) => warn!(error = %err, "ignoring malformed player command"),
        }
    }
}

/// Viewport used until the embedding shell reports real container sizes.
fn default_viewport() -> Viewport {
    Viewport {
        width: 1280.0,
        height: 720.0,
        notification_height: 50.0,
        flip_height: 150.0,
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the session down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
