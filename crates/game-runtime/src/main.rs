//! # Game Runtime Host
//!
//! Composes the runtime and drives one scripted session through the whole
//! lifecycle.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize logging
//! 3. Claim the composition root and run the installers
//! 4. Initialize (loads the initial scene) and start playing
//! 5. Feed input, pause, resume, end the game
//! 6. Shut down

use std::time::Duration;

use anyhow::{Context, Result};
use game_runtime::adapters::{EffectsController, InputService, MovementController};
use game_runtime::telemetry::init_logging;
use game_runtime::{AppContext, CompositionRoot, InstallerKind, RuntimeConfig};
use shared_bus::{SceneLoadCompleted, StateChanged};
use shared_types::Vector3;
use tokio_stream::StreamExt;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;
    init_logging(&config.log).context("Failed to initialize logging")?;

    info!("===========================================");
    info!("  Game Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let installers = InstallerKind::defaults(&config);
    let app = CompositionRoot::claim(config)?
        .compose(installers)
        .context("Failed to compose runtime")?;

    let watcher = spawn_state_logger(&app)?;

    let result = run_session(&app).await;

    app.shutdown().await;
    // The bus is disposed, so the watcher's stream has ended.
    if let Err(e) = watcher.await {
        warn!(error = %e, "State logger task failed");
    }

    result
}

fn spawn_state_logger(app: &AppContext) -> Result<tokio::task::JoinHandle<()>> {
    let mut changes = app.lifecycle().subscribe_changes()?.into_stream();
    let mut scenes = app.bus().subscribe::<SceneLoadCompleted>()?.into_stream();

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(StateChanged { previous, current }) = changes.next() => {
                    info!(%previous, %current, "Game state changed");
                }
                Some(loaded) = scenes.next() => {
                    info!(scene = %loaded.scene, elapsed_ms = loaded.elapsed_ms, "Scene ready");
                }
                else => break,
            }
        }
    }))
}

async fn run_session(app: &AppContext) -> Result<()> {
    let lifecycle = app.lifecycle();
    lifecycle.initialize().await.context("Initialization failed")?;
    lifecycle.start().await?;

    let input = app.resolve::<InputService>()?;
    input.submit_move(Vector3::new(1.0, 0.0, 0.0))?;
    input.submit_move(Vector3::new(0.0, 0.0, 1.0))?;
    input.submit_jump()?;
    input.submit_interact(Some("door".to_string()))?;

    lifecycle.pause().await?;
    input.submit_move(Vector3::new(1.0, 0.0, 0.0))?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    lifecycle.resume().await?;

    // Already playing: rejected, state unchanged.
    if let Err(e) = lifecycle.resume().await {
        info!(error = %e, "Resume rejected");
    }
    lifecycle.game_over().await?;

    // Absent when the gameplay installer is disabled.
    match app.resolve_optional::<MovementController>()? {
        Some(movement) => info!(
            position = ?movement.position(),
            moves = movement.moves(),
            jumps = movement.jumps(),
            "Player summary"
        ),
        None => info!("Gameplay disabled, no player summary"),
    }
    if let Some(effects) = app.resolve_optional::<EffectsController>()? {
        info!(effects = effects.drain().len(), "Effects requested");
    }
    info!(
        state = %lifecycle.current_state(),
        transitions = lifecycle.transition_count(),
        "Session finished"
    );
    Ok(())
}
