//! # Scene Loader
//!
//! Publishes the load-started / progress / completed sequence for a scene.
//! Asset streaming itself belongs to the host; this adapter only paces the
//! load and reports on it.
//!
//! The loader doubles as a [`TransitionHook`]: when an initial scene is
//! configured it is loaded before the lifecycle enters `MainMenu`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{
    BusError, EventPublisher, InMemoryEventBus, SceneLoadCompleted, SceneLoadProgress,
    SceneLoadStarted,
};
use shared_types::{GameState, SceneId};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::container::SceneConfig;
use crate::lifecycle::{HookError, TransitionHook};

/// Errors from scene loading.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SceneLoadError {
    #[error("Scene name must not be empty")]
    EmptyName,

    /// Only one load may be in flight.
    #[error("Cannot load {requested}: {in_flight} is still loading")]
    AlreadyLoading { requested: String, in_flight: String },

    #[error("Scene load notification failed: {0}")]
    Bus(#[from] BusError),
}

/// Outcome of a completed load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneLoadReport {
    pub load_id: Uuid,
    pub scene: SceneId,
    pub elapsed: Duration,
}

pub struct SceneLoader {
    bus: Arc<InMemoryEventBus>,
    config: SceneConfig,
    loading: AtomicBool,
    in_flight: RwLock<Option<SceneId>>,
    current: RwLock<Option<SceneId>>,
}

/// Clears the in-flight marker however the load ends.
struct InFlightGuard<'a>(&'a SceneLoader);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.write().take();
        self.0.loading.store(false, Ordering::Release);
    }
}

impl SceneLoader {
    pub fn new(bus: Arc<InMemoryEventBus>, config: SceneConfig) -> Self {
        Self {
            bus,
            config,
            loading: AtomicBool::new(false),
            in_flight: RwLock::new(None),
            current: RwLock::new(None),
        }
    }

    /// The most recently completed scene.
    #[must_use]
    pub fn current_scene(&self) -> Option<SceneId> {
        self.current.read().clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Load `name`, publishing progress along the way.
    ///
    /// Progress goes `1/n, 2/n, .. 1.0` for `n = progress_steps`, so it never
    /// decreases and always ends at exactly 1.0.
    pub async fn load_scene(&self, name: &str) -> Result<SceneLoadReport, SceneLoadError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SceneLoadError::EmptyName);
        }
        if self.loading.swap(true, Ordering::AcqRel) {
            let in_flight = self
                .in_flight
                .read()
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_default();
            return Err(SceneLoadError::AlreadyLoading {
                requested: name.to_string(),
                in_flight,
            });
        }
        let _guard = InFlightGuard(self);

        let scene = SceneId::new(name);
        *self.in_flight.write() = Some(scene.clone());
        let load_id = Uuid::new_v4();
        let started = Instant::now();

        info!(scene = %scene, %load_id, "Scene load started");
        self.bus.publish(SceneLoadStarted {
            load_id,
            scene: scene.clone(),
        })?;

        let steps = self.config.progress_steps.max(1);
        for step in 1..=steps {
            if self.config.step_delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.config.step_delay).await;
            }

            let progress = if step == steps {
                1.0
            } else {
                step as f32 / steps as f32
            };
            debug!(scene = %scene, progress, "Scene load progress");
            self.bus.publish(SceneLoadProgress {
                load_id,
                scene: scene.clone(),
                progress,
            })?;
        }

        let elapsed = started.elapsed();
        self.bus.publish(SceneLoadCompleted {
            load_id,
            scene: scene.clone(),
            elapsed_ms: elapsed.as_millis() as u64,
        })?;
        *self.current.write() = Some(scene.clone());
        info!(scene = %scene, elapsed_ms = elapsed.as_millis() as u64, "Scene load completed");

        Ok(SceneLoadReport {
            load_id,
            scene,
            elapsed,
        })
    }
}

#[async_trait]
impl TransitionHook for SceneLoader {
    fn name(&self) -> &'static str {
        "scene_loader"
    }

    async fn before_enter(&self, from: GameState, to: GameState) -> Result<(), HookError> {
        if (from, to) != (GameState::Initializing, GameState::MainMenu) {
            return Ok(());
        }
        let Some(scene) = self.config.initial_scene.as_deref() else {
            return Ok(());
        };
        self.load_scene(scene)
            .await
            .map(|_| ())
            .map_err(|e| HookError::new(e.to_string()))
    }
}
