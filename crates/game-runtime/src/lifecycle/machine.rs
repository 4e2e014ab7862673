//! # Lifecycle State Machine
//!
//! The machine's state is only ever written by [`LifecycleStateMachine::commit`],
//! which runs after validation and after all transition work has succeeded.
//! A transition whose notification cannot be published is rolled back, so the
//! state never moves without its `StateChanged`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use shared_bus::{BusError, EventPublisher, InMemoryEventBus, StateChanged, Subscription};
use shared_types::GameState;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, instrument, warn};

use super::hooks::{HookError, TransitionHook};
use crate::container::LifecycleConfig;

/// Errors from lifecycle transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// The operation does not apply to the current state.
    #[error("Cannot {operation} while {from}: {from} -> {to} is not a legal transition")]
    InvalidTransition {
        operation: &'static str,
        from: GameState,
        to: GameState,
    },

    /// Transition work failed; the state was left as it was.
    #[error("Transition {from} -> {to} aborted by {hook}: {source}")]
    Hook {
        hook: &'static str,
        from: GameState,
        to: GameState,
        #[source]
        source: HookError,
    },

    /// `shutdown` was called.
    #[error("Lifecycle state machine is shut down")]
    ShutDown,

    /// The bus could not carry the notification.
    #[error("State change notification failed: {0}")]
    Bus(#[from] BusError),
}

/// The lifecycle state machine.
///
/// Holds a shared reference to the event bus and publishes exactly one
/// [`StateChanged`] per completed transition.
pub struct LifecycleStateMachine {
    /// Current state. Written only by `commit`.
    state: RwLock<GameState>,

    /// Serializes transitions, held across transition work.
    gate: AsyncMutex<()>,

    bus: Arc<InMemoryEventBus>,

    config: LifecycleConfig,

    hooks: RwLock<Vec<Arc<dyn TransitionHook>>>,

    shut_down: AtomicBool,

    transitions: AtomicU64,
}

impl LifecycleStateMachine {
    /// Create a machine in `Uninitialized`.
    pub fn new(bus: Arc<InMemoryEventBus>, config: LifecycleConfig) -> Self {
        Self {
            state: RwLock::new(GameState::Uninitialized),
            gate: AsyncMutex::new(()),
            bus,
            config,
            hooks: RwLock::new(Vec::new()),
            shut_down: AtomicBool::new(false),
            transitions: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn current_state(&self) -> GameState {
        *self.state.read()
    }

    /// Number of completed transitions.
    #[must_use]
    pub fn transition_count(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Attach transition work. Hooks run in the order they were added.
    pub fn add_hook(&self, hook: Arc<dyn TransitionHook>) {
        debug!(hook = hook.name(), "Transition hook added");
        self.hooks.write().push(hook);
    }

    /// Feed of future state changes.
    pub fn subscribe_changes(&self) -> Result<Subscription<StateChanged>, BusError> {
        self.bus.subscribe::<StateChanged>()
    }

    /// `Uninitialized -> Initializing -> MainMenu`.
    ///
    /// The `Initializing` leg is published only when
    /// `LifecycleConfig::notify_intermediate` is set. If the work before
    /// `MainMenu` fails the machine stays in `Initializing`, and calling
    /// `initialize` again retries from there.
    #[instrument(name = "lifecycle_initialize", skip(self))]
    pub async fn initialize(&self) -> Result<(), LifecycleError> {
        let _gate = self.gate.lock().await;
        self.ensure_running()?;

        if self.current_state() == GameState::Uninitialized {
            self.step(
                "initialize",
                GameState::Initializing,
                self.config.notify_intermediate,
            )
            .await?;
        } else {
            debug!(state = %self.current_state(), "Resuming initialization");
        }
        self.step("initialize", GameState::MainMenu, true).await
    }

    /// `MainMenu -> Playing`.
    pub async fn start(&self) -> Result<(), LifecycleError> {
        self.transition("start", GameState::Playing).await
    }

    /// `Playing -> Paused`.
    pub async fn pause(&self) -> Result<(), LifecycleError> {
        self.transition("pause", GameState::Paused).await
    }

    /// `Paused -> Playing`.
    pub async fn resume(&self) -> Result<(), LifecycleError> {
        self.transition("resume", GameState::Playing).await
    }

    /// `Playing -> GameOver`. Nothing leaves `GameOver`.
    pub async fn game_over(&self) -> Result<(), LifecycleError> {
        self.transition("game_over", GameState::GameOver).await
    }

    /// Release hooks and refuse further transitions.
    ///
    /// Waits for an in-flight transition to finish. Does not change the state
    /// and publishes nothing. Idempotent.
    pub async fn shutdown(&self) {
        let _gate = self.gate.lock().await;
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let hooks = std::mem::take(&mut *self.hooks.write());
        info!(
            state = %self.current_state(),
            transitions = self.transition_count(),
            hooks_released = hooks.len(),
            "Lifecycle state machine shut down"
        );
    }

    fn ensure_running(&self) -> Result<(), LifecycleError> {
        if self.is_shut_down() {
            Err(LifecycleError::ShutDown)
        } else {
            Ok(())
        }
    }

    async fn transition(
        &self,
        operation: &'static str,
        to: GameState,
    ) -> Result<(), LifecycleError> {
        let _gate = self.gate.lock().await;
        self.ensure_running()?;
        self.step(operation, to, true).await
    }

    /// One validated transition. Caller holds the gate.
    async fn step(
        &self,
        operation: &'static str,
        to: GameState,
        notify: bool,
    ) -> Result<(), LifecycleError> {
        let from = self.current_state();
        if !from.can_transition_to(to) {
            warn!(operation, from = %from, to = %to, "Rejected illegal transition");
            return Err(LifecycleError::InvalidTransition {
                operation,
                from,
                to,
            });
        }
        if self.bus.is_disposed() {
            return Err(LifecycleError::Bus(BusError::Disposed));
        }

        self.perform_work(from, to).await?;
        self.commit(from, to, notify)
    }

    async fn perform_work(&self, from: GameState, to: GameState) -> Result<(), LifecycleError> {
        if to == GameState::MainMenu && !self.config.init_delay.is_zero() {
            debug!(
                delay_ms = self.config.init_delay.as_millis() as u64,
                "Initialization delay"
            );
            tokio::time::sleep(self.config.init_delay).await;
        }

        let hooks: Vec<Arc<dyn TransitionHook>> = self.hooks.read().clone();
        for hook in hooks {
            if let Err(source) = hook.before_enter(from, to).await {
                error!(
                    hook = hook.name(),
                    from = %from,
                    to = %to,
                    error = %source,
                    "Transition hook failed"
                );
                return Err(LifecycleError::Hook {
                    hook: hook.name(),
                    from,
                    to,
                    source,
                });
            }
        }
        Ok(())
    }

    fn commit(&self, from: GameState, to: GameState, notify: bool) -> Result<(), LifecycleError> {
        // Transition work may have outlived the bus.
        if self.bus.is_disposed() {
            warn!(from = %from, to = %to, "Bus disposed during transition");
            return Err(LifecycleError::Bus(BusError::Disposed));
        }

        // Written before publishing so subscribers observe the new state.
        *self.state.write() = to;
        if notify {
            match self.bus.publish(StateChanged {
                previous: from,
                current: to,
            }) {
                Ok(receivers) => debug!(receivers, "State change published"),
                Err(e) => {
                    *self.state.write() = from;
                    warn!(
                        from = %from,
                        to = %to,
                        error = %e,
                        "State change not published, rolled back"
                    );
                    return Err(e.into());
                }
            }
        }

        self.transitions.fetch_add(1, Ordering::Relaxed);
        info!(from = %from, to = %to, "State transition");
        Ok(())
    }
}
