//! Async work attached to lifecycle transitions.

use async_trait::async_trait;
use shared_types::GameState;
use thiserror::Error;

/// Failure reported by a [`TransitionHook`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Work that must complete before the machine enters a state.
///
/// Hooks run in registration order after validation and before assignment.
/// The first failure aborts the transition and leaves the state unchanged.
#[async_trait]
pub trait TransitionHook: Send + Sync {
    /// Name used in log fields.
    fn name(&self) -> &'static str;

    /// Called for every transition `from -> to`; ignore the ones that do not
    /// concern this hook.
    async fn before_enter(&self, from: GameState, to: GameState) -> Result<(), HookError>;
}
