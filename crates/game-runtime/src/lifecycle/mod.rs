//! # Lifecycle State Machine
//!
//! Owns the single [`GameState`](shared_types::GameState) of the process and
//! the only code allowed to change it.
//!
//! ## Transition Steps
//!
//! ```text
//! validate ──► async work (delay, hooks) ──► assign ──► publish StateChanged
//!    │                   │
//!    └── error: state    └── error: state unchanged, error returned
//!        unchanged
//! ```
//!
//! Transitions are serialized; a second caller waits for the first to finish.

pub mod hooks;
pub mod machine;

pub use hooks::{HookError, TransitionHook};
pub use machine::{LifecycleError, LifecycleStateMachine};
