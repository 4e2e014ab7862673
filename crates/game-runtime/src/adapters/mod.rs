//! # Adapters
//!
//! Thin services that sit between the host and the event bus. Each one is
//! registered by an installer and talks to the rest of the runtime only
//! through events.

pub mod effects;
pub mod input;
pub mod movement;
pub mod scene_loader;

pub use effects::{EffectRequest, EffectsController};
pub use input::InputService;
pub use movement::MovementController;
pub use scene_loader::{SceneLoadError, SceneLoadReport, SceneLoader};
