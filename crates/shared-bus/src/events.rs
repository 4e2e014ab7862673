//! # Game Events
//!
//! Defines the [`Event`] contract and every event type that flows through the
//! bus. Events are plain immutable values; a subscriber gets its own clone.

use serde::{Deserialize, Serialize};
use shared_types::{GameState, SceneId, Vector3};
use std::fmt::Debug;
use uuid::Uuid;

/// A value that can be published on the bus.
///
/// The concrete type *is* the routing key: subscribers ask for `E` and only
/// ever see values of exactly that type.
pub trait Event: Clone + Debug + Send + Sync + 'static {
    /// Stable name used in log fields.
    const NAME: &'static str;

    /// Coarse grouping used in log fields.
    const TOPIC: EventTopic;
}

/// Event topics, for log filtering only. Routing is by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Lifecycle state machine notifications.
    Lifecycle,
    /// Player intent from the input adapter.
    Input,
    /// Results of gameplay simulation.
    Gameplay,
    /// Scene loading progress.
    Scene,
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// The lifecycle state machine completed a transition.
///
/// Exactly one of these is published per transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChanged {
    /// State before the transition.
    pub previous: GameState,
    /// State after the transition.
    pub current: GameState,
}

impl Event for StateChanged {
    const NAME: &'static str = "state_changed";
    const TOPIC: EventTopic = EventTopic::Lifecycle;
}

// =============================================================================
// INPUT
// =============================================================================

/// Requested movement direction, already normalised by the input adapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveInput {
    pub direction: Vector3,
}

impl Event for MoveInput {
    const NAME: &'static str = "move_input";
    const TOPIC: EventTopic = EventTopic::Input;
}

/// Jump button pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpInput;

impl Event for JumpInput {
    const NAME: &'static str = "jump_input";
    const TOPIC: EventTopic = EventTopic::Input;
}

/// Interact button pressed, optionally aimed at a named target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractInput {
    pub target: Option<String>,
}

impl Event for InteractInput {
    const NAME: &'static str = "interact_input";
    const TOPIC: EventTopic = EventTopic::Input;
}

// =============================================================================
// GAMEPLAY
// =============================================================================

/// An object's position changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMoved {
    /// Name of the object that moved.
    pub object: String,
    /// Position after the move.
    pub position: Vector3,
    /// Displacement applied by this move.
    pub delta: Vector3,
}

impl Event for ObjectMoved {
    const NAME: &'static str = "object_moved";
    const TOPIC: EventTopic = EventTopic::Gameplay;
}

/// The player left the ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerJumped {
    /// Where the jump started.
    pub position: Vector3,
}

impl Event for PlayerJumped {
    const NAME: &'static str = "player_jumped";
    const TOPIC: EventTopic = EventTopic::Gameplay;
}

// =============================================================================
// SCENE LOADING
// =============================================================================

/// A scene load began.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneLoadStarted {
    pub load_id: Uuid,
    pub scene: SceneId,
}

impl Event for SceneLoadStarted {
    const NAME: &'static str = "scene_load_started";
    const TOPIC: EventTopic = EventTopic::Scene;
}

/// Progress of an in-flight scene load.
///
/// `progress` is in `0.0..=1.0` and never decreases within one `load_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLoadProgress {
    pub load_id: Uuid,
    pub scene: SceneId,
    pub progress: f32,
}

impl Event for SceneLoadProgress {
    const NAME: &'static str = "scene_load_progress";
    const TOPIC: EventTopic = EventTopic::Scene;
}

/// A scene load finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneLoadCompleted {
    pub load_id: Uuid,
    pub scene: SceneId,
    /// Wall-clock duration of the load.
    pub elapsed_ms: u64,
}

impl Event for SceneLoadCompleted {
    const NAME: &'static str = "scene_load_completed";
    const TOPIC: EventTopic = EventTopic::Scene;
}
