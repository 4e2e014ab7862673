//! # Core Domain Entities
//!
//! Value types shared across the runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The application lifecycle state.
///
/// The set is closed; the only way to move between values is through the
/// lifecycle state machine, which consults [`GameState::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameState {
    /// Nothing has been initialized yet.
    #[default]
    Uninitialized,
    /// Initialization work is in flight.
    Initializing,
    /// Resting at the main menu.
    MainMenu,
    /// A session is running.
    Playing,
    /// A session is suspended.
    Paused,
    /// The session ended. No outgoing transitions.
    GameOver,
}

impl GameState {
    /// Every state, in declaration order.
    pub const ALL: [GameState; 6] = [
        Self::Uninitialized,
        Self::Initializing,
        Self::MainMenu,
        Self::Playing,
        Self::Paused,
        Self::GameOver,
    ];

    /// States reachable in a single step from `self`.
    #[must_use]
    pub fn legal_targets(self) -> &'static [GameState] {
        match self {
            Self::Uninitialized => &[Self::Initializing],
            Self::Initializing => &[Self::MainMenu],
            Self::MainMenu => &[Self::Playing],
            Self::Playing => &[Self::Paused, Self::GameOver],
            Self::Paused => &[Self::Playing],
            Self::GameOver => &[],
        }
    }

    /// Whether `self -> target` is one of the directed legal transitions.
    #[must_use]
    pub fn can_transition_to(self, target: GameState) -> bool {
        self.legal_targets().contains(&target)
    }

    /// True when no transition leaves this state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.legal_targets().is_empty()
    }

    /// Stable lowercase name, used in log fields.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::MainMenu => "main_menu",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::GameOver => "game_over",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A 3-component vector in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);
    pub const UP: Vector3 = Vector3::new(0.0, 1.0, 0.0);

    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Returns `self` clamped to unit length. Zero stays zero.
    #[must_use]
    pub fn clamp_length(self) -> Self {
        let len = self.length();
        if len > 1.0 {
            self.scale(1.0 / len)
        } else {
            self
        }
    }
}

impl std::ops::Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Name of a loadable scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneId(pub String);

impl SceneId {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
