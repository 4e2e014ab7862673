//! # Game Runtime Library
//!
//! The messaging-and-composition core of the game runtime. The host binary in
//! `main.rs` is a thin driver over this library.
//!
//! ## Architectural Patterns
//!
//! - **Event-Driven**: adapters talk to each other only through the event bus
//! - **Composition Root**: the service graph is built once, in one place
//! - **Plug-and-Play**: installers can be enabled/disabled via configuration
//!
//! ## Layout
//!
//! - `container/` - service container, builder and runtime configuration
//! - `lifecycle/` - the asynchronous game state machine
//! - `registry/` - installer identifiers and enablement
//! - `wiring/` - installers that register adapters
//! - `adapters/` - input, scene loading, movement and effects
//! - `composition/` - the composition root and [`AppContext`]

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod composition;
pub mod container;
pub mod lifecycle;
pub mod registry;
pub mod telemetry;
pub mod wiring;

pub use composition::{AppContext, CompositionError, CompositionRoot};
pub use container::{ContainerBuilder, ContainerError, RuntimeConfig, ServiceContainer};
pub use lifecycle::{LifecycleError, LifecycleStateMachine, TransitionHook};
pub use registry::{InstallerConfig, InstallerId};
pub use wiring::{Installer, InstallerKind};
