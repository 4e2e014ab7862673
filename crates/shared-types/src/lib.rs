//! # Shared Types Crate
//!
//! Domain values that cross subsystem boundaries. Nothing in here owns
//! behaviour beyond simple invariants; the bus carries these values and the
//! runtime interprets them.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the lifecycle state table lives here so the
//!   state machine and every subscriber agree on it.
//! - **Plain values**: everything is `Copy` or cheaply `Clone`, with no shared
//!   ownership.

pub mod entities;

pub use entities::*;
