//! # Wiring
//!
//! Connects the adapters to the event bus and the container.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        EVENT BUS                         │
//! └──────┬───────────────┬───────────────┬───────────────────┘
//!        │ MoveInput     │ SceneLoad*    │ StateChanged
//!        │ JumpInput     │               │ ObjectMoved
//!        ▲               ▲               ▼ PlayerJumped
//!   ┌─────────┐    ┌───────────┐   ┌──────────┐   ┌─────────┐
//!   │  Input  │    │   Scene   │   │ Movement │──►│ Effects │
//!   │ Service │    │  Loader   │   │  Ctrl    │   │  Ctrl   │
//!   └─────────┘    └─────▲─────┘   └──────────┘   └─────────┘
//!                        │ before MainMenu
//!                  ┌─────┴──────┐
//!                  │ Lifecycle  │
//!                  └────────────┘
//! ```

pub mod installers;

pub use installers::*;
