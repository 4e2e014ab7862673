//! # Shared Bus - Type-Keyed Event Bus
//!
//! The only channel through which subsystems talk to each other. Input,
//! scene loading, gameplay and the lifecycle state machine never call one
//! another directly; they publish values and subscribe to value types.
//!
//! ## Architecture Rules
//!
//! - All inter-subsystem communication goes through the bus
//! - One subject per event type, created on first subscribe, never recreated
//! - Delivery is synchronous on the publisher's thread, in subscription order
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Subsystem A  │                    │ Subsystem B  │
//! │              │    publish(E)      │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Subject<E>  │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe::<E>()
//! ```
//!
//! ## Subscribers
//!
//! - [`Subscription`]: a feed of future events, drained with `recv().await`,
//!   `try_recv()` or as a [`EventStream`]
//! - [`HandlerSubscription`]: a callback invoked inline during `publish`
//!
//! Both detach on `unsubscribe()` or drop. Disposing the bus ends every feed
//! and makes later publish/subscribe calls fail with [`BusError::Disposed`].

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subject;
pub mod subscriber;

// Re-export main types
pub use events::{
    Event, EventTopic, InteractInput, JumpInput, MoveInput, ObjectMoved, PlayerJumped,
    SceneLoadCompleted, SceneLoadProgress, SceneLoadStarted, StateChanged,
};
pub use publisher::{BusError, EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, HandlerSubscription, Subscription, SubscriptionError};
