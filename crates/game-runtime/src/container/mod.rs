//! # Service Container
//!
//! Registry of singleton services resolved by requested type.
//!
//! ## Lifecycle
//!
//! 1. A [`ContainerBuilder`] collects registrations in order
//! 2. `build()` closes it into an immutable [`ServiceContainer`]
//! 3. `resolve::<T>()` creates each service lazily, once
//! 4. `dispose()` (or drop) releases every instance
//!
//! ## Ordering Rule
//!
//! A factory may only resolve services registered *before* its own. This is
//! the container's one correctness requirement; it also rules out cycles and
//! gives a strict lock order for first-time construction.

pub mod builder;
pub mod config;
pub mod services;

pub use builder::{ContainerBuilder, Resolver};
pub use config::{
    ConfigError, LifecycleConfig, LogConfig, MovementConfig, RuntimeConfig, SceneConfig,
};
pub use services::ServiceContainer;

use thiserror::Error;

/// Errors from registration and resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContainerError {
    /// Nothing is registered for the requested type.
    #[error("Service not found: {service}")]
    NotFound { service: &'static str },

    /// The type was already registered in this builder.
    #[error("Service already registered: {service}")]
    DuplicateRegistration { service: &'static str },

    /// A factory asked for a service registered after (or as) itself.
    #[error("{requester} depends on {dependency}, which is registered after it")]
    OrderViolation {
        requester: &'static str,
        dependency: &'static str,
    },

    /// A factory failed for a reason of its own.
    #[error("Factory for {service} failed: {message}")]
    Factory {
        service: &'static str,
        message: String,
    },

    /// The stored instance does not have the registered type.
    #[error("Instance registered for {service} has a different type")]
    TypeMismatch { service: &'static str },

    /// The container was disposed.
    #[error("Service container disposed")]
    Disposed,
}

impl ContainerError {
    /// Wrap a factory's own error.
    pub fn factory<T: ?Sized>(error: impl std::fmt::Display) -> Self {
        Self::Factory {
            service: std::any::type_name::<T>(),
            message: error.to_string(),
        }
    }
}
