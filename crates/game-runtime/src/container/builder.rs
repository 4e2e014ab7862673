//! # Container Builder
//!
//! Collects ordered registrations and closes them into a
//! [`ServiceContainer`].

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::services::ServiceContainer;
use super::ContainerError;

/// Type-erased singleton. Always holds an `Arc<T>` for the registered `T`.
pub(crate) type ErasedInstance = Arc<dyn Any + Send + Sync>;

/// Type-erased factory.
pub(crate) type ErasedFactory =
    Box<dyn Fn(&Resolver<'_>) -> Result<ErasedInstance, ContainerError> + Send + Sync>;

pub(crate) struct Registration {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) factory: ErasedFactory,
}

/// Ordered set of service registrations.
///
/// Registration order matters: a factory may resolve only services that were
/// registered before it.
#[derive(Default)]
pub struct ContainerBuilder {
    registrations: Vec<Registration>,
    index: HashMap<TypeId, usize>,
}

impl ContainerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `T`.
    ///
    /// `T` may be unsized, so `dyn Trait` services can be registered and
    /// resolved as `Arc<dyn Trait>`. The factory runs at most once, on first
    /// resolution, and receives a [`Resolver`] for its own dependencies.
    pub fn register<T, F>(&mut self, factory: F) -> Result<&mut Self, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<Arc<T>, ContainerError> + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        let name = type_name::<T>();
        if self.index.contains_key(&type_id) {
            return Err(ContainerError::DuplicateRegistration { service: name });
        }

        let erased: ErasedFactory = Box::new(move |resolver| {
            let instance = factory(resolver)?;
            let erased: ErasedInstance = Arc::new(instance);
            Ok(erased)
        });

        let ordinal = self.registrations.len();
        self.registrations.push(Registration {
            type_id,
            name,
            factory: erased,
        });
        self.index.insert(type_id, ordinal);
        debug!(service = name, ordinal, "Service registered");

        Ok(self)
    }

    /// Register an already-built instance of `T`.
    pub fn register_instance<T>(&mut self, instance: Arc<T>) -> Result<&mut Self, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register::<T, _>(move |_| Ok(Arc::clone(&instance)))
    }

    /// Whether `T` has been registered.
    #[must_use]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Close the builder. The resulting container cannot be extended.
    #[must_use]
    pub fn build(self) -> ServiceContainer {
        debug!(services = self.registrations.len(), "Service container built");
        ServiceContainer::new(self.registrations, self.index)
    }
}

/// Handed to factories so they can resolve earlier registrations.
pub struct Resolver<'a> {
    container: &'a ServiceContainer,
    requester: usize,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(container: &'a ServiceContainer, requester: usize) -> Self {
        Self {
            container,
            requester,
        }
    }

    /// Resolve a dependency registered before the service being built.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        self.container.resolve_for::<T>(Some(self.requester))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock;

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut builder = ContainerBuilder::new();
        builder.register_instance(Arc::new(Clock)).unwrap();

        let err = builder.register_instance(Arc::new(Clock)).err();
        assert!(matches!(
            err,
            Some(ContainerError::DuplicateRegistration { .. })
        ));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_contains() {
        let mut builder = ContainerBuilder::new();
        assert!(builder.is_empty());
        builder.register::<Clock, _>(|_| Ok(Arc::new(Clock))).unwrap();

        assert!(builder.contains::<Clock>());
        assert!(!builder.contains::<String>());
    }
}
