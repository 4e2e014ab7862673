//! # Service Container
//!
//! Holds the closed set of registrations and their lazily created singletons.
//!
//! ## Thread Safety
//!
//! - Each slot has its own mutex, held while its factory runs, so two racing
//!   first resolutions produce exactly one instance
//! - Factories only recurse into lower ordinals, so slot locks are always
//!   taken in strictly decreasing order

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::builder::{ErasedFactory, ErasedInstance, Registration, Resolver};
use super::ContainerError;

struct Slot {
    type_id: TypeId,
    name: &'static str,
    factory: ErasedFactory,
    instance: Mutex<Option<ErasedInstance>>,
}

/// Immutable set of singleton services.
pub struct ServiceContainer {
    slots: Vec<Slot>,
    index: HashMap<TypeId, usize>,
    disposed: AtomicBool,
}

impl ServiceContainer {
    pub(crate) fn new(registrations: Vec<Registration>, index: HashMap<TypeId, usize>) -> Self {
        let slots = registrations
            .into_iter()
            .map(|r| Slot {
                type_id: r.type_id,
                name: r.name,
                factory: r.factory,
                instance: Mutex::new(None),
            })
            .collect();

        Self {
            slots,
            index,
            disposed: AtomicBool::new(false),
        }
    }

    /// Resolve the singleton for `T`, creating it on first use.
    ///
    /// Fails with [`ContainerError::NotFound`] when `T` was never registered.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        self.resolve_for::<T>(None)
    }

    /// Like [`resolve`](Self::resolve), but `Ok(None)` when `T` was never
    /// registered. Any other failure, including a missing dependency of `T`,
    /// is still an error.
    pub fn resolve_optional<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<T>>, ContainerError> {
        if !self.contains::<T>() {
            return Ok(None);
        }
        self.resolve::<T>().map(Some)
    }

    pub(crate) fn resolve_for<T: ?Sized + Send + Sync + 'static>(
        &self,
        requester: Option<usize>,
    ) -> Result<Arc<T>, ContainerError> {
        let name = type_name::<T>();
        let erased = self.resolve_erased(TypeId::of::<T>(), name, requester)?;
        erased
            .downcast_ref::<Arc<T>>()
            .map(Arc::clone)
            .ok_or(ContainerError::TypeMismatch { service: name })
    }

    fn resolve_erased(
        &self,
        type_id: TypeId,
        name: &'static str,
        requester: Option<usize>,
    ) -> Result<ErasedInstance, ContainerError> {
        if self.is_disposed() {
            return Err(ContainerError::Disposed);
        }

        let Some(&ordinal) = self.index.get(&type_id) else {
            warn!(service = name, "Resolution of unregistered service");
            return Err(ContainerError::NotFound { service: name });
        };

        if let Some(requester) = requester {
            if ordinal >= requester {
                return Err(ContainerError::OrderViolation {
                    requester: self.slots[requester].name,
                    dependency: name,
                });
            }
        }

        let slot = &self.slots[ordinal];
        let mut instance = slot.instance.lock();
        if let Some(existing) = instance.as_ref() {
            return Ok(Arc::clone(existing));
        }

        let created = (slot.factory)(&Resolver::new(self, ordinal))?;
        // Dispose may have raced with construction; do not resurrect.
        if self.is_disposed() {
            return Err(ContainerError::Disposed);
        }
        debug!(service = slot.name, ordinal, "Service instantiated");
        *instance = Some(Arc::clone(&created));
        Ok(created)
    }

    /// Instantiate every service in registration order.
    ///
    /// Returns the number of services now live.
    pub fn instantiate_all(&self) -> Result<usize, ContainerError> {
        for slot in &self.slots {
            self.resolve_erased(slot.type_id, slot.name, None)?;
        }
        Ok(self.slots.len())
    }

    /// Whether `T` is registered.
    #[must_use]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<T>())
    }

    /// Whether `T` has already been instantiated.
    #[must_use]
    pub fn is_instantiated<T: ?Sized + 'static>(&self) -> bool {
        self.index
            .get(&TypeId::of::<T>())
            .is_some_and(|&i| self.slots[i].instance.lock().is_some())
    }

    /// Registered service type names, in registration order.
    #[must_use]
    pub fn service_names(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.name).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Release every instance and refuse further resolution.
    ///
    /// Instances are dropped in reverse registration order. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut released = 0;
        for slot in self.slots.iter().rev() {
            if slot.instance.lock().take().is_some() {
                released += 1;
            }
        }
        info!(released, "Service container disposed");
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
