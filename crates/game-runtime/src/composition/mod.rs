//! # Composition Root
//!
//! The one place where the service graph is assembled.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration
//! 2. Create the event bus
//! 3. Create the lifecycle state machine around that bus
//! 4. Register both into the container builder
//! 5. Run every enabled installer, in order
//! 6. Build the container (and warm it when `eager_services` is set)
//! 7. Activate installers against the built container
//!
//! ## Process Guard
//!
//! [`CompositionRoot::claim`] may succeed once per process. A second claim is
//! rejected instead of silently building a second, divergent graph. The
//! guard is never released, not even when composition later fails.
//! [`CompositionRoot::isolated`] skips the guard for tests and for hosts that
//! embed several independent runtimes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shared_bus::{EventPublisher, InMemoryEventBus};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::container::{
    ConfigError, ContainerBuilder, ContainerError, RuntimeConfig, ServiceContainer,
};
use crate::lifecycle::LifecycleStateMachine;
use crate::registry::InstallerId;
use crate::wiring::{Installer, InstallerKind};

static COMPOSED: AtomicBool = AtomicBool::new(false);

/// Errors from composing the runtime.
#[derive(Debug, Error)]
pub enum CompositionError {
    /// The process-wide root was already claimed.
    #[error("Composition root already claimed in this process")]
    AlreadyComposed,

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// An installer failed; composition stopped there.
    #[error("Installer {installer} failed: {source}")]
    Installer {
        installer: &'static str,
        #[source]
        source: ContainerError,
    },

    /// An installer ran before one it depends on.
    #[error("Installer {installer} requires {dependency} to be installed first")]
    MissingInstallerDependency {
        installer: &'static str,
        dependency: &'static str,
    },
}

/// Unconsumed composition root.
#[derive(Debug)]
pub struct CompositionRoot {
    config: RuntimeConfig,
    guarded: bool,
}

impl CompositionRoot {
    /// Take the process-wide root.
    pub fn claim(config: RuntimeConfig) -> Result<Self, CompositionError> {
        if COMPOSED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected second composition root");
            return Err(CompositionError::AlreadyComposed);
        }
        Ok(Self {
            config,
            guarded: true,
        })
    }

    /// A root outside the process guard.
    #[must_use]
    pub fn isolated(config: RuntimeConfig) -> Self {
        Self {
            config,
            guarded: false,
        }
    }

    /// Whether [`claim`](Self::claim) has succeeded in this process.
    #[must_use]
    pub fn is_claimed() -> bool {
        COMPOSED.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Build the runtime. Installers whose id is disabled in the config are
    /// skipped; the rest run in the order given.
    #[instrument(name = "compose", skip_all, fields(guarded = self.guarded))]
    pub fn compose(
        self,
        installers: impl IntoIterator<Item = InstallerKind>,
    ) -> Result<AppContext, CompositionError> {
        let config = self.config;
        config.validate()?;
        config.installers.log_status();

        let bus = Arc::new(InMemoryEventBus::new());
        let lifecycle = Arc::new(LifecycleStateMachine::new(
            Arc::clone(&bus),
            config.lifecycle.clone(),
        ));

        let mut builder = ContainerBuilder::new();
        builder
            .register_instance(Arc::clone(&bus))?
            .register_instance(Arc::clone(&lifecycle))?;

        let mut active: Vec<InstallerKind> = Vec::new();
        for installer in installers {
            let id = installer.id();
            if !config.installers.is_enabled(id) {
                info!(installer = id.name(), "Installer disabled, skipping");
                continue;
            }
            if let Some(dep) = id
                .dependencies()
                .iter()
                .find(|dep| !active.iter().any(|done| done.id() == **dep))
            {
                return Err(CompositionError::MissingInstallerDependency {
                    installer: id.name(),
                    dependency: dep.name(),
                });
            }

            installer
                .install(&mut builder, &bus)
                .map_err(|source| CompositionError::Installer {
                    installer: id.name(),
                    source,
                })?;
            active.push(installer);
        }

        let container = Arc::new(builder.build());
        if config.eager_services {
            let live = container.instantiate_all()?;
            info!(services = live, "Services instantiated eagerly");
        }

        for installer in &active {
            installer
                .activate(&container, &lifecycle)
                .map_err(|source| CompositionError::Installer {
                    installer: installer.id().name(),
                    source,
                })?;
        }

        let installed: Vec<InstallerId> = active.iter().map(Installer::id).collect();
        info!(
            services = container.len(),
            installers = installed.len(),
            "Runtime composed"
        );

        Ok(AppContext {
            config,
            bus,
            lifecycle,
            container,
            installed,
        })
    }
}

/// The composed runtime, passed explicitly to whoever needs it.
pub struct AppContext {
    config: RuntimeConfig,
    bus: Arc<InMemoryEventBus>,
    lifecycle: Arc<LifecycleStateMachine>,
    container: Arc<ServiceContainer>,
    installed: Vec<InstallerId>,
}

impl AppContext {
    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    #[must_use]
    pub fn lifecycle(&self) -> &Arc<LifecycleStateMachine> {
        &self.lifecycle
    }

    #[must_use]
    pub fn container(&self) -> &Arc<ServiceContainer> {
        &self.container
    }

    /// Shorthand for `container().resolve::<T>()`.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        self.container.resolve::<T>()
    }

    /// `Ok(None)` when no enabled installer registered `T`.
    pub fn resolve_optional<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<T>>, ContainerError> {
        self.container.resolve_optional::<T>()
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Installers that ran, in order.
    #[must_use]
    pub fn installed(&self) -> &[InstallerId] {
        &self.installed
    }

    /// Tear the runtime down: lifecycle, then container, then bus.
    ///
    /// Idempotent.
    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
        self.container.dispose();
        self.bus.dispose();
        info!(
            final_state = %self.lifecycle.current_state(),
            events_published = self.bus.events_published(),
            "Runtime shut down"
        );
    }
}
