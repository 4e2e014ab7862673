//! # Installers
//!
//! Each installer registers one group of adapters into the container.
//!
//! ## Registration Order
//!
//! ```text
//! ordinal 0  InMemoryEventBus         (composition root)
//! ordinal 1  LifecycleStateMachine    (composition root)
//! ─────────────────────────────────────────────────────
//!            InputService             input
//!            SceneLoader              scene_loading
//!            MovementController       gameplay  -> LifecycleStateMachine
//!            EffectsController        gameplay
//! ```
//!
//! Factories only reach back to earlier ordinals, so the order above is also
//! the only legal construction order.

use std::sync::Arc;

use shared_bus::InMemoryEventBus;
use tracing::debug;

use crate::adapters::{EffectsController, InputService, MovementController, SceneLoader};
use crate::container::{
    ContainerBuilder, ContainerError, MovementConfig, RuntimeConfig, SceneConfig, ServiceContainer,
};
use crate::lifecycle::{LifecycleStateMachine, TransitionHook};
use crate::registry::InstallerId;

/// Extends the service graph built by the composition root.
pub trait Installer: Send + Sync {
    fn id(&self) -> InstallerId;

    /// Register services. Runs once, before the container is built.
    fn install(
        &self,
        builder: &mut ContainerBuilder,
        bus: &Arc<InMemoryEventBus>,
    ) -> Result<(), ContainerError>;

    /// Runs once after the container is built.
    fn activate(
        &self,
        _container: &ServiceContainer,
        _lifecycle: &LifecycleStateMachine,
    ) -> Result<(), ContainerError> {
        Ok(())
    }
}

/// Registers [`InputService`].
#[derive(Debug, Clone, Default)]
pub struct InputInstaller;

impl Installer for InputInstaller {
    fn id(&self) -> InstallerId {
        InstallerId::Input
    }

    fn install(
        &self,
        builder: &mut ContainerBuilder,
        bus: &Arc<InMemoryEventBus>,
    ) -> Result<(), ContainerError> {
        let bus = Arc::clone(bus);
        builder.register::<InputService, _>(move |_| {
            Ok(Arc::new(InputService::new(Arc::clone(&bus))))
        })?;
        Ok(())
    }
}

/// Registers [`SceneLoader`] and hooks it into initialization.
#[derive(Debug, Clone, Default)]
pub struct SceneLoadingInstaller {
    pub config: SceneConfig,
}

impl Installer for SceneLoadingInstaller {
    fn id(&self) -> InstallerId {
        InstallerId::SceneLoading
    }

    fn install(
        &self,
        builder: &mut ContainerBuilder,
        bus: &Arc<InMemoryEventBus>,
    ) -> Result<(), ContainerError> {
        let bus = Arc::clone(bus);
        let config = self.config.clone();
        builder.register::<SceneLoader, _>(move |_| {
            Ok(Arc::new(SceneLoader::new(Arc::clone(&bus), config.clone())))
        })?;
        Ok(())
    }

    fn activate(
        &self,
        container: &ServiceContainer,
        lifecycle: &LifecycleStateMachine,
    ) -> Result<(), ContainerError> {
        let loader = container.resolve::<SceneLoader>()?;
        lifecycle.add_hook(loader as Arc<dyn TransitionHook>);
        Ok(())
    }
}

/// Registers [`MovementController`] and [`EffectsController`].
#[derive(Debug, Clone, Default)]
pub struct GameplayInstaller {
    pub movement: MovementConfig,
}

impl Installer for GameplayInstaller {
    fn id(&self) -> InstallerId {
        InstallerId::Gameplay
    }

    fn install(
        &self,
        builder: &mut ContainerBuilder,
        bus: &Arc<InMemoryEventBus>,
    ) -> Result<(), ContainerError> {
        let movement_bus = Arc::clone(bus);
        let movement = self.movement.clone();
        builder.register::<MovementController, _>(move |resolver| {
            let lifecycle = resolver.resolve::<LifecycleStateMachine>()?;
            MovementController::new(&movement_bus, movement.clone(), lifecycle.current_state())
                .map(Arc::new)
                .map_err(ContainerError::factory::<MovementController>)
        })?;

        let effects_bus = Arc::clone(bus);
        builder.register::<EffectsController, _>(move |_| {
            EffectsController::new(&effects_bus)
                .map(Arc::new)
                .map_err(ContainerError::factory::<EffectsController>)
        })?;
        Ok(())
    }

    /// Controllers only react to events, so nothing would ever resolve them
    /// on demand; start them here.
    fn activate(
        &self,
        container: &ServiceContainer,
        _lifecycle: &LifecycleStateMachine,
    ) -> Result<(), ContainerError> {
        container.resolve::<MovementController>()?;
        container.resolve::<EffectsController>()?;
        Ok(())
    }
}

/// The closed set of installers the runtime ships with.
#[derive(Debug, Clone)]
pub enum InstallerKind {
    Input(InputInstaller),
    SceneLoading(SceneLoadingInstaller),
    Gameplay(GameplayInstaller),
}

impl InstallerKind {
    /// One installer per [`InstallerId`], in dependency order, configured
    /// from `config`. Disabled installers are still listed; the composition
    /// root skips them.
    #[must_use]
    pub fn defaults(config: &RuntimeConfig) -> Vec<InstallerKind> {
        InstallerId::all()
            .into_iter()
            .map(|id| Self::for_id(id, config))
            .collect()
    }

    #[must_use]
    pub fn for_id(id: InstallerId, config: &RuntimeConfig) -> InstallerKind {
        match id {
            InstallerId::Input => Self::Input(InputInstaller),
            InstallerId::SceneLoading => Self::SceneLoading(SceneLoadingInstaller {
                config: config.scene.clone(),
            }),
            InstallerId::Gameplay => Self::Gameplay(GameplayInstaller {
                movement: config.movement.clone(),
            }),
        }
    }

    fn inner(&self) -> &dyn Installer {
        match self {
            Self::Input(i) => i,
            Self::SceneLoading(i) => i,
            Self::Gameplay(i) => i,
        }
    }
}

impl Installer for InstallerKind {
    fn id(&self) -> InstallerId {
        self.inner().id()
    }

    fn install(
        &self,
        builder: &mut ContainerBuilder,
        bus: &Arc<InMemoryEventBus>,
    ) -> Result<(), ContainerError> {
        debug!(installer = self.id().name(), "Running installer");
        self.inner().install(builder, bus)
    }

    fn activate(
        &self,
        container: &ServiceContainer,
        lifecycle: &LifecycleStateMachine,
    ) -> Result<(), ContainerError> {
        self.inner().activate(container, lifecycle)
    }
}
