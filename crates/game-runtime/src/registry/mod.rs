//! # Installer Registry
//!
//! Names the closed set of installers the composition root knows about,
//! their dependencies, and which of them are enabled.
//!
//! ## How It Works
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  InstallerConfig                     │
//! │                                                      │
//! │  ┌──────────┐   ┌───────────────┐   ┌──────────┐    │
//! │  │  input   │   │ scene_loading │   │ gameplay │    │
//! │  │ ENABLED  │   │   ENABLED     │   │ ENABLED  │    │
//! │  └────┬─────┘   └───────┬───────┘   └────┬─────┘    │
//! │       │                 │                │ needs     │
//! │       │◄────────────────┼────────────────┘ input     │
//! │       ▼                 ▼                            │
//! │            ContainerBuilder + Event Bus              │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//!
//! ```text
//! KS_INSTALLER_INPUT=true
//! KS_INSTALLER_SCENE_LOADING=false
//! KS_INSTALLER_GAMEPLAY=true
//! ```

use std::collections::HashMap;

use tracing::info;

use crate::container::ConfigError;

/// Installer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallerId {
    /// Registers the input adapter.
    Input,
    /// Registers the scene loader.
    SceneLoading,
    /// Registers movement and effects controllers.
    Gameplay,
}

impl InstallerId {
    /// Get the installer name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::SceneLoading => "scene_loading",
            Self::Gameplay => "gameplay",
        }
    }

    /// Installers that MUST run earlier for this one to work.
    #[must_use]
    pub fn dependencies(&self) -> &'static [InstallerId] {
        match self {
            Self::Input | Self::SceneLoading => &[],
            // Gameplay consumes input events.
            Self::Gameplay => &[Self::Input],
        }
    }

    /// Environment key that toggles this installer.
    #[must_use]
    pub fn env_key(&self) -> String {
        format!("KS_INSTALLER_{}", self.name().to_uppercase())
    }

    /// All installer IDs, in dependency order.
    #[must_use]
    pub fn all() -> [InstallerId; 3] {
        [Self::Input, Self::SceneLoading, Self::Gameplay]
    }
}

/// Which installers are enabled.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Map of installer ID to enabled status.
    pub enabled: HashMap<InstallerId, bool>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            enabled: InstallerId::all().into_iter().map(|id| (id, true)).collect(),
        }
    }
}

impl InstallerConfig {
    /// Check if an installer is enabled.
    #[must_use]
    pub fn is_enabled(&self, id: InstallerId) -> bool {
        self.enabled.get(&id).copied().unwrap_or(false)
    }

    pub fn enable(&mut self, id: InstallerId) {
        self.enabled.insert(id, true);
    }

    pub fn disable(&mut self, id: InstallerId) {
        self.enabled.insert(id, false);
    }

    /// Validate that every enabled installer's dependencies are enabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for id in InstallerId::all() {
            if !self.is_enabled(id) {
                continue;
            }
            if let Some(dep) = id.dependencies().iter().find(|d| !self.is_enabled(**d)) {
                return Err(ConfigError::DisabledDependency {
                    installer: id.name(),
                    dependency: dep.name(),
                });
            }
        }
        Ok(())
    }

    /// Log the enabled/disabled table.
    pub fn log_status(&self) {
        for id in InstallerId::all() {
            let state = if self.is_enabled(id) { "enabled" } else { "disabled" };
            info!(installer = id.name(), state, "Installer status");
        }
    }
}
