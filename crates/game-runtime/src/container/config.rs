//! # Runtime Configuration
//!
//! Unified configuration for the lifecycle, the adapters and the installer
//! set.
//!
//! Every value has a sane default and can be overridden from the environment
//! with `RuntimeConfig::from_env`. A malformed override is an error, never a
//! silent fallback.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::registry::{InstallerConfig, InstallerId};

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment override could not be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    /// Scene loading needs at least one progress step.
    #[error("scene.progress_steps must be at least 1")]
    ZeroSceneSteps,

    /// Movement speed must be finite and positive.
    #[error("movement.speed must be a positive finite number, got {0}")]
    InvalidSpeed(String),

    /// An enabled installer depends on a disabled one.
    #[error("Installer {installer} requires {dependency}, but it is disabled")]
    DisabledDependency {
        installer: &'static str,
        dependency: &'static str,
    },
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Logging configuration.
    pub log: LogConfig,
    /// Lifecycle state machine configuration.
    pub lifecycle: LifecycleConfig,
    /// Scene loader configuration.
    pub scene: SceneConfig,
    /// Movement controller configuration.
    pub movement: MovementConfig,
    /// Which installers run.
    pub installers: InstallerConfig,
    /// Instantiate every registered service right after composition instead
    /// of on first resolution.
    pub eager_services: bool,
}

impl RuntimeConfig {
    /// Build configuration from defaults plus environment overrides.
    ///
    /// # Environment Variables
    ///
    /// - `KS_LOG_LEVEL`: log filter (default: info)
    /// - `KS_JSON_LOGS`: JSON formatted logs (default: false)
    /// - `KS_INIT_DELAY_MS`: initialization delay (default: 50)
    /// - `KS_NOTIFY_INTERMEDIATE`: publish the `Initializing` leg (default: true)
    /// - `KS_SCENE_STEPS`: progress events per scene load (default: 4)
    /// - `KS_SCENE_STEP_DELAY_MS`: delay between progress events (default: 10)
    /// - `KS_INITIAL_SCENE`: scene loaded during initialization, empty for none
    /// - `KS_MOVE_SPEED`: movement units per input (default: 5.0)
    /// - `KS_EAGER_SERVICES`: eager instantiation (default: false)
    /// - `KS_INSTALLER_<NAME>`: enable/disable an installer
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("KS_LOG_LEVEL") {
            config.log.level = level;
        }
        if let Some(json) = env_bool("KS_JSON_LOGS")? {
            config.log.json = json;
        }

        if let Some(ms) = env_parse::<u64>("KS_INIT_DELAY_MS")? {
            config.lifecycle.init_delay = Duration::from_millis(ms);
        }
        if let Some(notify) = env_bool("KS_NOTIFY_INTERMEDIATE")? {
            config.lifecycle.notify_intermediate = notify;
        }

        if let Some(steps) = env_parse::<u32>("KS_SCENE_STEPS")? {
            config.scene.progress_steps = steps;
        }
        if let Some(ms) = env_parse::<u64>("KS_SCENE_STEP_DELAY_MS")? {
            config.scene.step_delay = Duration::from_millis(ms);
        }
        if let Ok(scene) = std::env::var("KS_INITIAL_SCENE") {
            let scene = scene.trim();
            config.scene.initial_scene = (!scene.is_empty()).then(|| scene.to_string());
        }

        if let Some(speed) = env_parse::<f32>("KS_MOVE_SPEED")? {
            config.movement.speed = speed;
        }
        if let Some(eager) = env_bool("KS_EAGER_SERVICES")? {
            config.eager_services = eager;
        }

        for id in InstallerId::all() {
            if let Some(enabled) = env_bool(&id.env_key())? {
                config.installers.enabled.insert(id, enabled);
            }
        }

        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scene.progress_steps == 0 {
            return Err(ConfigError::ZeroSceneSteps);
        }
        if !self.movement.speed.is_finite() || self.movement.speed <= 0.0 {
            return Err(ConfigError::InvalidSpeed(self.movement.speed.to_string()));
        }
        self.installers.validate()
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        })
}

fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    parse_bool(&raw).map(Some).ok_or(ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw,
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Include the event target.
    pub with_target: bool,
    /// Include thread ids.
    pub with_thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            with_target: true,
            with_thread_ids: true,
        }
    }
}

/// Lifecycle state machine configuration.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Bounded delay performed before entering `MainMenu`.
    pub init_delay: Duration,
    /// Publish `Uninitialized -> Initializing` as well as the final
    /// `Initializing -> MainMenu` leg.
    pub notify_intermediate: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            init_delay: Duration::from_millis(50),
            notify_intermediate: true,
        }
    }
}

/// Scene loader configuration.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Number of progress events per load; the last one is always 1.0.
    pub progress_steps: u32,
    /// Delay between progress events.
    pub step_delay: Duration,
    /// Scene loaded while the lifecycle enters `MainMenu`, if any.
    pub initial_scene: Option<String>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            progress_steps: 4,
            step_delay: Duration::from_millis(10),
            initial_scene: Some("main_menu".to_string()),
        }
    }
}

/// Movement controller configuration.
#[derive(Debug, Clone)]
pub struct MovementConfig {
    /// World units applied per move input of unit length.
    pub speed: f32,
    /// Name reported in `ObjectMoved` events.
    pub object_name: String,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            object_name: "player".to_string(),
        }
    }
}
