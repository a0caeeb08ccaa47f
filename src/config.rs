//! Configuration using Figment
//!
//! Settings are layered, later sources winning:
//! 1. built-in defaults
//! 2. `config/landfall.toml` (or the path given to [`Settings::load_from`])
//! 3. environment variables prefixed with `LANDFALL_`
//!
//! # Environment Variable Overrides
//!
//! Nested keys are separated by a double underscore:
//!
//! ```text
//! LANDFALL_APPLICATION__LOG_LEVEL=debug
//! LANDFALL_APPLICATION__LOG_FORMAT=json
//! ```
//!
//! # Example
//!
//! ```no_run
//! use landfall_camera::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     for camera in settings.enabled_cameras() {
//!         println!("{} -> {} ({})", camera.id, camera.identifier, camera.driver);
//!     }
//!     Ok(())
//! }
//! ```

use crate::error::{CameraError, CameraResult};
use crate::logging::{self, LogFormat};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/landfall.toml";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "LANDFALL_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application settings
    pub application: ApplicationConfig,
    /// Camera definitions
    pub cameras: Vec<CameraDefinition>,
}

/// Application-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Display name
    pub name: String,
    /// trace | debug | info | warn | error
    pub log_level: String,
    /// pretty | json
    pub log_format: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// One camera the host should drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDefinition {
    /// Unique id used in logs and the CLI
    pub id: String,
    /// Registry name of the driver
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Address handed to `connect`
    pub identifier: String,
    /// Disabled cameras are skipped by the manager
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Upper bound on a single connect attempt
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Reconnect policy
    #[serde(default)]
    pub retry: RetryConfig,
    /// Driver-specific options, passed verbatim to the driver factory
    #[serde(default)]
    pub options: toml::Table,
}

impl CameraDefinition {
    /// Definition with defaults for everything but the essentials.
    pub fn new(id: impl Into<String>, driver: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            driver: driver.into(),
            identifier: identifier.into(),
            enabled: default_enabled(),
            connect_timeout_ms: default_connect_timeout_ms(),
            retry: RetryConfig::default(),
            options: toml::Table::new(),
        }
    }

    /// `connect_timeout_ms` as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Exponential backoff settings for connection attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_backoff_ms: u64,
    /// Cap on the delay
    pub max_backoff_ms: u64,
    /// Growth factor between delays
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 4000,
            multiplier: 2.0,
        }
    }
}

fn default_app_name() -> String {
    "Landfall".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_driver() -> String {
    "simulated".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

impl Settings {
    /// Load from [`DEFAULT_CONFIG_PATH`] plus environment overrides.
    pub fn load() -> CameraResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from `path` plus environment overrides, then validate.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> CameraResult<Self> {
        let settings: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from TOML text without consulting the environment.
    pub fn from_toml_str(text: &str) -> CameraResult<Self> {
        let settings: Self = Figment::new()
            .merge(Toml::string(text))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> CameraResult<()> {
        logging::validate_level(&self.application.log_level)?;
        self.application.log_format.parse::<LogFormat>()?;

        let mut seen = HashSet::new();
        for camera in &self.cameras {
            if camera.id.trim().is_empty() {
                return Err(CameraError::Configuration("Camera id must not be empty".into()));
            }
            if !seen.insert(camera.id.as_str()) {
                return Err(CameraError::Configuration(format!(
                    "Duplicate camera id '{}'",
                    camera.id
                )));
            }
            Self::validate_camera(camera)?;
        }
        Ok(())
    }

    fn validate_camera(camera: &CameraDefinition) -> CameraResult<()> {
        let invalid = |what: &str| {
            Err(CameraError::Configuration(format!(
                "Camera '{}': {}",
                camera.id, what
            )))
        };

        if camera.driver.trim().is_empty() {
            return invalid("driver must not be empty");
        }
        if camera.identifier.trim().is_empty() {
            return invalid("identifier must not be empty");
        }
        if camera.connect_timeout_ms == 0 {
            return invalid("connect_timeout_ms must be > 0");
        }

        let retry = &camera.retry;
        if retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be >= 1");
        }
        if retry.multiplier.is_nan() || retry.multiplier < 1.0 {
            return invalid("retry.multiplier must be >= 1.0");
        }
        if retry.initial_backoff_ms > retry.max_backoff_ms {
            return invalid("retry.initial_backoff_ms must not exceed retry.max_backoff_ms");
        }
        Ok(())
    }

    /// Parsed `log_format`; `Pretty` if it somehow fails to parse.
    pub fn log_format(&self) -> LogFormat {
        self.application.log_format.parse().unwrap_or_default()
    }

    /// Cameras with `enabled = true`.
    pub fn enabled_cameras(&self) -> Vec<&CameraDefinition> {
        self.cameras.iter().filter(|c| c.enabled).collect()
    }

    /// Look up a camera by id.
    pub fn camera(&self, id: &str) -> Option<&CameraDefinition> {
        self.cameras.iter().find(|c| c.id == id)
    }
}
