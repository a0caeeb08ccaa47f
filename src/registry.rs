//! Driver registry
//!
//! Maps driver names (as written in `[[cameras]] driver = "..."`) to
//! factories that build a [`CameraBackend`] from the camera's options table.

use crate::backend::CameraBackend;
use crate::drivers;
use crate::error::{CameraError, CameraResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Builds a driver instance from its `[cameras.options]` table.
pub type DriverFactory =
    Box<dyn Fn(&toml::Table) -> CameraResult<Arc<dyn CameraBackend>> + Send + Sync>;

/// Name-keyed collection of driver factories.
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.driver_names())
            .finish()
    }
}

impl DriverRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in drivers.
    pub fn with_builtin() -> CameraResult<Self> {
        let mut registry = Self::new();
        drivers::register_builtin(&mut registry)?;
        Ok(registry)
    }

    /// Register a factory under `name`. Names are unique.
    pub fn register<F>(&mut self, name: &str, factory: F) -> CameraResult<()>
    where
        F: Fn(&toml::Table) -> CameraResult<Arc<dyn CameraBackend>> + Send + Sync + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(CameraError::DuplicateDriver(name.to_string()));
        }
        debug!(driver = name, "Registered driver");
        self.factories.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    /// Build a driver instance.
    pub fn create(&self, name: &str, options: &toml::Table) -> CameraResult<Arc<dyn CameraBackend>> {
        self.factories
            .get(name)
            .ok_or_else(|| CameraError::UnknownDriver(name.to_string()))
            .and_then(|factory| factory(options))
    }

    /// Whether a factory exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered driver names, sorted.
    pub fn driver_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}
