//! Built-in camera drivers.
//!
//! Vendor drivers live in their own modules and register a factory with the
//! [`DriverRegistry`](crate::registry::DriverRegistry) under their name.

pub mod simulated;

pub use simulated::{SimulatedCamera, SimulatedOptions};

use crate::backend::CameraBackend;
use crate::error::CameraResult;
use crate::registry::DriverRegistry;
use std::sync::Arc;

/// Register every built-in driver.
pub fn register_builtin(registry: &mut DriverRegistry) -> CameraResult<()> {
    registry.register(simulated::DRIVER_NAME, |options| {
        let camera = SimulatedCamera::from_table(options)?;
        Ok(Arc::new(camera) as Arc<dyn CameraBackend>)
    })
}
