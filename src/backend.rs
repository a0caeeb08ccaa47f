//! The public contract for Landfall camera drivers.
//!
//! Every driver, whatever its transport (network, Bluetooth, serial) or
//! vendor protocol, implements [`CameraBackend`]. Hosts hold drivers as
//! `Arc<dyn CameraBackend>` and never need to know which one they talk to.
//!
//! # Contract
//!
//! - All operations are `async` and must only suspend on transport I/O, never
//!   block the executor thread.
//! - `connect` reports failure by returning `false` and must release anything
//!   it acquired before doing so. A connection-status notification with the
//!   reason is recommended.
//! - `disconnect` is idempotent and leaves the driver silent: no further
//!   notifications are emitted once it returns.
//! - `start_record` / `stop_record` may return before the camera confirms;
//!   confirmation arrives as a state-changed notification.
//! - `set_parameter` failures are returned as `Err`, never swallowed.
//! - Notifications are delivered to observers in emission order.
//! - Operations take `&self`; a driver that can see overlapping calls guards
//!   its own transport.
//!
//! Drivers normally embed a [`DriverCore`](crate::driver::DriverCore), which
//! implements the bookkeeping behind most of these rules.

use crate::connection::ConnectionState;
use crate::error::{CameraError, CameraResult};
use crate::events::{EventBus, EventReceiver};
use crate::metadata::SlateMetadata;
use crate::parameter::{CameraParameter, ParameterValue};
use crate::state::CameraState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How a driver reaches its camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// IP network (HTTP, TCP, UDP).
    Network,
    /// Bluetooth Low Energy.
    Bluetooth,
    /// Serial / USB-serial port.
    Serial,
    /// No hardware; simulated in-process.
    Simulated,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Network => "network",
            TransportKind::Bluetooth => "bluetooth",
            TransportKind::Serial => "serial",
            TransportKind::Simulated => "simulated",
        };
        f.write_str(name)
    }
}

/// What a driver can do, so hosts can grey out controls up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverCapabilities {
    /// Parameters `set_parameter` accepts.
    pub parameters: BTreeSet<CameraParameter>,
    /// Whether `inject_metadata` is supported.
    pub slate_metadata: bool,
    /// Transport used to reach the camera.
    pub transport: TransportKind,
}

impl DriverCapabilities {
    /// Capabilities with every parameter and slate support.
    pub fn full(transport: TransportKind) -> Self {
        Self {
            parameters: CameraParameter::ALL.into_iter().collect(),
            slate_metadata: true,
            transport,
        }
    }

    /// Whether `param` can be set.
    pub fn supports(&self, param: CameraParameter) -> bool {
        self.parameters.contains(&param)
    }
}

/// Capability interface every camera driver implements.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Registry name of the driver (`"simulated"`, `"blackmagic"`, ...).
    fn driver_name(&self) -> &str;

    /// Static description of what this driver supports.
    fn capabilities(&self) -> DriverCapabilities;

    /// Last-known snapshot.
    fn state(&self) -> CameraState;

    /// Current lifecycle state.
    fn connection_state(&self) -> ConnectionState;

    /// The driver's notification bus.
    fn events(&self) -> &EventBus;

    /// Register an observer for both notification channels.
    fn subscribe(&self) -> EventReceiver {
        self.events().subscribe()
    }

    /// Connect to the camera at `identifier` (IP, MAC or port; driver-specific).
    ///
    /// Returns `true` on success. On failure returns `false` with no resources
    /// held; the reason goes out as a connection-status notification.
    ///
    /// Dropping the future mid-attempt (e.g. under `tokio::time::timeout`)
    /// must leave the driver `Disconnected`. Drivers built on `DriverCore`
    /// get this from [`DriverCore::begin_connect_attempt`].
    ///
    /// [`DriverCore::begin_connect_attempt`]: crate::driver::DriverCore::begin_connect_attempt
    async fn connect(&self, identifier: &str) -> bool;

    /// Release every resource `connect` acquired. Safe to call at any time.
    async fn disconnect(&self);

    /// Ask the camera to start recording.
    async fn start_record(&self) -> CameraResult<()>;

    /// Ask the camera to stop recording.
    async fn stop_record(&self) -> CameraResult<()>;

    /// Set one exposure parameter.
    async fn set_parameter(&self, param: CameraParameter, value: ParameterValue)
        -> CameraResult<()>;

    /// Write slate metadata into the camera.
    async fn inject_metadata(&self, metadata: &SlateMetadata) -> CameraResult<()>;

    /// Set a parameter by its wire name (`iso`, `shutter`, `iris`, `wb`).
    ///
    /// Unknown names fail with `UnknownParameter`; names outside
    /// [`capabilities`](Self::capabilities) fail with `UnsupportedParameter`
    /// before the driver is invoked.
    async fn set_parameter_by_name(&self, name: &str, value: ParameterValue) -> CameraResult<()> {
        let param: CameraParameter = name.parse()?;
        if !self.capabilities().supports(param) {
            return Err(CameraError::UnsupportedParameter {
                param,
                driver: self.driver_name().to_string(),
            });
        }
        self.set_parameter(param, value).await
    }
}
