//! Landfall camera-driver plugin contract.
//!
//! Camera drivers (network, Bluetooth or serial) implement one capability
//! interface, [`CameraBackend`], and report back to the host through ordered
//! notifications: state-changed (a full [`CameraState`] snapshot) and
//! connection-status ([`ConnectionStatus`]). Hosts hold drivers as
//! `Arc<dyn CameraBackend>` and build them by name from a [`DriverRegistry`].
//!
//! Around the contract the crate provides:
//!
//! - [`driver::DriverCore`], the bookkeeping every driver needs (lifecycle,
//!   emission ordering, monitor task, cancellation);
//! - [`drivers::SimulatedCamera`], a complete driver with no hardware;
//! - [`config::Settings`], figment-based configuration;
//! - [`manager::CameraManager`], fan-out over several cameras;
//! - [`retry::connect_with_retry`], reconnect with backoff.

pub mod backend;
pub mod config;
pub mod connection;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod events;
pub mod logging;
pub mod manager;
pub mod metadata;
pub mod observable;
pub mod parameter;
pub mod registry;
pub mod retry;
pub mod state;

pub use backend::{CameraBackend, DriverCapabilities, TransportKind};
pub use config::Settings;
pub use connection::{ConnectionState, ConnectionStatus};
pub use error::{CameraError, CameraResult};
pub use events::{CameraEvent, EventBus, EventReceiver, Subscription};
pub use manager::CameraManager;
pub use metadata::SlateMetadata;
pub use parameter::{CameraParameter, ParameterValue};
pub use registry::DriverRegistry;
pub use state::CameraState;
