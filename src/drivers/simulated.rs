//! Simulated camera driver
//!
//! A complete [`CameraBackend`] with no hardware behind it. It behaves like a
//! network camera with a fixed round-trip latency: connects take one round
//! trip, record commands are confirmed one round trip after they are sent,
//! and a monitor task polls the battery on a fixed interval.
//!
//! Used for driver conformance tests and for developing hosts away from
//! the camera cart. All waits use `tokio::time`, so tests can run it under
//! paused time.
//!
//! # Options
//!
//! ```toml
//! [cameras.options]
//! latency_ms = 20
//! poll_interval_ms = 1000
//! supported_parameters = ["iso", "shutter", "iris", "wb"]
//! supports_metadata = true
//! reject_identifiers = ["10.0.0.99"]
//! battery_volts = 16.8
//! battery_drain_volts = 0.01
//! lens_info = "Simulated 35mm T1.5"
//! ```

use crate::backend::{CameraBackend, DriverCapabilities, TransportKind};
use crate::connection::ConnectionState;
use crate::driver::DriverCore;
use crate::error::{CameraError, CameraResult};
use crate::events::EventBus;
use crate::metadata::SlateMetadata;
use crate::parameter::{CameraParameter, ParameterValue};
use crate::state::CameraState;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Registry name of the simulated driver.
pub const DRIVER_NAME: &str = "simulated";

/// ISO range accepted by the simulated sensor.
pub const ISO_RANGE: std::ops::RangeInclusive<i64> = 50..=25_600;
/// Aperture range (f-number) accepted by the simulated lens.
pub const IRIS_RANGE: std::ops::RangeInclusive<f64> = 0.7..=32.0;
/// Color temperature range in Kelvin.
pub const KELVIN_RANGE: std::ops::RangeInclusive<i64> = 2_000..=11_000;
/// White balance presets accepted besides Kelvin values.
pub const WB_PRESETS: [&str; 6] = ["auto", "daylight", "tungsten", "cloudy", "shade", "fluorescent"];

/// Behavior knobs for [`SimulatedCamera`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatedOptions {
    /// Simulated round trip for every command.
    pub latency_ms: u64,
    /// Battery polling period.
    pub poll_interval_ms: u64,
    /// Parameters the simulated body exposes.
    pub supported_parameters: Vec<CameraParameter>,
    /// Whether slates can be injected.
    pub supports_metadata: bool,
    /// Identifiers that never answer.
    pub reject_identifiers: Vec<String>,
    /// Battery voltage reported after connecting.
    pub battery_volts: f64,
    /// Voltage lost on every poll.
    pub battery_drain_volts: f64,
    /// Lens reported after connecting.
    pub lens_info: String,
}

impl Default for SimulatedOptions {
    fn default() -> Self {
        Self {
            latency_ms: 20,
            poll_interval_ms: 1000,
            supported_parameters: CameraParameter::ALL.to_vec(),
            supports_metadata: true,
            reject_identifiers: Vec::new(),
            battery_volts: 16.8,
            battery_drain_volts: 0.01,
            lens_info: "Simulated 35mm T1.5".to_string(),
        }
    }
}

impl SimulatedOptions {
    /// Parse options from a registry/config table.
    pub fn from_table(table: &toml::Table) -> CameraResult<Self> {
        let options: Self = toml::Value::Table(table.clone())
            .try_into()
            .map_err(|e: toml::de::Error| CameraError::InvalidDriverOptions {
                driver: DRIVER_NAME.to_string(),
                reason: e.to_string(),
            })?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> CameraResult<()> {
        let invalid = |reason: String| CameraError::InvalidDriverOptions {
            driver: DRIVER_NAME.to_string(),
            reason,
        };
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms must be > 0".into()));
        }
        if !(0.0..=100.0).contains(&self.battery_volts) {
            return Err(invalid(format!(
                "battery_volts {} out of range [0, 100]",
                self.battery_volts
            )));
        }
        if self.battery_drain_volts < 0.0 {
            return Err(invalid("battery_drain_volts must be >= 0".into()));
        }
        Ok(())
    }

    fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

/// In-process camera implementing the full driver contract.
pub struct SimulatedCamera {
    core: Arc<DriverCore>,
    options: SimulatedOptions,
    identifier: Mutex<Option<String>>,
    last_slate: Mutex<Option<SlateMetadata>>,
    /// Outstanding record confirmations
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new(SimulatedOptions::default())
    }
}

impl std::fmt::Debug for SimulatedCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedCamera")
            .field("core", &self.core)
            .field("identifier", &*self.identifier.lock())
            .finish()
    }
}

impl SimulatedCamera {
    /// Create a disconnected simulated camera.
    pub fn new(options: SimulatedOptions) -> Self {
        Self {
            core: Arc::new(DriverCore::new(DRIVER_NAME)),
            options,
            identifier: Mutex::new(None),
            last_slate: Mutex::new(None),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Create from a registry/config options table.
    pub fn from_table(table: &toml::Table) -> CameraResult<Self> {
        SimulatedOptions::from_table(table).map(Self::new)
    }

    /// Options this camera was built with.
    pub fn options(&self) -> &SimulatedOptions {
        &self.options
    }

    /// Shared driver bookkeeping.
    pub fn core(&self) -> &DriverCore {
        &self.core
    }

    /// Identifier of the current connection.
    pub fn identifier(&self) -> Option<String> {
        self.identifier.lock().clone()
    }

    /// The most recently injected slate.
    pub fn last_slate(&self) -> Option<SlateMetadata> {
        self.last_slate.lock().clone()
    }

    /// Drop the link as if the network went away.
    ///
    /// Stops polling, resets the snapshot and reports `connected = false`
    /// with "Link lost". No-op when not connected.
    pub async fn simulate_link_loss(&self) {
        if !self.core.begin_disconnect() {
            return;
        }
        warn!(driver = DRIVER_NAME, "Simulating link loss");
        self.teardown("Link lost").await;
    }

    async fn teardown(&self, message: &str) {
        self.core.stop_monitor().await;
        self.abort_pending();
        *self.identifier.lock() = None;
        self.core.finish_disconnect(message);
    }

    fn abort_pending(&self) {
        for task in self.pending.lock().drain(..) {
            task.abort();
        }
    }

    /// One simulated round trip, abandoned if a disconnect starts.
    async fn round_trip(&self) -> CameraResult<()> {
        let latency = self.options.latency();
        self.core
            .cancellable(async move {
                sleep(latency).await;
                Ok(())
            })
            .await
    }

    async fn handshake(&self, identifier: &str) -> CameraResult<()> {
        if identifier.is_empty() {
            return Err(CameraError::Transport("identifier is empty".into()));
        }
        self.round_trip().await.map_err(|_| {
            CameraError::Transport(format!("connect to {} cancelled", identifier))
        })?;
        if self.options.reject_identifiers.iter().any(|r| r == identifier) {
            return Err(CameraError::Transport(format!(
                "no camera responded at {}",
                identifier
            )));
        }
        Ok(())
    }

    fn initial_state(&self) -> CameraState {
        CameraState::default()
            .with_parameter(CameraParameter::Iso, "400")
            .with_parameter(CameraParameter::Shutter, "1/50")
            .with_parameter(CameraParameter::Iris, "f/2.8")
            .with_parameter(CameraParameter::WhiteBalance, "5600K")
            .with_battery_voltage(self.options.battery_volts)
            .with_lens_info(self.options.lens_info.clone())
    }

    fn start_monitor(&self) -> CameraResult<()> {
        let core = Arc::downgrade(&self.core);
        let period = Duration::from_millis(self.options.poll_interval_ms);
        let drain = self.options.battery_drain_volts;

        self.core.spawn_monitor(move |mut shutdown| async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = interval.tick() => {
                        let Some(core) = core.upgrade() else { break };
                        let polled = core.update_state(|state| {
                            let volts = (state.battery().unwrap_or(0.0) - drain).max(0.0);
                            state.with_battery_voltage(volts)
                        });
                        match polled {
                            Ok(_) => debug!(driver = DRIVER_NAME, volts = core.state().battery_voltage, "Battery polled"),
                            Err(_) => break,
                        }
                    }
                }
            }
        })
    }

    /// Confirm a record transition one round trip from now.
    fn confirm_later(&self, recording: bool) -> CameraResult<()> {
        let core = Arc::downgrade(&self.core);
        let latency = self.options.latency();
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CameraError::Runtime(e.to_string()))?;
        let task = runtime.spawn(async move {
            sleep(latency).await;
            let Some(core) = core.upgrade() else { return };
            match core.set_recording(recording) {
                Ok(_) => info!(driver = DRIVER_NAME, recording, "Record state confirmed"),
                Err(e) => debug!(driver = DRIVER_NAME, error = %e, "Record confirmation dropped"),
            }
        });
        let mut pending = self.pending.lock();
        pending.retain(|t| !t.is_finished());
        pending.push(task);
        Ok(())
    }

    fn check_supported(&self, param: CameraParameter) -> CameraResult<()> {
        if self.options.supported_parameters.contains(&param) {
            Ok(())
        } else {
            Err(CameraError::UnsupportedParameter {
                param,
                driver: DRIVER_NAME.to_string(),
            })
        }
    }
}

/// Normalize and range-check a value for the simulated body.
pub fn validate_setting(param: CameraParameter, value: &ParameterValue) -> CameraResult<String> {
    let text = value.to_setting(param)?;
    let invalid = |reason: String| CameraError::InvalidValue {
        param,
        value: text.clone(),
        reason,
    };

    match param {
        CameraParameter::Iso => {
            let iso = value
                .as_i64()
                .ok_or_else(|| invalid("ISO must be an integer".into()))?;
            if !ISO_RANGE.contains(&iso) {
                return Err(invalid(format!(
                    "ISO must be within {}..={}",
                    ISO_RANGE.start(),
                    ISO_RANGE.end()
                )));
            }
            Ok(iso.to_string())
        }
        CameraParameter::Shutter => Ok(text.clone()),
        CameraParameter::Iris => {
            let number = match value.as_f64() {
                Some(number) => number,
                None => text
                    .trim_start_matches(['f', 'F', 'T', 't'])
                    .trim_start_matches('/')
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| invalid("expected an f-number such as f/2.8".into()))?,
            };
            if !IRIS_RANGE.contains(&number) {
                return Err(invalid(format!(
                    "f-number must be within {}..={}",
                    IRIS_RANGE.start(),
                    IRIS_RANGE.end()
                )));
            }
            Ok(format!("f/{}", number))
        }
        CameraParameter::WhiteBalance => {
            let lowered = text.to_ascii_lowercase();
            if let Some(preset) = WB_PRESETS.iter().find(|p| **p == lowered) {
                return Ok(preset.to_string());
            }
            let kelvin = lowered
                .trim_end_matches('k')
                .trim()
                .parse::<i64>()
                .map_err(|_| {
                    invalid(format!(
                        "expected Kelvin or one of: {}",
                        WB_PRESETS.join(", ")
                    ))
                })?;
            if !KELVIN_RANGE.contains(&kelvin) {
                return Err(invalid(format!(
                    "color temperature must be within {}K..={}K",
                    KELVIN_RANGE.start(),
                    KELVIN_RANGE.end()
                )));
            }
            Ok(format!("{}K", kelvin))
        }
    }
}

#[async_trait]
impl CameraBackend for SimulatedCamera {
    fn driver_name(&self) -> &str {
        DRIVER_NAME
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            parameters: self.options.supported_parameters.iter().copied().collect(),
            slate_metadata: self.options.supports_metadata,
            transport: TransportKind::Simulated,
        }
    }

    fn state(&self) -> CameraState {
        self.core.state()
    }

    fn connection_state(&self) -> ConnectionState {
        self.core.connection_state()
    }

    fn events(&self) -> &EventBus {
        self.core.events()
    }

    async fn connect(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();

        if self.core.connection_state().is_connected() {
            let current = self.identifier();
            if current.as_deref() == Some(identifier) {
                debug!(driver = DRIVER_NAME, identifier, "Already connected");
                return true;
            }
            warn!(
                driver = DRIVER_NAME,
                identifier,
                current = ?current,
                "Connect refused: already connected to another camera"
            );
            return false;
        }

        let attempt = match self.core.begin_connect_attempt() {
            Ok(attempt) => attempt,
            Err(e) => {
                warn!(driver = DRIVER_NAME, identifier, error = %e, "Connect refused");
                return false;
            }
        };
        info!(driver = DRIVER_NAME, identifier, "Connecting");

        if let Err(e) = self.handshake(identifier).await {
            attempt.fail(e.to_string());
            return false;
        }

        *self.identifier.lock() = Some(identifier.to_string());
        let initial = self.initial_state();
        if let Err(e) = attempt.finish(initial, format!("Connected to {}", identifier)) {
            debug!(driver = DRIVER_NAME, error = %e, "Connect overtaken by disconnect");
            *self.identifier.lock() = None;
            return false;
        }

        if let Err(e) = self.start_monitor() {
            warn!(driver = DRIVER_NAME, error = %e, "Monitor failed to start; dropping link");
            if self.core.begin_disconnect() {
                self.teardown("Monitor failed to start").await;
            }
            return false;
        }
        true
    }

    async fn disconnect(&self) {
        if !self.core.begin_disconnect() {
            self.core.wait_disconnected().await;
            return;
        }
        info!(driver = DRIVER_NAME, identifier = ?self.identifier(), "Disconnecting");
        self.teardown("Disconnected").await;
    }

    async fn start_record(&self) -> CameraResult<()> {
        let lifecycle = self.core.require_connected("start recording")?;
        // A start supersedes any stop still awaiting confirmation
        self.abort_pending();
        if lifecycle == ConnectionState::Recording {
            debug!(driver = DRIVER_NAME, "Already recording");
            return Ok(());
        }
        self.round_trip().await?;
        self.confirm_later(true)
    }

    async fn stop_record(&self) -> CameraResult<()> {
        self.core.require_connected("stop recording")?;
        // A stop supersedes any start still awaiting confirmation
        self.abort_pending();
        if self.core.connection_state() != ConnectionState::Recording {
            debug!(driver = DRIVER_NAME, "Not recording");
            return Ok(());
        }
        self.round_trip().await?;
        self.confirm_later(false)
    }

    async fn set_parameter(&self, param: CameraParameter, value: ParameterValue) -> CameraResult<()> {
        self.core.require_connected("set parameter")?;
        self.check_supported(param)?;
        let setting = validate_setting(param, &value)?;

        self.round_trip().await?;
        self.core
            .update_state(|state| state.with_parameter(param, setting.clone()))?;
        info!(driver = DRIVER_NAME, %param, value = %setting, "Parameter set");
        Ok(())
    }

    async fn inject_metadata(&self, metadata: &SlateMetadata) -> CameraResult<()> {
        self.core.require_connected("inject metadata")?;
        if !self.options.supports_metadata {
            return Err(CameraError::MetadataNotSupported(DRIVER_NAME.to_string()));
        }
        metadata.validate()?;

        self.round_trip().await?;
        *self.last_slate.lock() = Some(metadata.clone());
        info!(
            driver = DRIVER_NAME,
            fields = metadata.len(),
            scene = ?metadata.scene(),
            take = ?metadata.take(),
            "Slate injected"
        );
        Ok(())
    }
}
