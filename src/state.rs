//! Last-known observable status of a camera.
//!
//! A `CameraState` is a value: drivers never patch a published snapshot, they
//! build a new one with the `with_*` methods and publish it whole. Unknown
//! settings hold [`NOT_AVAILABLE`], unknown lens info is empty, and an unread
//! battery is `battery_voltage == 0.0` with `battery_known == false`.

use crate::parameter::CameraParameter;
use serde::{Deserialize, Serialize};

/// Placeholder for a setting the driver has not read yet.
pub const NOT_AVAILABLE: &str = "N/A";

/// Snapshot of a camera's observable status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraState {
    /// Whether the camera is recording.
    pub recording: bool,
    /// Sensor sensitivity.
    pub iso: String,
    /// Shutter speed or angle.
    pub shutter: String,
    /// Aperture.
    pub iris: String,
    /// Color temperature or preset.
    pub white_balance: String,
    /// Battery reading in volts, 0.0 until read.
    pub battery_voltage: f64,
    /// Whether `battery_voltage` holds an actual reading.
    pub battery_known: bool,
    /// Lens identification, empty when unknown.
    pub lens_info: String,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            recording: false,
            iso: NOT_AVAILABLE.to_string(),
            shutter: NOT_AVAILABLE.to_string(),
            iris: NOT_AVAILABLE.to_string(),
            white_balance: NOT_AVAILABLE.to_string(),
            battery_voltage: 0.0,
            battery_known: false,
            lens_info: String::new(),
        }
    }
}

impl CameraState {
    /// Battery voltage, or `None` when the driver has not read it.
    pub fn battery(&self) -> Option<f64> {
        self.battery_known.then_some(self.battery_voltage)
    }

    /// Current text of an exposure setting.
    pub fn parameter(&self, param: CameraParameter) -> &str {
        match param {
            CameraParameter::Iso => &self.iso,
            CameraParameter::Shutter => &self.shutter,
            CameraParameter::Iris => &self.iris,
            CameraParameter::WhiteBalance => &self.white_balance,
        }
    }

    /// Whether an exposure setting has been read from the camera.
    pub fn is_available(&self, param: CameraParameter) -> bool {
        self.parameter(param) != NOT_AVAILABLE
    }

    /// New snapshot with the recording flag set.
    pub fn with_recording(mut self, recording: bool) -> Self {
        self.recording = recording;
        self
    }

    /// New snapshot with one exposure setting replaced.
    pub fn with_parameter(mut self, param: CameraParameter, value: impl Into<String>) -> Self {
        let value = value.into();
        match param {
            CameraParameter::Iso => self.iso = value,
            CameraParameter::Shutter => self.shutter = value,
            CameraParameter::Iris => self.iris = value,
            CameraParameter::WhiteBalance => self.white_balance = value,
        }
        self
    }

    /// New snapshot carrying a battery reading.
    pub fn with_battery_voltage(mut self, volts: f64) -> Self {
        self.battery_voltage = volts;
        self.battery_known = true;
        self
    }

    /// New snapshot with the battery marked unread.
    pub fn without_battery(mut self) -> Self {
        self.battery_voltage = 0.0;
        self.battery_known = false;
        self
    }

    /// New snapshot with lens identification.
    pub fn with_lens_info(mut self, lens_info: impl Into<String>) -> Self {
        self.lens_info = lens_info.into();
        self
    }
}
