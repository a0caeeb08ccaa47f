//! Exposure parameter vocabulary and driver-agnostic parameter values.
//!
//! The contract fixes the parameter names a host may set to `iso`, `shutter`,
//! `iris` and `wb`. Values are deliberately loose: a host may hand over `800`,
//! `"800"`, `"f/2.8"` or `"5600K"`, and each driver decides what it accepts.

use crate::error::{CameraError, CameraResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the exposure/configuration settings a driver may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CameraParameter {
    /// Sensor sensitivity.
    #[serde(rename = "iso")]
    Iso,
    /// Shutter speed or angle.
    #[serde(rename = "shutter")]
    Shutter,
    /// Aperture.
    #[serde(rename = "iris")]
    Iris,
    /// Color temperature or preset.
    #[serde(rename = "wb")]
    WhiteBalance,
}

impl CameraParameter {
    /// Every parameter in the vocabulary.
    pub const ALL: [CameraParameter; 4] = [
        CameraParameter::Iso,
        CameraParameter::Shutter,
        CameraParameter::Iris,
        CameraParameter::WhiteBalance,
    ];

    /// Wire name used by hosts (`iso`, `shutter`, `iris`, `wb`).
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraParameter::Iso => "iso",
            CameraParameter::Shutter => "shutter",
            CameraParameter::Iris => "iris",
            CameraParameter::WhiteBalance => "wb",
        }
    }
}

impl fmt::Display for CameraParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraParameter {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iso" => Ok(CameraParameter::Iso),
            "shutter" => Ok(CameraParameter::Shutter),
            "iris" => Ok(CameraParameter::Iris),
            "wb" | "white_balance" => Ok(CameraParameter::WhiteBalance),
            _ => Err(CameraError::UnknownParameter(s.to_string())),
        }
    }
}

/// Value handed to `set_parameter`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Free text (`"1/50"`, `"f/2.8"`, `"daylight"`).
    String(String),
    /// No value.
    Null,
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(b) => write!(f, "{}", b),
            ParameterValue::Int(i) => write!(f, "{}", i),
            ParameterValue::Float(fl) => write!(f, "{}", fl),
            ParameterValue::String(s) => write!(f, "{}", s),
            ParameterValue::Null => write!(f, "null"),
        }
    }
}

impl ParameterValue {
    /// Extract value as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(f) => Some(*f),
            ParameterValue::Int(i) => Some(*i as f64),
            ParameterValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Extract value as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(i) => Some(*i),
            ParameterValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            ParameterValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Render the value as the text stored in `CameraState`.
    ///
    /// Exposure settings are never boolean or empty, so those are rejected for
    /// every parameter before a driver sees them.
    pub fn to_setting(&self, param: CameraParameter) -> CameraResult<String> {
        let invalid = |reason: &str| CameraError::InvalidValue {
            param,
            value: self.to_string(),
            reason: reason.to_string(),
        };
        match self {
            ParameterValue::Null => Err(invalid("a value is required")),
            ParameterValue::Bool(_) => Err(invalid("boolean values are not exposure settings")),
            ParameterValue::String(s) if s.trim().is_empty() => Err(invalid("value is empty")),
            ParameterValue::String(s) => Ok(s.trim().to_string()),
            other => Ok(other.to_string()),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Int(value as i64)
    }
}

impl From<u32> for ParameterValue {
    fn from(value: u32) -> Self {
        ParameterValue::Int(value as i64)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::String(value)
    }
}

impl<T: Into<ParameterValue>> From<Option<T>> for ParameterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParameterValue::Null, Into::into)
    }
}
