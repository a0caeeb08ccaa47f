//! Custom error types for the camera driver contract.
//!
//! `CameraError` is the single error type shared by the contract, the driver
//! plumbing, the registry and the configuration layer. Using `thiserror`, it
//! gives every failure a human-readable message the host can show directly.
//!
//! ## Error Hierarchy
//!
//! - **`Config`** / **`Configuration`**: loading errors from `figment` and
//!   semantic validation failures in the settings file.
//! - **`NotConnected`** / **`InvalidState`**: an operation was issued in a
//!   connection state that does not allow it.
//! - **`UnknownParameter`** / **`UnsupportedParameter`** / **`InvalidValue`**:
//!   the discoverable failures of `set_parameter`. A parameter name outside
//!   the `iso`/`shutter`/`iris`/`wb` vocabulary is *unknown*; a known name the
//!   driver cannot drive is *unsupported*.
//! - **`Transport`** / **`Timeout`**: runtime failures talking to the camera.
//! - **`UnknownDriver`** / **`DuplicateDriver`** / **`InvalidDriverOptions`**:
//!   driver registry failures.

use crate::connection::ConnectionState;
use crate::parameter::CameraParameter;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type CameraResult<T> = std::result::Result<T, CameraError>;

/// Errors produced by camera drivers and the surrounding runtime.
#[derive(Error, Debug)]
pub enum CameraError {
    /// The configuration sources could not be loaded or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// The configuration parsed but holds invalid values.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation needs an open connection.
    #[error("Camera not connected")]
    NotConnected,

    /// The operation is not valid from the current connection state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the driver was in.
        state: ConnectionState,
    },

    /// Parameter name outside the `iso`/`shutter`/`iris`/`wb` vocabulary.
    #[error("Unknown camera parameter '{0}' (expected one of: iso, shutter, iris, wb)")]
    UnknownParameter(String),

    /// Known parameter the driver cannot set.
    #[error("Parameter '{param}' is not supported by driver '{driver}'")]
    UnsupportedParameter {
        /// Parameter that was requested.
        param: CameraParameter,
        /// Driver that rejected it.
        driver: String,
    },

    /// Value rejected by the driver for the given parameter.
    #[error("Invalid value '{value}' for parameter '{param}': {reason}")]
    InvalidValue {
        /// Parameter being set.
        param: CameraParameter,
        /// Offending value, rendered as text.
        value: String,
        /// Why the driver rejected it.
        reason: String,
    },

    /// The driver cannot tag clips with slate metadata.
    #[error("Slate metadata injection is not supported by driver '{0}'")]
    MetadataNotSupported(String),

    /// The slate could not be accepted.
    #[error("Invalid slate metadata: {0}")]
    InvalidMetadata(String),

    /// Communication with the camera failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An operation did not complete in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// No factory is registered under this driver name.
    #[error("Unknown driver '{0}'")]
    UnknownDriver(String),

    /// A factory is already registered under this driver name.
    #[error("Driver '{0}' is already registered")]
    DuplicateDriver(String),

    /// Driver options table could not be interpreted.
    #[error("Invalid options for driver '{driver}': {reason}")]
    InvalidDriverOptions {
        /// Driver whose options were rejected.
        driver: String,
        /// Parse or validation failure.
        reason: String,
    },

    /// `connect_with_retry` gave up.
    #[error("Failed to connect to '{identifier}' after {attempts} attempts")]
    RetriesExhausted {
        /// Identifier that was dialled.
        identifier: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// A tokio runtime was required but not available.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Some cameras failed during a fan-out operation, keyed by camera id.
    #[error("{operation} failed on {} camera(s)", .failures.len())]
    FanOutFailed {
        operation: &'static str,
        failures: Vec<(String, CameraError)>,
    },
}

impl From<figment::Error> for CameraError {
    fn from(err: figment::Error) -> Self {
        CameraError::Config(Box::new(err))
    }
}

impl CameraError {
    /// True for the discoverable `set_parameter` failures.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            CameraError::UnknownParameter(_)
                | CameraError::UnsupportedParameter { .. }
                | CameraError::InvalidValue { .. }
        )
    }
}
