//! Unified error types for the SignCam firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the session
//! loop can decide per variant whether a failure is fatal, recoverable
//! within a cycle, or just the idle condition.  All variants are `Copy`
//! so they can be recorded in a session report without allocation.

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The camera could not deliver a frame into the input buffer.
    CaptureFailure,
    /// The interpreter returned an error from `Invoke()`.
    InferenceFailure,
    /// The output tensor is neither float32, uint8 nor int8.
    /// Carries the engine's raw type code.
    UnsupportedOutputType(u8),
    /// No serial data arrived before the read timeout.  Not a fault.
    SerialTimeout,
    /// The model flatbuffer schema does not match the interpreter.
    ModelVersionMismatch { model: u32, supported: u32 },
    /// The tensor arena (or another startup buffer) could not be allocated.
    AllocationFailure { bytes: usize },
    /// The UART driver reported an error.
    Serial(&'static str),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl Error {
    /// Startup errors after which the session loop must not be entered.
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::ModelVersionMismatch { .. } | Self::AllocationFailure { .. } | Self::Init(_)
        )
    }

    /// Errors that mark the current sample as failed but let the session
    /// continue with the next one.
    pub const fn is_cycle_local(self) -> bool {
        matches!(
            self,
            Self::CaptureFailure | Self::InferenceFailure | Self::UnsupportedOutputType(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CaptureFailure => write!(f, "image capture failed"),
            Self::InferenceFailure => write!(f, "invoke failed"),
            Self::UnsupportedOutputType(code) => {
                write!(f, "unsupported output tensor type (code {code})")
            }
            Self::SerialTimeout => write!(f, "serial read timed out"),
            Self::ModelVersionMismatch { model, supported } => write!(
                f,
                "model schema version {model} not equal to supported version {supported}"
            ),
            Self::AllocationFailure { bytes } => {
                write!(f, "couldn't allocate memory of {bytes} bytes")
            }
            Self::Serial(msg) => write!(f, "serial: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::Corrupted => Self::Config("stored config corrupted"),
            ConfigError::IoError => Self::Config("storage I/O error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
