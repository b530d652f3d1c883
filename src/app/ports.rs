//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (camera, inference engine, actuators, serial link, event
//! sinks, storage) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics, so
//! the session loop never touches hardware directly.

use crate::config::SystemConfig;
use crate::error::Result;
use crate::inference::{FrameGeometry, OutputTensor};

// ───────────────────────────────────────────────────────────────
// Camera port (driven adapter: sensor → domain)
// ───────────────────────────────────────────────────────────────

/// Capture subsystem: fills `dest` with one normalised frame.
pub trait CameraPort {
    /// Capture one frame of `geometry` into `dest`.
    ///
    /// `dest.len()` is `geometry.len()`; implementations must not write
    /// past it.  Returns [`Error::CaptureFailure`](crate::error::Error)
    /// when no frame could be delivered.
    fn capture(&mut self, geometry: FrameGeometry, dest: &mut [f32]) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Inference engine port
// ───────────────────────────────────────────────────────────────

/// One interpreter instance with its input and output tensors.
///
/// The engine owns its arena; [`InferenceSession`](crate::inference::session::InferenceSession)
/// owns the engine.
pub trait InferenceEngine {
    /// Schema version baked into the model flatbuffer.
    fn model_version(&self) -> u32;

    /// Schema version the interpreter was built against.
    fn supported_version(&self) -> u32;

    /// Allocate the tensor arena and plan tensors.
    fn allocate(&mut self, arena_bytes: usize) -> Result<()>;

    /// Input tensor, as `f32` elements.
    fn input_mut(&mut self) -> &mut [f32];

    /// Run the model on the current input tensor.
    fn invoke(&mut self) -> Result<()>;

    /// View of output tensor 0 after a successful invoke.
    fn output(&self) -> OutputTensor<'_>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Logical digital output lines.  Mapped to GPIOs by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLine {
    /// Camera illumination.
    Flash,
    /// Status LED pulsed on a decision.
    Indicator,
}

/// Write-side port: the actuation sequencer drives hardware through this.
pub trait ActuatorPort {
    /// Drive a digital output high (`true`) or low.
    fn set_digital(&mut self, line: OutputLine, high: bool);

    /// Store a new absolute servo target.  Never blocks on the mechanism.
    fn set_servo_angle(&mut self, degrees: u8);

    /// Cooperative delay: yields to other tasks for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source for latency measurement.
pub trait ClockPort {
    /// Microseconds since boot.
    fn uptime_us(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Serial port (byte channel)
// ───────────────────────────────────────────────────────────────

/// Byte-oriented serial channel with blocking-with-timeout reads.
pub trait SerialPort {
    /// Read up to `buf.len()` bytes, waiting at most `timeout_ms`.
    /// Returns `Ok(0)` when nothing arrived in time.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize>;

    /// Write `data`, returning the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Drop everything buffered on the receive side.
    fn clear_input(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Trigger link (serial command/response, as the session loop sees it)
// ───────────────────────────────────────────────────────────────

/// A session trigger: some non-empty message arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    /// Payload length of the triggering request.
    pub len: usize,
}

/// Source of session triggers and sink for session reports.
pub trait TriggerLink {
    /// Wait up to `timeout_ms` for a trigger.
    /// Returns [`Error::SerialTimeout`](crate::error::Error) when idle.
    fn wait_trigger(&mut self, timeout_ms: u32) -> Result<Trigger>;

    /// Drop any trigger that arrived while a session was running.
    fn discard_pending(&mut self);

    /// Transmit one formatted report line.
    fn send_report(&mut self, line: &str) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> core::result::Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> core::result::Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
