//! System configuration parameters
//!
//! All tunable parameters for the SignCam controller: decision thresholds,
//! actuation timing, servo calibration and session shape.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Largest number of samples a single session may request.
pub const MAX_SAMPLES_PER_SESSION: usize = 8;

/// How a score vector is turned into a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionMode {
    /// Single confidence value split at two cut points.
    Binary,
    /// Argmax over every class with a detection floor.
    MultiCategory,
}

/// What starts a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerMode {
    /// Wait for any non-empty message on the serial link.
    Command,
    /// Free-run: start the next session as soon as the last one reported.
    Continuous,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Policy selection ---
    pub decision_mode: DecisionMode,
    pub trigger_mode: TriggerMode,

    // --- Decision thresholds ---
    /// Binary mode: confidence strictly above this is class A.
    pub high_threshold: f32,
    /// Binary mode: confidence strictly below this is class B.
    pub low_threshold: f32,
    /// Multi-category mode: best score must be strictly above this.
    pub detection_threshold: f32,

    // --- Actuation timing ---
    /// Flash on-time before each capture (milliseconds).
    pub pre_capture_flash_ms: u32,
    /// Indicator LED pulse width (milliseconds).
    pub indicator_pulse_ms: u32,
    /// Hold time after commanding the servo (milliseconds).
    pub actuation_settle_delay_ms: u32,

    // --- Servo ---
    pub servo_min_pulse_us: u16,
    pub servo_max_pulse_us: u16,
    /// Servo control task poll period (milliseconds).
    pub servo_poll_interval_ms: u32,
    pub class_a_servo_deg: u8,
    pub class_b_servo_deg: u8,
    pub detected_servo_deg: u8,

    // --- Session ---
    pub sample_count_per_session: u8,
    /// Failed samples after which the rest of the session is skipped.
    /// 0 = never abort.
    pub max_failures_per_session: u8,
    /// Pause between free-running sessions (milliseconds).
    pub free_run_pause_ms: u32,

    // --- Serial link ---
    pub serial_baud: u32,
    /// Bounded wait for a trigger (milliseconds).
    pub serial_timeout_ms: u32,
    /// Read the UART from a dedicated task instead of the session loop.
    pub serial_reader_task: bool,

    // --- Diagnostics ---
    /// Board power draw while inferring, for the energy estimate (watts).
    pub inference_power_w: f32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            decision_mode: DecisionMode::MultiCategory,
            trigger_mode: TriggerMode::Command,

            high_threshold: 0.85,
            low_threshold: 0.4,
            detection_threshold: 0.5,

            pre_capture_flash_ms: 10,
            indicator_pulse_ms: 100,
            actuation_settle_delay_ms: 5000,

            servo_min_pulse_us: 500,
            servo_max_pulse_us: 2400,
            servo_poll_interval_ms: 20,
            class_a_servo_deg: 90,
            class_b_servo_deg: 0,
            detected_servo_deg: 90,

            sample_count_per_session: 4,
            max_failures_per_session: 0,
            free_run_pause_ms: 2000,

            serial_baud: 115_200,
            serial_timeout_ms: 100,
            serial_reader_task: false,

            inference_power_w: 0.12,
        }
    }
}

impl SystemConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for t in [self.high_threshold, self.low_threshold, self.detection_threshold] {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::ValidationFailed("thresholds must be 0.0–1.0"));
            }
        }
        if self.low_threshold >= self.high_threshold {
            return Err(ConfigError::ValidationFailed(
                "low_threshold must be < high_threshold",
            ));
        }
        if self.servo_min_pulse_us >= self.servo_max_pulse_us {
            return Err(ConfigError::ValidationFailed(
                "servo_min_pulse_us must be < servo_max_pulse_us",
            ));
        }
        if self.servo_max_pulse_us > 20_000 {
            return Err(ConfigError::ValidationFailed(
                "servo_max_pulse_us must fit the 20 ms frame",
            ));
        }
        if [self.class_a_servo_deg, self.class_b_servo_deg, self.detected_servo_deg]
            .iter()
            .any(|&deg| deg > 180)
        {
            return Err(ConfigError::ValidationFailed("servo angles must be 0–180"));
        }
        if self.sample_count_per_session == 0
            || self.sample_count_per_session as usize > MAX_SAMPLES_PER_SESSION
        {
            return Err(ConfigError::ValidationFailed(
                "sample_count_per_session must be 1–8",
            ));
        }
        if !(1..=1000).contains(&self.pre_capture_flash_ms) {
            return Err(ConfigError::ValidationFailed(
                "pre_capture_flash_ms must be 1–1000",
            ));
        }
        if !(1..=2000).contains(&self.indicator_pulse_ms) {
            return Err(ConfigError::ValidationFailed(
                "indicator_pulse_ms must be 1–2000",
            ));
        }
        if self.actuation_settle_delay_ms > 30_000 {
            return Err(ConfigError::ValidationFailed(
                "actuation_settle_delay_ms must be ≤ 30000",
            ));
        }
        if self.free_run_pause_ms > 60_000 {
            return Err(ConfigError::ValidationFailed(
                "free_run_pause_ms must be ≤ 60000",
            ));
        }
        if !(5..=1000).contains(&self.servo_poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "servo_poll_interval_ms must be 5–1000",
            ));
        }
        if !(10..=10_000).contains(&self.serial_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "serial_timeout_ms must be 10–10000",
            ));
        }
        if self.serial_baud == 0 {
            return Err(ConfigError::ValidationFailed("serial_baud must be > 0"));
        }
        if self.inference_power_w < 0.0 {
            return Err(ConfigError::ValidationFailed("inference_power_w must be >= 0"));
        }
        Ok(())
    }

    /// Samples per session as a `usize` index bound.
    pub fn samples(&self) -> usize {
        self.sample_count_per_session as usize
    }

    /// Longest a single session-loop tick may block (milliseconds).
    ///
    /// A tick runs at most one of: a full cycle (flash, up to four
    /// indicator pulses, settle), the free-run pause, or a trigger wait.
    pub fn longest_block_ms(&self) -> u32 {
        let cycle = self
            .pre_capture_flash_ms
            .saturating_add(self.indicator_pulse_ms.saturating_mul(4))
            .saturating_add(self.actuation_settle_delay_ms);
        let wait = match self.trigger_mode {
            TriggerMode::Command => self.serial_timeout_ms,
            TriggerMode::Continuous => self.free_run_pause_ms,
        };
        cycle.max(wait)
    }

    /// Settings consumed once at boot (servo task, UART driver, reader
    /// task) are identical in `self` and `other`.
    pub fn boot_settings_match(&self, other: &Self) -> bool {
        self.servo_min_pulse_us == other.servo_min_pulse_us
            && self.servo_max_pulse_us == other.servo_max_pulse_us
            && self.servo_poll_interval_ms == other.servo_poll_interval_ms
            && self.serial_baud == other.serial_baud
            && self.serial_reader_task == other.serial_reader_task
    }
}
