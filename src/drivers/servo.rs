//! Hobby servo driver (50 Hz PWM, LEDC on target).
//!
//! The session loop never talks to the PWM peripheral.  It stores an
//! absolute angle into a [`ServoTarget`]; a low-priority task polls the
//! target and rewrites the duty cycle only when the angle changed.
//!
//! ```text
//!  session loop ──store──▶ AtomicU8 ◀──load── servo task ──▶ LEDC
//! ```
//!
//! ## Shared state
//!
//! The target is the only mutable value shared between tasks.  It is a
//! single byte with exactly one writer and one reader, so `Relaxed`
//! ordering is enough: the reader only needs to see *some* recent angle,
//! and the next poll picks up anything it missed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use embedded_hal::pwm::SetDutyCycle;
use log::{debug, info, warn};

use crate::drivers::task_pin::{self, Core};

/// Full mechanical travel.
pub const MAX_ANGLE_DEG: u8 = 180;

/// One PWM frame at 50 Hz.
pub const FRAME_US: u32 = 20_000;

/// Absolute servo angle shared between the session loop and the servo task.
#[derive(Debug, Clone, Default)]
pub struct ServoTarget(Arc<AtomicU8>);

impl ServoTarget {
    pub fn new(initial_deg: u8) -> Self {
        Self(Arc::new(AtomicU8::new(initial_deg.min(MAX_ANGLE_DEG))))
    }

    /// Store a new target.  Angles past 180° are clamped.
    pub fn set(&self, degrees: u8) {
        self.0.store(degrees.min(MAX_ANGLE_DEG), Ordering::Relaxed);
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Pulse calibration: pulse width at 0° and at 180°.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseRange {
    pub min_us: u16,
    pub max_us: u16,
}

impl PulseRange {
    /// Linear interpolation between `min_us` and `max_us`.
    pub fn pulse_width_us(&self, degrees: u8) -> u32 {
        let deg = u32::from(degrees.min(MAX_ANGLE_DEG));
        let min = u32::from(self.min_us);
        let max = u32::from(self.max_us);
        min + (max - min) * deg / u32::from(MAX_ANGLE_DEG)
    }
}

/// Polling side of the servo: owns the PWM channel.
pub struct ServoDriver<P: SetDutyCycle> {
    pwm: P,
    target: ServoTarget,
    range: PulseRange,
    applied: Option<u8>,
    last_pulse_us: u32,
}

impl<P: SetDutyCycle> ServoDriver<P> {
    pub fn new(pwm: P, target: ServoTarget, range: PulseRange) -> Self {
        Self {
            pwm,
            target,
            range,
            applied: None,
            last_pulse_us: 0,
        }
    }

    /// Apply the current target if it changed since the last poll.
    pub fn poll(&mut self) {
        let angle = self.target.get();
        if self.applied == Some(angle) {
            return;
        }
        let pulse_us = self.range.pulse_width_us(angle);
        let max_duty = u32::from(self.pwm.max_duty_cycle());
        let duty = (pulse_us * max_duty / FRAME_US) as u16;
        match self.pwm.set_duty_cycle(duty) {
            Ok(()) => {
                debug!("SERVO | {}° -> {}us (duty {}/{})", angle, pulse_us, duty, max_duty);
                self.applied = Some(angle);
                self.last_pulse_us = pulse_us;
            }
            Err(e) => warn!("SERVO | duty write failed: {:?}", e),
        }
    }

    /// Pulse width written on the last successful poll, in µs.
    pub fn last_pulse_us(&self) -> u32 {
        self.last_pulse_us
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }
}

/// Spawn the servo control task on the APP core at low priority.
pub fn spawn_servo_task<P>(
    mut driver: ServoDriver<P>,
    poll_interval_ms: u32,
) -> crate::error::Result<std::thread::JoinHandle<()>>
where
    P: SetDutyCycle + Send + 'static,
{
    info!("Servo task: polling every {}ms", poll_interval_ms);
    task_pin::spawn_on_core(Core::App, 2, 3, "servo\0", move || {
        let period = std::time::Duration::from_millis(u64::from(poll_interval_ms));
        loop {
            driver.poll();
            std::thread::sleep(period);
        }
    })
}
