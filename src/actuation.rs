//! Actuation sequencer: decision in, ordered peripheral commands out.
//!
//! Planning is pure and returns a fixed-capacity [`Plan`]; execution walks
//! the plan strictly in order on the calling task, blocking for every
//! [`ActuationCommand::Delay`].  Keeping the two apart lets tests assert
//! the exact sequence without a clock.
//!
//! ```text
//!  ClassA     IND↑ 100 IND↓ SERVO(90) 5000
//!  ClassB     IND↑ 100 IND↓ 100 IND↑ 100 IND↓ SERVO(0) 5000
//!  Category   IND↑ 100 IND↓ SERVO(detected) settle
//!  Uncertain  FLASH↑ 100 FLASH↓
//!  flash      FLASH↑ 10 FLASH↓            (before every capture)
//! ```

use heapless::Vec;
use log::debug;

use crate::app::ports::{ActuatorPort, OutputLine};
use crate::config::SystemConfig;
use crate::decision::{BinaryClass, Decision};

/// Longest sequence any decision produces, with headroom.
pub const MAX_PLAN_LEN: usize = 16;

/// One step of an actuation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuationCommand {
    SetDigitalOutput { line: OutputLine, high: bool },
    Delay(u32),
    SetServoAngle(u8),
}

/// Ordered commands for one decision.
pub type Plan = Vec<ActuationCommand, MAX_PLAN_LEN>;

/// Timing and servo angles, taken from [`SystemConfig`] once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationSequencer {
    flash_ms: u32,
    pulse_ms: u32,
    settle_ms: u32,
    class_a_deg: u8,
    class_b_deg: u8,
    detected_deg: u8,
}

impl ActuationSequencer {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            flash_ms: config.pre_capture_flash_ms,
            pulse_ms: config.indicator_pulse_ms,
            settle_ms: config.actuation_settle_delay_ms,
            class_a_deg: config.class_a_servo_deg,
            class_b_deg: config.class_b_servo_deg,
            detected_deg: config.detected_servo_deg,
        }
    }

    /// Illumination pulse issued before every capture.
    pub fn flash_plan(&self) -> Plan {
        let mut plan = Plan::new();
        self.pulse(&mut plan, OutputLine::Flash, self.flash_ms);
        plan
    }

    /// Sequence for one decision.  `NoDetection` yields an empty plan.
    pub fn plan_for(&self, decision: &Decision) -> Plan {
        let mut plan = Plan::new();
        match *decision {
            Decision::Binary { class, .. } => match class {
                BinaryClass::ClassA => {
                    self.pulse(&mut plan, OutputLine::Indicator, self.pulse_ms);
                    self.servo_and_settle(&mut plan, self.class_a_deg);
                }
                BinaryClass::ClassB => {
                    self.pulse(&mut plan, OutputLine::Indicator, self.pulse_ms);
                    push(&mut plan, ActuationCommand::Delay(self.pulse_ms));
                    self.pulse(&mut plan, OutputLine::Indicator, self.pulse_ms);
                    self.servo_and_settle(&mut plan, self.class_b_deg);
                }
                BinaryClass::Uncertain => {
                    self.pulse(&mut plan, OutputLine::Flash, self.pulse_ms);
                }
            },
            Decision::Category { .. } => {
                self.pulse(&mut plan, OutputLine::Indicator, self.pulse_ms);
                self.servo_and_settle(&mut plan, self.detected_deg);
            }
            Decision::NoDetection => {}
        }
        plan
    }

    fn pulse(&self, plan: &mut Plan, line: OutputLine, ms: u32) {
        push(plan, ActuationCommand::SetDigitalOutput { line, high: true });
        push(plan, ActuationCommand::Delay(ms));
        push(plan, ActuationCommand::SetDigitalOutput { line, high: false });
    }

    fn servo_and_settle(&self, plan: &mut Plan, degrees: u8) {
        push(plan, ActuationCommand::SetServoAngle(degrees));
        push(plan, ActuationCommand::Delay(self.settle_ms));
    }
}

// Every plan above is at most 9 commands.
fn push(plan: &mut Plan, cmd: ActuationCommand) {
    if plan.push(cmd).is_err() {
        debug_assert!(false, "actuation plan overflow");
    }
}

/// Run `plan` in order against the hardware.
pub fn execute(plan: &Plan, hw: &mut impl ActuatorPort) {
    for cmd in plan {
        debug!("ACT | {:?}", cmd);
        match *cmd {
            ActuationCommand::SetDigitalOutput { line, high } => hw.set_digital(line, high),
            ActuationCommand::Delay(ms) => hw.delay_ms(ms),
            ActuationCommand::SetServoAngle(deg) => hw.set_servo_angle(deg),
        }
    }
}
