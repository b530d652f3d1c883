//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the flash and indicator outputs, the camera, the delay provider
//! and the writer side of the servo target, and exposes them through
//! [`ActuatorPort`], [`CameraPort`] and [`ClockPort`].  Generic over the
//! `embedded-hal` traits so the same adapter runs against esp-idf-hal
//! drivers on target and plain fakes on the host.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::warn;

use crate::adapters::time::EspClock;
use crate::app::ports::{ActuatorPort, CameraPort, ClockPort, OutputLine};
use crate::drivers::servo::ServoTarget;
use crate::error::Result;
use crate::inference::FrameGeometry;

/// Concrete adapter combining every output the session loop drives.
pub struct HardwareAdapter<F, L, D, C> {
    flash: F,
    indicator: L,
    delay: D,
    camera: C,
    servo: ServoTarget,
    clock: EspClock,
}

impl<F, L, D, C> HardwareAdapter<F, L, D, C>
where
    F: OutputPin,
    L: OutputPin,
    D: DelayNs,
    C: CameraPort,
{
    pub fn new(flash: F, indicator: L, delay: D, camera: C, servo: ServoTarget) -> Self {
        let mut hw = Self {
            flash,
            indicator,
            delay,
            camera,
            servo,
            clock: EspClock::new(),
        };
        hw.set_digital(OutputLine::Flash, false);
        hw.set_digital(OutputLine::Indicator, false);
        hw
    }

    pub fn servo_target(&self) -> &ServoTarget {
        &self.servo
    }
}

// ── ActuatorPort ──────────────────────────────────────────────

impl<F, L, D, C> ActuatorPort for HardwareAdapter<F, L, D, C>
where
    F: OutputPin,
    L: OutputPin,
    D: DelayNs,
    C: CameraPort,
{
    fn set_digital(&mut self, line: OutputLine, high: bool) {
        let ok = match line {
            OutputLine::Flash => drive(&mut self.flash, high),
            OutputLine::Indicator => drive(&mut self.indicator, high),
        };
        if !ok {
            warn!("GPIO | {:?} write failed", line);
        }
    }

    fn set_servo_angle(&mut self, degrees: u8) {
        self.servo.set(degrees);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

fn drive(pin: &mut impl OutputPin, high: bool) -> bool {
    if high { pin.set_high().is_ok() } else { pin.set_low().is_ok() }
}

// ── CameraPort / ClockPort ────────────────────────────────────

impl<F, L, D, C: CameraPort> CameraPort for HardwareAdapter<F, L, D, C> {
    fn capture(&mut self, geometry: FrameGeometry, dest: &mut [f32]) -> Result<()> {
        self.camera.capture(geometry, dest)
    }
}

impl<F, L, D, C> ClockPort for HardwareAdapter<F, L, D, C> {
    fn uptime_us(&self) -> u64 {
        self.clock.uptime_us()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(&'static str, bool)>>>;

    struct Pin(&'static str, Log);

    impl embedded_hal::digital::ErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> core::result::Result<(), Infallible> {
            self.1.borrow_mut().push((self.0, false));
            Ok(())
        }
        fn set_high(&mut self) -> core::result::Result<(), Infallible> {
            self.1.borrow_mut().push((self.0, true));
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingDelay(u64);

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0 += u64::from(ns);
        }
    }

    struct NoCamera;

    impl CameraPort for NoCamera {
        fn capture(&mut self, _geometry: FrameGeometry, dest: &mut [f32]) -> Result<()> {
            dest.fill(0.5);
            Ok(())
        }
    }

    fn adapter(log: &Log) -> HardwareAdapter<Pin, Pin, CountingDelay, NoCamera> {
        HardwareAdapter::new(
            Pin("flash", log.clone()),
            Pin("ind", log.clone()),
            CountingDelay::default(),
            NoCamera,
            ServoTarget::new(0),
        )
    }

    #[test]
    fn outputs_start_low() {
        let log = Log::default();
        let _hw = adapter(&log);
        assert_eq!(*log.borrow(), vec![("flash", false), ("ind", false)]);
    }

    #[test]
    fn lines_map_to_their_pins() {
        let log = Log::default();
        let mut hw = adapter(&log);
        log.borrow_mut().clear();
        hw.set_digital(OutputLine::Indicator, true);
        hw.set_digital(OutputLine::Flash, true);
        assert_eq!(*log.borrow(), vec![("ind", true), ("flash", true)]);
    }

    #[test]
    fn servo_writes_only_the_shared_target() {
        let log = Log::default();
        let mut hw = adapter(&log);
        hw.set_servo_angle(90);
        assert_eq!(hw.servo_target().get(), 90);
    }

    #[test]
    fn delay_uses_provider() {
        let log = Log::default();
        let mut hw = adapter(&log);
        hw.delay_ms(5);
        assert_eq!(hw.delay.0, 5_000_000);
    }
}
