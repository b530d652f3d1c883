//! SignCam Firmware: Main Entry Point
//!
//! Hexagonal architecture around a trigger-driven session loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    EspCamera   TflmEngine   NvsAdapter        │
//! │  (Actuator+Clock)   (Camera)    (Inference)  (Config)          │
//! │  UartSerial ─▶ SerialLink | ChannelLink      LogEventSink      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · DecisionPolicy · ActuationSequencer · Report    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Servo task (APP core) · Serial reader task (PRO core, opt.)   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution, config::TimerConfig};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;
use log::{error, info, warn};

use signcam::adapters::camera::EspCamera;
use signcam::adapters::hardware::HardwareAdapter;
use signcam::adapters::log_sink::LogEventSink;
use signcam::adapters::nvs::NvsAdapter;
use signcam::adapters::serial::UartSerial;
use signcam::adapters::tflm::TflmEngine;
use signcam::app::ports::{ActuatorPort, CameraPort, ClockPort, ConfigPort, InferenceEngine, TriggerLink};
use signcam::app::service::AppService;
use signcam::config::SystemConfig;
use signcam::diagnostics::MemoryReport;
use signcam::drivers::servo::{PulseRange, ServoDriver, ServoTarget, spawn_servo_task};
use signcam::drivers::watchdog::Watchdog;
use signcam::inference::session::InferenceSession;
use signcam::inference::{MODEL_INPUT, TENSOR_ARENA_BYTES};
use signcam::link::SerialLink;
use signcam::link::channel::{ChannelLink, TRIGGER_CHANNEL, spawn_reader};
use signcam::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SignCam v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Memory report (PSRAM is mandatory) ─────────────────
    let memory = MemoryReport::collect();
    memory.log();
    if let Err(e) = memory.require_psram(TENSOR_ARENA_BYTES) {
        halt(e);
    }

    // ── 3. Load config from NVS (or defaults) ─────────────────
    let config = match NvsAdapter::new().map(|nvs| nvs.load()) {
        Ok(Ok(cfg)) => cfg,
        Ok(Err(e)) | Err(e) => {
            warn!("NVS config unavailable ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 4. Peripherals ────────────────────────────────────────
    let p = Peripherals::take()?;

    let flash = PinDriver::output(p.pins.gpio4)?;
    let indicator = PinDriver::output(p.pins.gpio33)?;
    info!(
        "GPIO: flash={} indicator={} servo={}",
        pins::FLASH_GPIO,
        pins::INDICATOR_GPIO,
        pins::SERVO_PWM_GPIO
    );

    // 14 bits gives ~1.2 µs of pulse-width resolution at 50 Hz.
    let servo_timer = LedcTimerDriver::new(
        p.ledc.timer0,
        &TimerConfig::default()
            .frequency(Hertz(pins::SERVO_PWM_FREQ_HZ))
            .resolution(Resolution::Bits14),
    )?;
    let servo_pwm = LedcDriver::new(p.ledc.channel0, servo_timer, p.pins.gpio15)?;
    let servo_target = ServoTarget::new(0);
    let servo = ServoDriver::new(
        servo_pwm,
        servo_target.clone(),
        PulseRange {
            min_us: config.servo_min_pulse_us,
            max_us: config.servo_max_pulse_us,
        },
    );
    spawn_servo_task(servo, config.servo_poll_interval_ms)?;

    let uart = UartDriver::new(
        p.uart1,
        p.pins.gpio13,
        p.pins.gpio12,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default()
            .baudrate(Hertz(config.serial_baud))
            .rx_fifo_size(pins::UART_RX_BUF_SIZE),
    )?;
    let serial = UartSerial::new(uart);
    info!(
        "UART1: {} baud, tx={} rx={}",
        config.serial_baud,
        pins::UART_TX_GPIO,
        pins::UART_RX_GPIO
    );

    // ── 5. Camera + interpreter (fatal on failure) ────────────
    let camera = EspCamera::init(MODEL_INPUT).unwrap_or_else(|e| halt(e));
    let session = InferenceSession::new(
        TflmEngine::new(),
        MODEL_INPUT,
        TENSOR_ARENA_BYTES,
        config.inference_power_w,
    )
    .unwrap_or_else(|e| halt(e));

    let mut hw = HardwareAdapter::new(flash, indicator, FreeRtos, camera, servo_target);
    let mut sink = LogEventSink::new();
    let watchdog = Watchdog::new(Watchdog::timeout_for(&config));

    // ── 6. App service ────────────────────────────────────────
    let mut app = AppService::new(config.clone(), session).unwrap_or_else(|e| halt(e));
    app.start(&mut sink);

    info!("System ready. Entering session loop.");

    // ── 7. Session loop ───────────────────────────────────────
    if config.serial_reader_task {
        spawn_reader(serial.clone(), &TRIGGER_CHANNEL, config.serial_timeout_ms)?;
        let mut link = ChannelLink::new(serial, &TRIGGER_CHANNEL);
        run(&mut app, &mut hw, &mut link, &mut sink, &watchdog)
    } else {
        let mut link = SerialLink::new(serial);
        run(&mut app, &mut hw, &mut link, &mut sink, &watchdog)
    }
}

fn run<E: InferenceEngine>(
    app: &mut AppService<E>,
    hw: &mut (impl CameraPort + ActuatorPort + ClockPort),
    link: &mut impl TriggerLink,
    sink: &mut LogEventSink,
    watchdog: &Watchdog,
) -> ! {
    loop {
        app.tick(hw, link, sink);
        watchdog.feed();
    }
}

/// Startup failure: log once, then park the main task.
fn halt(e: signcam::error::Error) -> ! {
    error!("Fatal: {}, halting", e);
    loop {
        FreeRtos::delay_ms(1000);
    }
}
