//! Mock adapters for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history without touching real GPIO/PWM registers.  The camera and the
//! engine are scripted per cycle; the link is a queue of triggers.

use std::cell::Cell;
use std::collections::VecDeque;

use signcam::app::events::AppEvent;
use signcam::app::ports::{
    ActuatorPort, CameraPort, ClockPort, EventSink, InferenceEngine, OutputLine, Trigger,
    TriggerLink,
};
use signcam::error::{Error, Result};
use signcam::inference::session::InferenceSession;
use signcam::inference::{FrameGeometry, OutputTensor, QuantParams};

pub const GEOMETRY: FrameGeometry = FrameGeometry {
    width: 4,
    height: 4,
    channels: 1,
};

/// Six-class output where "Puno" (index 2) wins.
pub const PUNO_SCORES: [f32; 6] = [0.1, 0.05, 0.9, 0.2, 0.05, 0.1];

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Digital(OutputLine, bool),
    Delay(u32),
    Servo(u8),
    Capture,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<Call>,
    /// Capture indices (0-based, counted across the whole test) that fail.
    pub failing_captures: Vec<usize>,
    captures: usize,
    clock_us: Cell<u64>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            failing_captures: Vec::new(),
            captures: 0,
            clock_us: Cell::new(0),
        }
    }

    pub fn failing_at(indices: &[usize]) -> Self {
        Self {
            failing_captures: indices.to_vec(),
            ..Self::new()
        }
    }

    pub fn captures(&self) -> usize {
        self.captures
    }

    pub fn servo_moves(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Servo(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Delay(ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockHardware {
    fn set_digital(&mut self, line: OutputLine, high: bool) {
        self.calls.push(Call::Digital(line, high));
    }

    fn set_servo_angle(&mut self, degrees: u8) {
        self.calls.push(Call::Servo(degrees));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(Call::Delay(ms));
        self.clock_us.set(self.clock_us.get() + u64::from(ms) * 1000);
    }
}

impl CameraPort for MockHardware {
    fn capture(&mut self, geometry: FrameGeometry, dest: &mut [f32]) -> Result<()> {
        let index = self.captures;
        self.captures += 1;
        self.calls.push(Call::Capture);
        if self.failing_captures.contains(&index) {
            return Err(Error::CaptureFailure);
        }
        dest[..geometry.len()].fill(0.5);
        Ok(())
    }
}

impl ClockPort for MockHardware {
    fn uptime_us(&self) -> u64 {
        let t = self.clock_us.get();
        self.clock_us.set(t + 250);
        t
    }
}

// ── FakeEngine ────────────────────────────────────────────────

/// What the engine's output tensor holds after an invoke.
#[derive(Debug, Clone)]
pub enum Output {
    Float(Vec<f32>),
    UInt8(Vec<u8>, QuantParams),
    Unsupported(u8),
    InvokeFails,
}

pub struct FakeEngine {
    input: Vec<f32>,
    /// Per-invoke outputs; the last one repeats once the script runs out.
    script: VecDeque<Output>,
    current: Output,
    pub invocations: usize,
}

#[allow(dead_code)]
impl FakeEngine {
    pub fn always(output: Output) -> Self {
        Self::scripted(vec![output])
    }

    pub fn scripted(outputs: Vec<Output>) -> Self {
        Self {
            input: Vec::new(),
            script: outputs.into(),
            current: Output::InvokeFails,
            invocations: 0,
        }
    }
}

impl InferenceEngine for FakeEngine {
    fn model_version(&self) -> u32 {
        3
    }

    fn supported_version(&self) -> u32 {
        3
    }

    fn allocate(&mut self, _arena_bytes: usize) -> Result<()> {
        self.input = vec![0.0; GEOMETRY.len()];
        Ok(())
    }

    fn input_mut(&mut self) -> &mut [f32] {
        &mut self.input
    }

    fn invoke(&mut self) -> Result<()> {
        self.invocations += 1;
        self.current = if self.script.len() > 1 {
            self.script.pop_front().unwrap()
        } else {
            self.script.front().cloned().unwrap_or(Output::InvokeFails)
        };
        match self.current {
            Output::InvokeFails => Err(Error::InferenceFailure),
            _ => Ok(()),
        }
    }

    fn output(&self) -> OutputTensor<'_> {
        match &self.current {
            Output::Float(v) => OutputTensor::Float32(v),
            Output::UInt8(v, params) => OutputTensor::UInt8 {
                data: v,
                params: *params,
            },
            Output::Unsupported(code) => OutputTensor::Unsupported(*code),
            Output::InvokeFails => OutputTensor::Unsupported(0),
        }
    }
}

pub fn session(engine: FakeEngine) -> InferenceSession<FakeEngine> {
    InferenceSession::new(engine, GEOMETRY, 1024, 0.12).unwrap()
}

// ── MockLink ──────────────────────────────────────────────────

pub struct MockLink {
    pub pending: VecDeque<Trigger>,
    pub sent: Vec<String>,
    pub discards: usize,
    pub dropped: usize,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            sent: Vec::new(),
            discards: 0,
            dropped: 0,
            fail_writes: false,
        }
    }

    pub fn with_triggers(n: usize) -> Self {
        let mut link = Self::new();
        for _ in 0..n {
            link.push_trigger();
        }
        link
    }

    pub fn push_trigger(&mut self) {
        self.pending.push_back(Trigger { len: 3 });
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerLink for MockLink {
    fn wait_trigger(&mut self, _timeout_ms: u32) -> Result<Trigger> {
        self.pending.pop_front().ok_or(Error::SerialTimeout)
    }

    fn discard_pending(&mut self) {
        self.discards += 1;
        self.dropped += self.pending.len();
        self.pending.clear();
    }

    fn send_report(&mut self, line: &str) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Serial("write stalled"));
        }
        self.sent.push(line.to_owned());
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
