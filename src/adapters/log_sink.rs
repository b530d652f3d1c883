//! Log-based event sink adapter.
//!
//! Renders every [`AppEvent`] as one tagged line on the ESP-IDF console.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => info!("START | initial_state={:?}", state),
            AppEvent::StateChanged { from, to } => info!("STATE | {:?} -> {:?}", from, to),
            AppEvent::TriggerReceived { len } => info!("TRIG  | request of {} bytes", len),
            AppEvent::CycleCompleted {
                index,
                decision,
                capture_us,
                inference_us,
            } => info!(
                "CYCLE | #{} {} (code {}) | capture={}us infer={}us",
                index,
                decision.label(),
                decision.report_code(),
                capture_us,
                inference_us
            ),
            AppEvent::CycleFailed { index, error } => warn!("FAIL  | #{} {}", index, error),
            AppEvent::ReportSent(line) => info!("REPORT| {}", line.trim_end()),
            AppEvent::ReportFailed(error) => warn!("REPORT| not sent: {}", error),
        }
    }
}
