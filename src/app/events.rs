//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  The log sink renders
//! them as tagged console lines.

use heapless::String;

use crate::decision::Decision;
use crate::error::Error;
use crate::fsm::StateId;
use crate::report::REPORT_LINE_CAPACITY;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries the initial state).
    Started(StateId),

    /// The FSM moved between states.
    StateChanged { from: StateId, to: StateId },

    /// A serial request started a session.  `len` is 0 for a `Trigger`
    /// command.
    TriggerReceived { len: usize },

    /// One sample produced a decision and ran its actuation.
    CycleCompleted {
        index: usize,
        decision: Decision,
        capture_us: u64,
        inference_us: u64,
    },

    /// One sample failed; its slot carries the sentinel.
    CycleFailed { index: usize, error: Error },

    /// The report line went out on the serial link.
    ReportSent(String<REPORT_LINE_CAPACITY>),

    /// The report could not be written; the session is discarded anyway.
    ReportFailed(Error),
}
