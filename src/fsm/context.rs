//! Shared mutable context threaded through every FSM handler.
//!
//! State handlers are pure: they read flags the service set from I/O
//! results and write bookkeeping back.  All actual I/O (serial, camera,
//! interpreter, actuators) happens in the service around the tick.

use heapless::String;

use crate::config::SystemConfig;
use crate::report::{CycleOutcome, REPORT_LINE_CAPACITY, SessionReport};

/// The blackboard shared by the session state handlers.
pub struct FsmContext {
    // -- Configuration --
    pub config: SystemConfig,

    // -- Inputs (written by the service) --
    /// A trigger was consumed during this `WaitTrigger` tick.
    pub trigger_received: bool,
    /// The formatted report line went out (or was given up on).
    pub report_sent: bool,

    // -- Session bookkeeping --
    /// Outcomes recorded so far; the next cycle index is `report.len()`.
    pub report: SessionReport,
    /// Serial line frozen by `Aggregate`, consumed by `Report`.
    pub line: Option<String<REPORT_LINE_CAPACITY>>,
    /// The failure bound cut this session short.
    pub aborted: bool,
    /// A session just ended; triggers queued during it must be dropped.
    pub discard_requested: bool,
    /// Completed sessions since boot.
    pub sessions: u32,
}

impl FsmContext {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            config,
            trigger_received: false,
            report_sent: false,
            report: SessionReport::new(),
            line: None,
            aborted: false,
            discard_requested: false,
            sessions: 0,
        }
    }

    /// Index of the next cycle to run.
    pub fn cycle_index(&self) -> usize {
        self.report.len()
    }

    pub fn record(&mut self, outcome: CycleOutcome) {
        self.report.record(outcome);
    }

    /// All N slots are filled.
    pub fn session_complete(&self) -> bool {
        self.report.len() >= self.config.samples()
    }

    /// The configured failure bound has been reached.  A bound of 0
    /// never trips.
    pub fn failure_bound_hit(&self) -> bool {
        let bound = self.config.max_failures_per_session as usize;
        bound > 0 && self.report.failures() >= bound
    }
}
