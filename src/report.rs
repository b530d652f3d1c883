//! Session report: N cycle outcomes, formatted once, sent once.
//!
//! Serial line is `c0,c1,...,cN-1\n` where each code comes from
//! [`Decision::report_code`] and failed or skipped samples are `-1`.

use core::fmt::Write as _;

use heapless::{String, Vec};

use crate::config::MAX_SAMPLES_PER_SESSION;
use crate::decision::Decision;
use crate::error::Error;

/// Sentinel code for a sample that produced no decision.
pub const FAILED_CODE: i8 = -1;

/// Worst case: 8 × "-2," plus newline.
pub const REPORT_LINE_CAPACITY: usize = 32;

/// One successful cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleResult {
    pub decision: Decision,
    pub capture_us: u64,
    pub inference_us: u64,
}

/// What happened at one sample slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    Decided(CycleResult),
    Failed(Error),
    /// Not attempted: the session hit its failure bound.
    Skipped,
}

impl CycleOutcome {
    pub fn code(&self) -> i8 {
        match self {
            Self::Decided(r) => r.decision.report_code(),
            Self::Failed(_) | Self::Skipped => FAILED_CODE,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcomes of one session, in sample order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    outcomes: Vec<CycleOutcome, MAX_SAMPLES_PER_SESSION>,
}

impl SessionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the next slot.  Ignored once full.
    pub fn record(&mut self, outcome: CycleOutcome) {
        if self.outcomes.push(outcome).is_err() {
            log::warn!("REPORT | slot overflow, outcome dropped");
        }
    }

    /// Fill remaining slots up to `n` with [`CycleOutcome::Skipped`].
    pub fn pad_to(&mut self, n: usize) {
        while self.outcomes.len() < n.min(MAX_SAMPLES_PER_SESSION) {
            self.record(CycleOutcome::Skipped);
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[CycleOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
    }

    pub fn codes(&self) -> impl Iterator<Item = i8> + '_ {
        self.outcomes.iter().map(CycleOutcome::code)
    }

    /// Wire form: comma-separated codes plus `\n`.
    pub fn format_line(&self) -> String<REPORT_LINE_CAPACITY> {
        let mut line = String::new();
        for (i, code) in self.codes().enumerate() {
            if i > 0 {
                let _ = line.push(',');
            }
            let _ = write!(line, "{code}");
        }
        let _ = line.push('\n');
        line
    }

    /// Human form for the log: `[Puno, none, failed, Rock]`.
    pub fn summary(&self) -> String<128> {
        let mut s = String::new();
        let _ = s.push('[');
        for (i, outcome) in self.outcomes.iter().enumerate() {
            if i > 0 {
                let _ = s.push_str(", ");
            }
            let label = match outcome {
                CycleOutcome::Decided(r) => r.decision.label(),
                CycleOutcome::Failed(_) => "failed",
                CycleOutcome::Skipped => "skipped",
            };
            let _ = s.push_str(label);
        }
        let _ = s.push(']');
        s
    }
}
