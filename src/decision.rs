//! Decision policy: score vector in, discrete outcome out.
//!
//! Pure threshold rules, no state.  The policy is chosen once at startup
//! from [`SystemConfig::decision_mode`](crate::config::SystemConfig) and
//! both variants share one [`Decision`] type, so the sequencer and report
//! never care which model is loaded.
//!
//! | Mode          | Rule                                           |
//! |---------------|------------------------------------------------|
//! | Binary        | `c > high` → A, `c < low` → B, else Uncertain   |
//! | MultiCategory | first-seen argmax, `max > floor` else none      |

use crate::config::{DecisionMode, SystemConfig};
use crate::inference::{ScoreVector, category_label};

/// Outcome of a binary classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryClass {
    ClassA,
    ClassB,
    Uncertain,
}

/// Exactly one per successful inference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Binary { class: BinaryClass, confidence: f32 },
    Category { index: usize, confidence: f32 },
    NoDetection,
}

impl Decision {
    /// Code transmitted for this decision in the serial report.
    pub fn report_code(&self) -> i8 {
        match *self {
            Decision::Binary { class, .. } => match class {
                BinaryClass::ClassB => 0,
                BinaryClass::ClassA => 1,
                BinaryClass::Uncertain => 2,
            },
            Decision::Category { index, .. } => index as i8,
            Decision::NoDetection => -2,
        }
    }

    /// Short human-readable name used in the session summary.
    pub fn label(&self) -> &'static str {
        match *self {
            Decision::Binary { class, .. } => match class {
                BinaryClass::ClassA => "A",
                BinaryClass::ClassB => "B",
                BinaryClass::Uncertain => "uncertain",
            },
            Decision::Category { index, .. } => category_label(index),
            Decision::NoDetection => "none",
        }
    }
}

/// Threshold policy.  `Copy` so the session loop can hold it by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecisionPolicy {
    Binary { high: f32, low: f32 },
    MultiCategory { threshold: f32 },
}

impl DecisionPolicy {
    pub fn from_config(config: &SystemConfig) -> Self {
        match config.decision_mode {
            DecisionMode::Binary => Self::Binary {
                high: config.high_threshold,
                low: config.low_threshold,
            },
            DecisionMode::MultiCategory => Self::MultiCategory {
                threshold: config.detection_threshold,
            },
        }
    }

    pub fn decide(&self, scores: &ScoreVector) -> Decision {
        match *self {
            Self::Binary { high, low } => {
                let c = scores.confidence();
                let class = if c > high {
                    BinaryClass::ClassA
                } else if c < low {
                    BinaryClass::ClassB
                } else {
                    BinaryClass::Uncertain
                };
                Decision::Binary {
                    class,
                    confidence: c,
                }
            }
            Self::MultiCategory { threshold } => {
                let (index, max) = argmax(scores.as_slice());
                if max > threshold {
                    Decision::Category {
                        index,
                        confidence: max,
                    }
                } else {
                    Decision::NoDetection
                }
            }
        }
    }
}

/// Left-to-right scan, strict `>`: the first maximum wins.  Non-finite
/// scores never win; an all-NaN vector yields `-inf`, i.e. no detection.
fn argmax(scores: &[f32]) -> (usize, f32) {
    let mut best = 0;
    let mut max = f32::NEG_INFINITY;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_finite() && s > max {
            max = s;
            best = i;
        }
    }
    (best, max)
}
