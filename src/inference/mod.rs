//! Inference engine adapter: output tensors, dequantisation, score vectors.
//!
//! The engine itself (model loading, arena, operators) sits behind the
//! [`InferenceEngine`](crate::app::ports::InferenceEngine) port.  This module
//! owns the part the firmware must get exactly right: turning whatever the
//! output tensor holds into a normalised [`ScoreVector`].
//!
//! ```text
//!  float32 ──────────────────────────────┐
//!  uint8  ── (q - zero_point) * scale ───┼──▶ ScoreVector (K ≤ 8)
//!  int8   ── (q - zero_point) * scale ───┘
//!  other  ──▶ Error::UnsupportedOutputType
//! ```

pub mod session;

use heapless::Vec;

use crate::error::{Error, Result};

/// Largest class count any supported model produces.
pub const MAX_CLASSES: usize = 8;

/// Labels of the six-class hand-sign model, in output order.
pub const CATEGORY_LABELS: [&str; 6] = ["C", "L", "Puno", "Cruzados", "Rock", "Palma"];

/// Model input geometry (grayscale 96×96).
pub const MODEL_INPUT: FrameGeometry = FrameGeometry {
    width: 96,
    height: 96,
    channels: 1,
};

/// Tensor arena size: 176 KiB plus the ESP32-S3 scratch buffer.
pub const TENSOR_ARENA_BYTES: usize = 176 * 1024 + 40 * 1024;

/// Width × height × channels of one captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl FrameGeometry {
    /// Element count of a buffer holding one frame.
    pub const fn len(&self) -> usize {
        self.width * self.height * self.channels
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Output tensor view
// ---------------------------------------------------------------------------

/// Affine quantisation parameters of an output tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantParams {
    pub zero_point: i32,
    pub scale: f32,
}

/// Borrowed view of the interpreter's output tensor.
#[derive(Debug, Clone, Copy)]
pub enum OutputTensor<'a> {
    Float32(&'a [f32]),
    UInt8 { data: &'a [u8], params: QuantParams },
    Int8 { data: &'a [i8], params: QuantParams },
    /// Any other element type; carries the engine's type code.
    Unsupported(u8),
}

impl OutputTensor<'_> {
    /// Dequantise into a score vector.
    pub fn to_scores(&self) -> Result<ScoreVector> {
        match *self {
            OutputTensor::Float32(data) => ScoreVector::from_slice(data),
            OutputTensor::UInt8 { data, params } => {
                ScoreVector::from_iter(data.iter().map(|&q| dequantize(i32::from(q), params)))
            }
            OutputTensor::Int8 { data, params } => {
                ScoreVector::from_iter(data.iter().map(|&q| dequantize(i32::from(q), params)))
            }
            OutputTensor::Unsupported(code) => Err(Error::UnsupportedOutputType(code)),
        }
    }
}

/// `value = (quantized - zero_point) * scale`
pub fn dequantize(quantized: i32, params: QuantParams) -> f32 {
    (quantized - params.zero_point) as f32 * params.scale
}

// ---------------------------------------------------------------------------
// ScoreVector
// ---------------------------------------------------------------------------

/// Fixed-length class scores from one inference call.  Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector {
    scores: Vec<f32, MAX_CLASSES>,
}

impl ScoreVector {
    /// Build from a slice.  Empty or oversized outputs are inference errors:
    /// the model is fixed, so a different shape means the invoke went wrong.
    pub fn from_slice(scores: &[f32]) -> Result<Self> {
        if scores.is_empty() {
            return Err(Error::InferenceFailure);
        }
        let scores = Vec::from_slice(scores).map_err(|_| Error::InferenceFailure)?;
        Ok(Self { scores })
    }

    fn from_iter(iter: impl Iterator<Item = f32>) -> Result<Self> {
        let mut scores = Vec::new();
        for s in iter {
            scores.push(s).map_err(|_| Error::InferenceFailure)?;
        }
        if scores.is_empty() {
            return Err(Error::InferenceFailure);
        }
        Ok(Self { scores })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// First score, the confidence of a single-output binary model.
    pub fn confidence(&self) -> f32 {
        self.scores[0]
    }
}

/// Human label for a category index; falls back to `"?"` for indices past
/// the six-class table.
pub fn category_label(index: usize) -> &'static str {
    CATEGORY_LABELS.get(index).copied().unwrap_or("?")
}
