//! TensorFlow Lite Micro engine adapter.
//!
//! The interpreter, op resolver and PSRAM arena live in the C++
//! `tflm_bridge` component; this adapter exposes them through the
//! [`InferenceEngine`] port.  Element types follow `TfLiteType`.
//!
//! Off target, [`TflmEngine`] is a deterministic stand-in: a float32
//! output whose argmax tracks the mean input brightness, enough to run
//! the whole session loop on the host.

use crate::app::ports::InferenceEngine;
use crate::error::{Error, Result};
use crate::inference::{MAX_CLASSES, OutputTensor, QuantParams};

/// `TfLiteType` codes the adapter understands.
pub mod tflite_type {
    pub const FLOAT32: i32 = 1;
    pub const UINT8: i32 = 3;
    pub const INT8: i32 = 9;
}

#[cfg(target_os = "espidf")]
mod ffi {
    /// Mirror of `signcam_output_t` in `tflm_bridge.h`.
    #[repr(C)]
    pub struct SignOutput {
        pub type_code: i32,
        pub data: *const core::ffi::c_void,
        pub len: usize,
        pub zero_point: i32,
        pub scale: f32,
    }

    unsafe extern "C" {
        pub fn signcam_model_version() -> u32;
        pub fn signcam_schema_version() -> u32;
        pub fn signcam_interpreter_init(arena_bytes: usize) -> i32;
        pub fn signcam_input(len: *mut usize) -> *mut f32;
        pub fn signcam_invoke() -> i32;
        pub fn signcam_output(out: *mut SignOutput);
    }

    /// Arena could not be placed in PSRAM.
    pub const ERR_ALLOC: i32 = -1;
}

// ───────────────────────────────────────────────────────────────
// Target engine
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct TflmEngine {
    input: *mut f32,
    input_len: usize,
}

#[cfg(target_os = "espidf")]
impl TflmEngine {
    pub fn new() -> Self {
        Self {
            input: core::ptr::null_mut(),
            input_len: 0,
        }
    }
}

#[cfg(target_os = "espidf")]
impl InferenceEngine for TflmEngine {
    fn model_version(&self) -> u32 {
        // SAFETY: reads a field of the linked-in model flatbuffer.
        unsafe { ffi::signcam_model_version() }
    }

    fn supported_version(&self) -> u32 {
        // SAFETY: returns a compile-time constant.
        unsafe { ffi::signcam_schema_version() }
    }

    fn allocate(&mut self, arena_bytes: usize) -> Result<()> {
        // SAFETY: called once, before any other interpreter access.
        match unsafe { ffi::signcam_interpreter_init(arena_bytes) } {
            0 => {}
            ffi::ERR_ALLOC => return Err(Error::AllocationFailure { bytes: arena_bytes }),
            _ => return Err(Error::Init("AllocateTensors")),
        }
        let mut len = 0usize;
        // SAFETY: interpreter is initialised; the pointer stays valid for
        // the program lifetime (static interpreter, arena never freed).
        let ptr = unsafe { ffi::signcam_input(&mut len) };
        if ptr.is_null() {
            return Err(Error::Init("input tensor"));
        }
        self.input = ptr;
        self.input_len = len;
        Ok(())
    }

    fn input_mut(&mut self) -> &mut [f32] {
        if self.input.is_null() {
            return &mut [];
        }
        // SAFETY: `input` points at `input_len` floats in the arena and the
        // engine is the only Rust owner of that memory.
        unsafe { core::slice::from_raw_parts_mut(self.input, self.input_len) }
    }

    fn invoke(&mut self) -> Result<()> {
        // SAFETY: interpreter was initialised in `allocate`.
        if unsafe { ffi::signcam_invoke() } == 0 {
            Ok(())
        } else {
            Err(Error::InferenceFailure)
        }
    }

    fn output(&self) -> OutputTensor<'_> {
        let mut out = ffi::SignOutput {
            type_code: 0,
            data: core::ptr::null(),
            len: 0,
            zero_point: 0,
            scale: 0.0,
        };
        // SAFETY: fills `out` from output tensor 0.
        unsafe { ffi::signcam_output(&mut out) };
        if out.data.is_null() {
            return OutputTensor::Unsupported(0);
        }
        let params = QuantParams {
            zero_point: out.zero_point,
            scale: out.scale,
        };
        // SAFETY: `data` points at `len` elements of the reported type,
        // valid until the next invoke, which needs `&mut self`.
        unsafe {
            match out.type_code {
                tflite_type::FLOAT32 => {
                    OutputTensor::Float32(core::slice::from_raw_parts(out.data.cast(), out.len))
                }
                tflite_type::UINT8 => OutputTensor::UInt8 {
                    data: core::slice::from_raw_parts(out.data.cast(), out.len),
                    params,
                },
                tflite_type::INT8 => OutputTensor::Int8 {
                    data: core::slice::from_raw_parts(out.data.cast(), out.len),
                    params,
                },
                other => OutputTensor::Unsupported(other as u8),
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host stand-in
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct TflmEngine {
    input: Vec<f32>,
    input_len: usize,
    classes: usize,
    output: [f32; MAX_CLASSES],
}

#[cfg(not(target_os = "espidf"))]
impl TflmEngine {
    /// Six-class stand-in with a 96×96×1 input.
    pub fn new() -> Self {
        Self::with_shape(crate::inference::MODEL_INPUT.len(), 6)
    }

    pub fn with_shape(input_len: usize, classes: usize) -> Self {
        Self {
            input: Vec::new(),
            input_len,
            classes: classes.clamp(1, MAX_CLASSES),
            output: [0.0; MAX_CLASSES],
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl InferenceEngine for TflmEngine {
    fn model_version(&self) -> u32 {
        3
    }

    fn supported_version(&self) -> u32 {
        3
    }

    fn allocate(&mut self, _arena_bytes: usize) -> Result<()> {
        self.input = vec![0.0; self.input_len];
        Ok(())
    }

    fn input_mut(&mut self) -> &mut [f32] {
        &mut self.input
    }

    fn invoke(&mut self) -> Result<()> {
        if self.input.is_empty() {
            return Err(Error::InferenceFailure);
        }
        let mean = self.input.iter().sum::<f32>() / self.input.len() as f32;
        let hot = ((mean * self.classes as f32) as usize).min(self.classes - 1);
        self.output = [0.0; MAX_CLASSES];
        for (i, s) in self.output[..self.classes].iter_mut().enumerate() {
            *s = if i == hot { 0.9 } else { 0.1 / self.classes as f32 };
        }
        Ok(())
    }

    fn output(&self) -> OutputTensor<'_> {
        OutputTensor::Float32(&self.output[..self.classes])
    }
}

impl Default for TflmEngine {
    fn default() -> Self {
        Self::new()
    }
}
