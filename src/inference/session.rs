//! Explicit interpreter session.
//!
//! Constructed once at startup and handed to the session loop.  Owns the
//! engine (and through it the arena), checks the model schema, allocates
//! tensors, and keeps per-invoke timing statistics.

use log::{debug, error, info};

use crate::app::ports::{CameraPort, ClockPort, InferenceEngine};
use crate::diagnostics::InferenceStats;
use crate::error::{Error, Result};

use super::{FrameGeometry, ScoreVector};

/// An initialised interpreter, ready to run cycles.
pub struct InferenceSession<E: InferenceEngine> {
    engine: E,
    geometry: FrameGeometry,
    stats: InferenceStats,
}

impl<E: InferenceEngine> InferenceSession<E> {
    /// Check the model schema, allocate `arena_bytes`, and validate the
    /// input tensor against `geometry`.
    ///
    /// `ModelVersionMismatch` and `AllocationFailure` are fatal: the caller
    /// must not enter the session loop.
    pub fn new(
        mut engine: E,
        geometry: FrameGeometry,
        arena_bytes: usize,
        power_w: f32,
    ) -> Result<Self> {
        let model = engine.model_version();
        let supported = engine.supported_version();
        if model != supported {
            error!(
                "Model provided is schema version {} not equal to supported version {}",
                model, supported
            );
            return Err(Error::ModelVersionMismatch { model, supported });
        }

        engine.allocate(arena_bytes).inspect_err(|e| {
            error!("AllocateTensors() failed: {}", e);
        })?;

        let input_len = engine.input_mut().len();
        if input_len < geometry.len() {
            error!(
                "Input tensor holds {} elements, frame needs {}",
                input_len,
                geometry.len()
            );
            return Err(Error::AllocationFailure {
                bytes: geometry.len() * core::mem::size_of::<f32>(),
            });
        }

        info!(
            "InferenceSession ready: schema v{}, arena {} bytes, input {}x{}x{}",
            model, arena_bytes, geometry.width, geometry.height, geometry.channels
        );

        Ok(Self {
            engine,
            geometry,
            stats: InferenceStats::new(power_w),
        })
    }

    /// Capture one frame straight into the input tensor.
    pub fn capture(&mut self, camera: &mut impl CameraPort) -> Result<()> {
        let len = self.geometry.len();
        camera.capture(self.geometry, &mut self.engine.input_mut()[..len])
    }

    /// Invoke the model on the current input and dequantise the output.
    pub fn infer(&mut self, clock: &impl ClockPort) -> Result<ScoreVector> {
        let start = clock.uptime_us();
        self.engine.invoke()?;
        let elapsed = clock.uptime_us().saturating_sub(start);
        self.stats.record(elapsed);
        debug!("Invoke took {} us", elapsed);
        self.engine.output().to_scores()
    }

    /// Copy a caller-provided image into the input tensor and invoke,
    /// bypassing the camera.
    pub fn run_on(&mut self, image: &[f32], clock: &impl ClockPort) -> Result<ScoreVector> {
        let len = self.geometry.len();
        if image.len() != len {
            return Err(Error::InferenceFailure);
        }
        self.engine.input_mut()[..len].copy_from_slice(image);
        self.infer(clock)
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn stats(&self) -> &InferenceStats {
        &self.stats
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{OutputTensor, QuantParams};
    use core::cell::Cell;

    struct FakeEngine {
        model_version: u32,
        allocate_ok: bool,
        input: Vec<f32>,
        output: [u8; 2],
        invoked: u32,
    }

    impl FakeEngine {
        fn new() -> Self {
            Self {
                model_version: 3,
                allocate_ok: true,
                input: Vec::new(),
                output: [200, 10],
                invoked: 0,
            }
        }
    }

    impl InferenceEngine for FakeEngine {
        fn model_version(&self) -> u32 {
            self.model_version
        }
        fn supported_version(&self) -> u32 {
            3
        }
        fn allocate(&mut self, _arena_bytes: usize) -> Result<()> {
            if !self.allocate_ok {
                return Err(Error::AllocationFailure { bytes: 64 });
            }
            self.input = vec![0.0; 4];
            Ok(())
        }
        fn input_mut(&mut self) -> &mut [f32] {
            &mut self.input
        }
        fn invoke(&mut self) -> Result<()> {
            self.invoked += 1;
            Ok(())
        }
        fn output(&self) -> OutputTensor<'_> {
            OutputTensor::UInt8 {
                data: &self.output,
                params: QuantParams {
                    zero_point: 0,
                    scale: 0.004,
                },
            }
        }
    }

    struct StepClock(Cell<u64>);

    impl ClockPort for StepClock {
        fn uptime_us(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1500);
            t
        }
    }

    const GEOMETRY: FrameGeometry = FrameGeometry {
        width: 2,
        height: 2,
        channels: 1,
    };

    #[test]
    fn version_mismatch_is_fatal() {
        let engine = FakeEngine {
            model_version: 2,
            ..FakeEngine::new()
        };
        let err = InferenceSession::new(engine, GEOMETRY, 1024, 0.12).err();
        assert_eq!(
            err,
            Some(Error::ModelVersionMismatch {
                model: 2,
                supported: 3
            })
        );
    }

    #[test]
    fn allocation_failure_is_fatal() {
        let engine = FakeEngine {
            allocate_ok: false,
            ..FakeEngine::new()
        };
        let err = InferenceSession::new(engine, GEOMETRY, 1024, 0.12).err();
        assert!(matches!(err, Some(Error::AllocationFailure { .. })));
    }

    #[test]
    fn undersized_input_tensor_is_rejected() {
        let big = FrameGeometry {
            width: 96,
            height: 96,
            channels: 1,
        };
        let err = InferenceSession::new(FakeEngine::new(), big, 1024, 0.12).err();
        assert!(matches!(err, Some(Error::AllocationFailure { .. })));
    }

    #[test]
    fn run_on_copies_input_and_records_latency() {
        let mut session = InferenceSession::new(FakeEngine::new(), GEOMETRY, 1024, 0.12).unwrap();
        let clock = StepClock(Cell::new(0));
        let scores = session.run_on(&[0.1, 0.2, 0.3, 0.4], &clock).unwrap();

        assert_eq!(session.engine().input, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(session.engine().invoked, 1);
        assert!((scores.as_slice()[0] - 0.8).abs() < 1e-6);
        assert_eq!(session.stats().count(), 1);
        assert_eq!(session.stats().last_latency_us(), 1500);
    }

    #[test]
    fn run_on_rejects_wrong_length() {
        let mut session = InferenceSession::new(FakeEngine::new(), GEOMETRY, 1024, 0.12).unwrap();
        let clock = StepClock(Cell::new(0));
        assert_eq!(session.run_on(&[0.0; 3], &clock), Err(Error::InferenceFailure));
        assert_eq!(session.engine().invoked, 0);
    }
}
