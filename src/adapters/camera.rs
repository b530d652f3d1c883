//! Camera adapter.
//!
//! On target the frame comes from the `tflm_bridge` component, which wraps
//! the esp32-camera driver, converts to grayscale at the model resolution
//! and writes normalised `f32` pixels straight into the caller's buffer.
//! Off target a synthetic gradient frame stands in.

use crate::app::ports::CameraPort;
use crate::error::{Error, Result};
use crate::inference::FrameGeometry;

#[cfg(target_os = "espidf")]
mod ffi {
    unsafe extern "C" {
        pub fn signcam_camera_init(width: i32, height: i32) -> i32;
        pub fn signcam_camera_capture(width: i32, height: i32, channels: i32, dest: *mut f32) -> i32;
    }
}

pub struct EspCamera {
    geometry: FrameGeometry,
    #[cfg(not(target_os = "espidf"))]
    frames: u32,
}

impl EspCamera {
    /// Bring up the sensor at `geometry`.  Failure here is fatal.
    #[cfg(target_os = "espidf")]
    pub fn init(geometry: FrameGeometry) -> Result<Self> {
        // SAFETY: plain integer arguments; the bridge owns all camera state.
        let ret = unsafe { ffi::signcam_camera_init(geometry.width as i32, geometry.height as i32) };
        if ret != 0 {
            log::error!("InitCamera failed ({})", ret);
            return Err(Error::Init("camera"));
        }
        log::info!("Camera ready: {}x{}", geometry.width, geometry.height);
        Ok(Self { geometry })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn init(geometry: FrameGeometry) -> Result<Self> {
        log::info!("Camera(sim): {}x{}", geometry.width, geometry.height);
        Ok(Self {
            geometry,
            frames: 0,
        })
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }
}

impl CameraPort for EspCamera {
    #[cfg(target_os = "espidf")]
    fn capture(&mut self, geometry: FrameGeometry, dest: &mut [f32]) -> Result<()> {
        if geometry != self.geometry || dest.len() < geometry.len() {
            return Err(Error::CaptureFailure);
        }
        // SAFETY: `dest` holds at least width*height*channels floats.
        let ret = unsafe {
            ffi::signcam_camera_capture(
                geometry.width as i32,
                geometry.height as i32,
                geometry.channels as i32,
                dest.as_mut_ptr(),
            )
        };
        if ret == 0 { Ok(()) } else { Err(Error::CaptureFailure) }
    }

    #[cfg(not(target_os = "espidf"))]
    fn capture(&mut self, geometry: FrameGeometry, dest: &mut [f32]) -> Result<()> {
        if geometry != self.geometry || dest.len() < geometry.len() {
            return Err(Error::CaptureFailure);
        }
        self.frames = self.frames.wrapping_add(1);
        let shift = self.frames as usize;
        let len = geometry.len();
        for (i, px) in dest[..len].iter_mut().enumerate() {
            *px = ((i + shift) % 256) as f32 / 255.0;
        }
        Ok(())
    }
}
