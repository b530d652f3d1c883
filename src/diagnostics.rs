//! Runtime diagnostics: startup memory report and inference statistics.
//!
//! The memory report is taken once at boot, before the tensor arena is
//! allocated.  A board without PSRAM cannot host the arena, so the report
//! doubles as the first fatal check.  Inference statistics accumulate over
//! the lifetime of an [`InferenceSession`](crate::inference::session::InferenceSession)
//! and are logged once per session.

use log::info;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Memory report
// ---------------------------------------------------------------------------

/// Heap and PSRAM sizes at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReport {
    pub heap_total: usize,
    pub heap_free: usize,
    pub psram_total: usize,
    pub psram_free: usize,
}

impl MemoryReport {
    #[cfg(target_os = "espidf")]
    pub fn collect() -> Self {
        use esp_idf_svc::sys::*;
        // SAFETY: heap_caps / esp_psram queries are read-only allocator
        // statistics, safe from any task.
        unsafe {
            Self {
                heap_total: heap_caps_get_total_size(MALLOC_CAP_8BIT),
                heap_free: heap_caps_get_free_size(MALLOC_CAP_8BIT),
                psram_total: esp_psram_get_size(),
                psram_free: heap_caps_get_free_size(MALLOC_CAP_SPIRAM),
            }
        }
    }

    /// Simulation values: an ESP32-S3 with 8 MiB PSRAM.
    #[cfg(not(target_os = "espidf"))]
    pub fn collect() -> Self {
        Self {
            heap_total: 390_000,
            heap_free: 330_000,
            psram_total: 8 * 1024 * 1024,
            psram_free: 8 * 1024 * 1024 - 4096,
        }
    }

    /// Fail unless PSRAM is present and can hold `arena_bytes`.
    pub fn require_psram(&self, arena_bytes: usize) -> Result<()> {
        if self.psram_total == 0 {
            log::error!("PSRAM not found");
            return Err(Error::AllocationFailure { bytes: arena_bytes });
        }
        if self.psram_free < arena_bytes {
            log::error!(
                "PSRAM free {} bytes < arena {} bytes",
                self.psram_free,
                arena_bytes
            );
            return Err(Error::AllocationFailure { bytes: arena_bytes });
        }
        Ok(())
    }

    pub fn log(&self) {
        info!("Total heap size: {}", self.heap_total);
        info!("Free heap size: {}", self.heap_free);
        info!("Total PSRAM size: {}", self.psram_total);
        info!("Free PSRAM size: {}", self.psram_free);
    }
}

// ---------------------------------------------------------------------------
// Inference statistics
// ---------------------------------------------------------------------------

/// Invoke timing and an energy estimate at a fixed board power draw.
#[derive(Debug, Clone)]
pub struct InferenceStats {
    power_w: f32,
    count: u32,
    total_us: u64,
    last_us: u64,
}

impl InferenceStats {
    pub fn new(power_w: f32) -> Self {
        Self {
            power_w,
            count: 0,
            total_us: 0,
            last_us: 0,
        }
    }

    pub fn record(&mut self, latency_us: u64) {
        self.count = self.count.saturating_add(1);
        self.total_us = self.total_us.saturating_add(latency_us);
        self.last_us = latency_us;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn last_latency_us(&self) -> u64 {
        self.last_us
    }

    pub fn mean_latency_us(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.total_us / u64::from(self.count)
        }
    }

    /// Joules spent in the last invoke.
    pub fn last_energy_j(&self) -> f32 {
        self.power_w * (self.last_us as f32 / 1_000_000.0)
    }

    /// Joules spent across every recorded invoke.
    pub fn total_energy_j(&self) -> f32 {
        self.power_w * (self.total_us as f32 / 1_000_000.0)
    }

    pub fn log(&self) {
        info!(
            "INFER | count={} | last={:.3}ms mean={:.3}ms | energy last={:.6}J total={:.4}J",
            self.count,
            self.last_us as f32 / 1000.0,
            self.mean_latency_us() as f32 / 1000.0,
            self.last_energy_j(),
            self.total_energy_j(),
        );
    }
}
