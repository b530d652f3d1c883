//! Task Watchdog Timer (TWDT) driver.
//!
//! Subscribes the session loop task.  The loop feeds once per tick and a
//! tick can block for a whole cycle or the free-run pause, so the timeout
//! is derived from the configuration rather than fixed.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

use crate::config::SystemConfig;

/// Slack on top of the longest expected tick (capture and invoke time).
pub const TIMEOUT_MARGIN_MS: u32 = 10_000;

pub struct Watchdog {
    timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Longest a single loop tick may block, plus margin.
    pub fn timeout_for(config: &SystemConfig) -> u32 {
        config.longest_block_ms().saturating_add(TIMEOUT_MARGIN_MS)
    }

    /// Reconfigure the TWDT and subscribe the calling task.
    #[cfg(target_os = "espidf")]
    pub fn new(timeout_ms: u32) -> Self {
        // SAFETY: TWDT calls take no borrowed pointers beyond the config,
        // which outlives the call; a null task handle means "current task".
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK as i32 {
                log::warn!("TWDT reconfigure returned {}", ret);
            }

            let subscribed = esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK as i32;
            if subscribed {
                info!("Watchdog: subscribed ({}ms timeout, panic on trigger)", timeout_ms);
            } else {
                log::warn!("Watchdog: failed to subscribe");
            }
            Self {
                timeout_ms,
                subscribed,
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(timeout_ms: u32) -> Self {
        info!("Watchdog(sim): no-op, {}ms", timeout_ms);
        Self { timeout_ms }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Reset the countdown.  Call once per loop iteration.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the current task's TWDT entry; no arguments.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
