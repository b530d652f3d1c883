//! Dedicated serial reader task and its trigger channel.
//!
//! ```text
//! ┌──────────────┐  Trigger   ┌──────────────┐
//! │ Reader task  │───────────▶│ Session loop │──▶ report (UART tx)
//! │ (UART rx)    │  channel   │ WaitTrigger  │
//! └──────────────┘            └──────────────┘
//! ```
//!
//! The reader never blocks on a full channel: extra triggers are dropped,
//! which is what the session loop would do with them anyway.

use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};

use crate::app::ports::{SerialPort, Trigger, TriggerLink};
use crate::drivers::task_pin::{self, Core};
use crate::error::{Error, Result};

use super::{REQUEST_BUF_SIZE, read_request, write_all};

/// Pending triggers the reader may queue.
pub const TRIGGER_DEPTH: usize = 4;

/// How often the session loop checks the channel while waiting.
const POLL_SLICE_MS: u64 = 10;

pub type TriggerChannel = Channel<CriticalSectionRawMutex, Trigger, TRIGGER_DEPTH>;

/// Reader task → session loop.
pub static TRIGGER_CHANNEL: TriggerChannel = Channel::new();

/// One reader iteration: read a request and post it.  Returns `true`
/// when a trigger was queued.
pub fn pump_once(
    serial: &mut impl SerialPort,
    channel: &TriggerChannel,
    buf: &mut [u8; REQUEST_BUF_SIZE],
    timeout_ms: u32,
) -> bool {
    match read_request(serial, buf, timeout_ms) {
        Ok(0) => false,
        Ok(len) => {
            if channel.try_send(Trigger { len }).is_ok() {
                debug!("READER | queued trigger ({} bytes)", len);
                true
            } else {
                debug!("READER | channel full, trigger dropped");
                false
            }
        }
        Err(e) => {
            warn!("READER | read failed: {}", e);
            false
        }
    }
}

/// Spawn the reader on the PRO core.  It owns `serial` for reads only.
pub fn spawn_reader<S>(
    mut serial: S,
    channel: &'static TriggerChannel,
    timeout_ms: u32,
) -> Result<std::thread::JoinHandle<()>>
where
    S: SerialPort + Send + 'static,
{
    info!("Serial reader task: timeout {}ms", timeout_ms);
    task_pin::spawn_on_core(Core::Pro, 5, 4, "serial-rx\0", move || {
        let mut buf = [0u8; REQUEST_BUF_SIZE];
        loop {
            pump_once(&mut serial, channel, &mut buf, timeout_ms);
        }
    })
}

/// Trigger link fed by the reader task.  `serial` is used for reports only.
pub struct ChannelLink<S: SerialPort> {
    serial: S,
    channel: &'static TriggerChannel,
}

impl<S: SerialPort> ChannelLink<S> {
    pub fn new(serial: S, channel: &'static TriggerChannel) -> Self {
        Self { serial, channel }
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }
}

impl<S: SerialPort> TriggerLink for ChannelLink<S> {
    fn wait_trigger(&mut self, timeout_ms: u32) -> Result<Trigger> {
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        loop {
            if let Ok(trigger) = self.channel.try_receive() {
                return Ok(trigger);
            }
            if Instant::now() >= deadline {
                return Err(Error::SerialTimeout);
            }
            std::thread::sleep(Duration::from_millis(POLL_SLICE_MS));
        }
    }

    fn discard_pending(&mut self) {
        let mut dropped = 0;
        while self.channel.try_receive().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("LINK | discarded {} queued trigger(s)", dropped);
        }
    }

    fn send_report(&mut self, line: &str) -> Result<()> {
        write_all(&mut self.serial, line.as_bytes())
    }
}
