//! Serial trigger/report link.
//!
//! The wire protocol is deliberately minimal:
//!
//! ```text
//!  host ──▶ any non-empty burst (≤ 127 bytes)        = start a session
//!  host ◀── "c0,c1,...,cN-1\n"                        = session report
//! ```
//!
//! Two [`TriggerLink`] implementations share the framing:
//!
//! - [`SerialLink`] reads the UART inline from the session loop.
//! - [`channel::ChannelLink`] consumes triggers that a dedicated reader
//!   task posts into an `embassy-sync` channel.
//!
//! Either way triggers are only consumed in `WaitTrigger`, and anything
//! queued while a session ran is dropped via [`TriggerLink::discard_pending`].

pub mod channel;

use log::{debug, warn};

use crate::app::ports::{SerialPort, Trigger, TriggerLink};
use crate::error::{Error, Result};

/// Request buffer: 127 payload bytes plus the NUL terminator.
pub const REQUEST_BUF_SIZE: usize = 128;

/// Longest payload one read accepts.
pub const MAX_REQUEST_LEN: usize = REQUEST_BUF_SIZE - 1;

/// One best-effort read of a request into `buf`, truncated to
/// [`MAX_REQUEST_LEN`] and NUL-terminated.  `Ok(0)` means the wait timed
/// out.
pub fn read_request(
    serial: &mut impl SerialPort,
    buf: &mut [u8; REQUEST_BUF_SIZE],
    timeout_ms: u32,
) -> Result<usize> {
    let len = serial.read(&mut buf[..MAX_REQUEST_LEN], timeout_ms)?.min(MAX_REQUEST_LEN);
    buf[len] = 0;
    Ok(len)
}

/// Write all of `data`, retrying short writes.
pub fn write_all(serial: &mut impl SerialPort, mut data: &[u8]) -> Result<()> {
    while !data.is_empty() {
        let n = serial.write(data)?;
        if n == 0 {
            return Err(Error::Serial("write stalled"));
        }
        data = &data[n..];
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Inline reader
// ───────────────────────────────────────────────────────────────

/// Trigger link that reads the UART on the session loop's own task.
pub struct SerialLink<S: SerialPort> {
    serial: S,
    buf: [u8; REQUEST_BUF_SIZE],
    len: usize,
}

impl<S: SerialPort> SerialLink<S> {
    pub fn new(serial: S) -> Self {
        Self {
            serial,
            buf: [0; REQUEST_BUF_SIZE],
            len: 0,
        }
    }

    /// Payload of the last request, without the terminator.
    pub fn last_request(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }
}

impl<S: SerialPort> TriggerLink for SerialLink<S> {
    fn wait_trigger(&mut self, timeout_ms: u32) -> Result<Trigger> {
        match read_request(&mut self.serial, &mut self.buf, timeout_ms)? {
            0 => Err(Error::SerialTimeout),
            len => {
                self.len = len;
                debug!("LINK | request of {} bytes", len);
                Ok(Trigger { len })
            }
        }
    }

    fn discard_pending(&mut self) {
        self.serial.clear_input();
    }

    fn send_report(&mut self, line: &str) -> Result<()> {
        write_all(&mut self.serial, line.as_bytes()).inspect_err(|e| {
            warn!("LINK | report write failed: {}", e);
        })
    }
}
