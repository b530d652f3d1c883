//! UART serial adapter.
//!
//! [`UartSerial`] is a cloneable handle on one UART: the reader task and
//! the session loop each hold a clone.  Reads wait in short slices and
//! release the driver between them, so a report write never waits behind
//! a full trigger timeout.
//!
//! Off target the UART is an in-memory pair of byte queues; tests push
//! host bytes with [`UartSerial::inject`] and collect device output with
//! [`UartSerial::take_output`].

use std::sync::{Arc, Mutex};

use crate::app::ports::SerialPort;
use crate::error::{Error, Result};

/// Longest single wait while holding the driver.
const READ_SLICE_MS: u32 = 20;

#[cfg(target_os = "espidf")]
use esp_idf_hal::{delay::TickType, uart::UartDriver};

#[cfg(target_os = "espidf")]
#[derive(Clone)]
pub struct UartSerial {
    uart: Arc<Mutex<UartDriver<'static>>>,
}

#[cfg(target_os = "espidf")]
impl UartSerial {
    pub fn new(uart: UartDriver<'static>) -> Self {
        Self {
            uart: Arc::new(Mutex::new(uart)),
        }
    }
}

#[cfg(target_os = "espidf")]
impl SerialPort for UartSerial {
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        let mut waited = 0;
        loop {
            let slice = READ_SLICE_MS.min(timeout_ms - waited).max(1);
            let n = {
                let uart = self.uart.lock().map_err(|_| Error::Serial("uart lock poisoned"))?;
                uart.read(buf, TickType::new_millis(u64::from(slice)).ticks())
                    .map_err(|_| Error::Serial("uart read"))?
            };
            waited += slice;
            if n > 0 || waited >= timeout_ms {
                return Ok(n);
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let uart = self.uart.lock().map_err(|_| Error::Serial("uart lock poisoned"))?;
        uart.write(data).map_err(|_| Error::Serial("uart write"))
    }

    fn clear_input(&mut self) {
        if let Ok(uart) = self.uart.lock() {
            if uart.clear_rx().is_err() {
                log::warn!("UART | clear_rx failed");
            }
        }
    }
}

// ── Host backend ──────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
struct Loopback {
    rx: std::collections::VecDeque<u8>,
    tx: Vec<u8>,
}

#[cfg(not(target_os = "espidf"))]
#[derive(Clone, Default)]
pub struct UartSerial {
    inner: Arc<Mutex<Loopback>>,
}

#[cfg(not(target_os = "espidf"))]
impl UartSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes as if sent by the host.
    pub fn inject(&self, bytes: &[u8]) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.rx.extend(bytes);
        }
    }

    /// Everything the device wrote since the last call.
    pub fn take_output(&self) -> Vec<u8> {
        self.inner
            .lock()
            .map(|mut inner| std::mem::take(&mut inner.tx))
            .unwrap_or_default()
    }
}

#[cfg(not(target_os = "espidf"))]
impl SerialPort for UartSerial {
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        let mut waited = 0;
        loop {
            {
                let mut inner = self.inner.lock().map_err(|_| Error::Serial("uart lock poisoned"))?;
                if !inner.rx.is_empty() {
                    let n = buf.len().min(inner.rx.len());
                    for (dst, src) in buf.iter_mut().zip(inner.rx.drain(..n)) {
                        *dst = src;
                    }
                    return Ok(n);
                }
            }
            if waited >= timeout_ms {
                return Ok(0);
            }
            let slice = READ_SLICE_MS.min(timeout_ms - waited);
            std::thread::sleep(std::time::Duration::from_millis(u64::from(slice)));
            waited += slice;
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock().map_err(|_| Error::Serial("uart lock poisoned"))?;
        inner.tx.extend_from_slice(data);
        Ok(data.len())
    }

    fn clear_input(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.rx.clear();
        }
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_uart() {
        let mut device = UartSerial::new();
        let host = device.clone();
        host.inject(b"go");
        let mut buf = [0u8; 8];
        assert_eq!(device.read(&mut buf, 0).unwrap(), 2);
        assert_eq!(&buf[..2], b"go");

        device.write(b"2,-1\n").unwrap();
        assert_eq!(host.take_output(), b"2,-1\n");
        assert!(host.take_output().is_empty());
    }

    #[test]
    fn idle_read_times_out_with_zero() {
        let mut uart = UartSerial::new();
        let mut buf = [0u8; 8];
        assert_eq!(uart.read(&mut buf, 30).unwrap(), 0);
    }

    #[test]
    fn clear_input_drops_pending_bytes() {
        let mut uart = UartSerial::new();
        uart.inject(b"stale");
        uart.clear_input();
        let mut buf = [0u8; 8];
        assert_eq!(uart.read(&mut buf, 0).unwrap(), 0);
    }
}
