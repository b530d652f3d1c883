//! Fuzz target: serial request framing
//!
//! Feeds arbitrary bursts through `read_request` and the inline
//! `SerialLink`, asserting the payload never exceeds 127 bytes, is always
//! NUL-terminated, and that an empty burst never counts as a trigger.
//!
//! cargo fuzz run fuzz_request_framing

#![no_main]

use libfuzzer_sys::fuzz_target;
use signcam::adapters::serial::UartSerial;
use signcam::app::ports::TriggerLink;
use signcam::link::{MAX_REQUEST_LEN, REQUEST_BUF_SIZE, SerialLink, read_request};

fuzz_target!(|data: &[u8]| {
    let mut raw = UartSerial::new();
    raw.inject(data);
    let mut buf = [0xAAu8; REQUEST_BUF_SIZE];
    let Ok(len) = read_request(&mut raw, &mut buf, 0) else {
        panic!("in-memory read cannot fail");
    };
    assert!(len <= MAX_REQUEST_LEN);
    assert_eq!(len, data.len().min(MAX_REQUEST_LEN));
    assert_eq!(buf[len], 0, "payload must be terminated");
    assert_eq!(&buf[..len], &data[..len]);

    let host = UartSerial::new();
    host.inject(data);
    let mut link = SerialLink::new(host);
    match link.wait_trigger(0) {
        Ok(trigger) => {
            assert!(!data.is_empty());
            assert!(trigger.len <= MAX_REQUEST_LEN);
            assert_eq!(link.last_request(), &data[..trigger.len]);
        }
        Err(_) => assert!(data.is_empty()),
    }
});
