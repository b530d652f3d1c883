//! End-to-end serial tests: host bytes in, report line out.
//!
//! Uses the in-memory UART backend, so the same `SerialLink` /
//! `ChannelLink` code that runs on target is exercised here.

use crate::mock_hw::{FakeEngine, MockHardware, Output, PUNO_SCORES, RecordingSink, session};

use signcam::adapters::serial::UartSerial;
use signcam::app::service::AppService;
use signcam::config::SystemConfig;
use signcam::link::SerialLink;
use signcam::link::channel::{ChannelLink, TriggerChannel, spawn_reader};

fn app() -> (AppService<FakeEngine>, RecordingSink) {
    let engine = FakeEngine::always(Output::Float(PUNO_SCORES.to_vec()));
    let mut app = AppService::new(SystemConfig::default(), session(engine)).unwrap();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);
    (app, sink)
}

#[test]
fn inline_link_round_trip() {
    let (mut app, mut sink) = app();
    let host = UartSerial::new();
    let mut link = SerialLink::new(host.clone());
    let mut hw = MockHardware::new();

    host.inject(b"go\n");
    app.run_session(&mut hw, &mut link, &mut sink).unwrap();

    assert_eq!(host.take_output(), b"2,2,2,2\n");
    assert_eq!(link.last_request(), b"go\n");
}

#[test]
fn inline_link_flushes_bytes_sent_mid_session() {
    let (mut app, mut sink) = app();
    let host = UartSerial::new();
    let mut link = SerialLink::new(host.clone());
    let mut hw = MockHardware::new();

    host.inject(b"go");
    app.tick(&mut hw, &mut link, &mut sink);
    host.inject(b"again");
    while app.state() != signcam::fsm::StateId::WaitTrigger {
        app.tick(&mut hw, &mut link, &mut sink);
    }
    assert_eq!(host.take_output(), b"2,2,2,2\n");

    // The stale request is cleared, so the next wait idles out.
    assert!(app.run_session(&mut hw, &mut link, &mut sink).is_none());
    assert!(host.take_output().is_empty());
}

#[test]
fn reader_task_feeds_the_session_loop() {
    static CH: TriggerChannel = TriggerChannel::new();
    let (mut app, mut sink) = app();
    let host = UartSerial::new();
    spawn_reader(host.clone(), &CH, 20).unwrap();
    let mut link = ChannelLink::new(host.clone(), &CH);
    let mut hw = MockHardware::new();

    host.inject(b"start");

    let mut report = None;
    for _ in 0..50 {
        report = app.run_session(&mut hw, &mut link, &mut sink);
        if report.is_some() {
            break;
        }
    }
    assert!(report.is_some(), "reader never delivered the trigger");
    assert_eq!(host.take_output(), b"2,2,2,2\n");
}
