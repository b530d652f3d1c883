//! Integration tests for the trigger → session → report pipeline.
//!
//! Every test drives a real `AppService` (FSM, decision policy, actuation
//! sequencer, report) against the mock camera, engine, actuators and link.

use crate::mock_hw::{
    Call, FakeEngine, MockHardware, MockLink, Output, PUNO_SCORES, RecordingSink, session,
};

use signcam::app::commands::AppCommand;
use signcam::app::events::AppEvent;
use signcam::app::ports::OutputLine::{Flash, Indicator};
use signcam::app::service::AppService;
use signcam::config::{DecisionMode, SystemConfig, TriggerMode};
use signcam::error::Error;
use signcam::fsm::StateId;
use signcam::inference::QuantParams;
use signcam::report::CycleOutcome;

fn make_app(config: SystemConfig, engine: FakeEngine) -> (AppService<FakeEngine>, RecordingSink) {
    let mut app = AppService::new(config, session(engine)).unwrap();
    let mut sink = RecordingSink::new();
    app.start(&mut sink);
    (app, sink)
}

fn puno() -> FakeEngine {
    FakeEngine::always(Output::Float(PUNO_SCORES.to_vec()))
}

fn single_sample() -> SystemConfig {
    SystemConfig {
        sample_count_per_session: 1,
        ..SystemConfig::default()
    }
}

// ── Report contents ───────────────────────────────────────────

#[test]
fn capture_failure_leaves_sentinel_in_its_slot() {
    let (mut app, mut sink) = make_app(SystemConfig::default(), puno());
    let mut hw = MockHardware::failing_at(&[2]);
    let mut link = MockLink::with_triggers(1);

    let report = app.run_session(&mut hw, &mut link, &mut sink).unwrap();

    assert_eq!(link.sent, vec!["2,2,-1,2\n".to_owned()]);
    assert_eq!(report.len(), 4);
    assert_eq!(
        report.outcomes()[2],
        CycleOutcome::Failed(Error::CaptureFailure)
    );
    assert_eq!(hw.captures(), 4, "failure must not stop the session");
    assert_eq!(app.state(), StateId::WaitTrigger);
    assert_eq!(app.sessions_completed(), 1);

    assert_eq!(sink.count(|e| matches!(e, AppEvent::TriggerReceived { .. })), 1);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::CycleCompleted { .. })), 3);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::CycleFailed {
                index: 2,
                error: Error::CaptureFailure
            }
        )),
        1
    );
    assert!(
        sink.events
            .iter()
            .any(|e| matches!(e, AppEvent::ReportSent(line) if line.as_str() == "2,2,-1,2\n"))
    );
}

#[test]
fn no_detection_reports_minus_two_and_skips_actuation() {
    let engine = FakeEngine::always(Output::Float(vec![0.3, 0.2, 0.1, 0.1, 0.1, 0.2]));
    let (mut app, mut sink) = make_app(SystemConfig::default(), engine);
    let mut hw = MockHardware::new();
    let mut link = MockLink::with_triggers(1);

    app.run_session(&mut hw, &mut link, &mut sink).unwrap();

    assert_eq!(link.sent, vec!["-2,-2,-2,-2\n".to_owned()]);
    assert!(hw.servo_moves().is_empty());
    assert!(!hw.calls.contains(&Call::Digital(Indicator, true)));
}

#[test]
fn quantised_output_is_dequantised_before_deciding() {
    let params = QuantParams {
        zero_point: 0,
        scale: 1.0 / 255.0,
    };
    let engine = FakeEngine::always(Output::UInt8(vec![26, 13, 230, 51, 13, 26], params));
    let (mut app, mut sink) = make_app(single_sample(), engine);
    let mut hw = MockHardware::new();
    let mut link = MockLink::with_triggers(1);

    app.run_session(&mut hw, &mut link, &mut sink).unwrap();

    assert_eq!(link.sent, vec!["2\n".to_owned()]);
}

#[test]
fn unsupported_output_type_fails_every_cycle() {
    let engine = FakeEngine::always(Output::Unsupported(7));
    let (mut app, mut sink) = make_app(SystemConfig::default(), engine);
    let mut hw = MockHardware::new();
    let mut link = MockLink::with_triggers(1);

    app.run_session(&mut hw, &mut link, &mut sink).unwrap();

    assert_eq!(link.sent, vec!["-1,-1,-1,-1\n".to_owned()]);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::CycleFailed {
                error: Error::UnsupportedOutputType(7),
                ..
            }
        )),
        4
    );
    assert!(hw.servo_moves().is_empty());
}

#[test]
fn invoke_failure_is_cycle_local() {
    let engine = FakeEngine::scripted(vec![
        Output::Float(PUNO_SCORES.to_vec()),
        Output::InvokeFails,
        Output::Float(PUNO_SCORES.to_vec()),
    ]);
    let (mut app, mut sink) = make_app(SystemConfig::default(), engine);
    let mut hw = MockHardware::new();
    let mut link = MockLink::with_triggers(1);

    app.run_session(&mut hw, &mut link, &mut sink).unwrap();

    assert_eq!(link.sent, vec!["2,-1,2,2\n".to_owned()]);
}

// ── Actuation order ───────────────────────────────────────────

#[test]
fn detected_sign_runs_flash_capture_then_actuation_in_order() {
    let (mut app, mut sink) = make_app(single_sample(), puno());
    let mut hw = MockHardware::new();
    let mut link = MockLink::with_triggers(1);

    app.run_session(&mut hw, &mut link, &mut sink).unwrap();

    assert_eq!(
        hw.calls,
        vec![
            Call::Digital(Flash, true),
            Call::Delay(10),
            Call::Digital(Flash, false),
            Call::Capture,
            Call::Digital(Indicator, true),
            Call::Delay(100),
            Call::Digital(Indicator, false),
            Call::Servo(90),
            Call::Delay(5000),
        ]
    );
}

#[test]
fn binary_mode_maps_confidence_to_codes_and_servo() {
    let config = SystemConfig {
        decision_mode: DecisionMode::Binary,
        ..SystemConfig::default()
    };
    let engine = FakeEngine::scripted(vec![
        Output::Float(vec![0.9]),
        Output::Float(vec![0.1]),
        Output::Float(vec![0.6]),
        Output::Float(vec![0.85]),
    ]);
    let (mut app, mut sink) = make_app(config, engine);
    let mut hw = MockHardware::new();
    let mut link = MockLink::with_triggers(1);

    app.run_session(&mut hw, &mut link, &mut sink).unwrap();

    // 0.85 is not strictly above the high threshold.
    assert_eq!(link.sent, vec!["1,0,2,2\n".to_owned()]);
    assert_eq!(hw.servo_moves(), vec![90, 0]);
}

// ── Triggering ────────────────────────────────────────────────

#[test]
fn idle_link_starts_no_session() {
    let (mut app, mut sink) = make_app(SystemConfig::default(), puno());
    let mut hw = MockHardware::new();
    let mut link = MockLink::new();

    assert!(app.run_session(&mut hw, &mut link, &mut sink).is_none());
    assert_eq!(app.state(), StateId::WaitTrigger);
    assert_eq!(hw.captures(), 0);
    assert!(link.sent.is_empty());
}

#[test]
fn triggers_during_a_session_are_dropped() {
    let (mut app, mut sink) = make_app(SystemConfig::default(), puno());
    let mut hw = MockHardware::new();
    let mut link = MockLink::with_triggers(1);

    app.tick(&mut hw, &mut link, &mut sink);
    assert_eq!(app.state(), StateId::RunCycle);

    // Host keeps sending while the session runs.
    link.push_trigger();
    link.push_trigger();
    assert_eq!(
        app.handle_command(AppCommand::Trigger),
        Err(Error::Config("session in progress"))
    );

    while app.state() != StateId::WaitTrigger {
        app.tick(&mut hw, &mut link, &mut sink);
    }
    assert_eq!(link.sent.len(), 1);
    assert_eq!(hw.captures(), 4);

    // Next wait drops the backlog instead of starting new sessions.
    app.tick(&mut hw, &mut link, &mut sink);
    assert_eq!(link.dropped, 2);
    assert_eq!(app.state(), StateId::WaitTrigger);
    assert_eq!(link.sent.len(), 1);
}

#[test]
fn trigger_command_starts_a_session() {
    let (mut app, mut sink) = make_app(single_sample(), puno());
    let mut hw = MockHardware::new();
    let mut link = MockLink::new();

    app.handle_command(AppCommand::Trigger).unwrap();
    assert_eq!(app.state(), StateId::WaitTrigger, "consumed by the next tick");

    app.tick(&mut hw, &mut link, &mut sink);
    assert_eq!(app.state(), StateId::RunCycle);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::TriggerReceived { len: 0 })), 1);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::StateChanged {
                from: StateId::WaitTrigger,
                to: StateId::RunCycle
            }
        )),
        1
    );

    while app.state() != StateId::WaitTrigger {
        app.tick(&mut hw, &mut link, &mut sink);
    }
    assert_eq!(link.sent, vec!["2\n".to_owned()]);
}

#[test]
fn continuous_mode_free_runs_with_pause() {
    let config = SystemConfig {
        trigger_mode: TriggerMode::Continuous,
        sample_count_per_session: 1,
        ..SystemConfig::default()
    };
    let (mut app, mut sink) = make_app(config, puno());
    let mut hw = MockHardware::new();
    let mut link = MockLink::new();

    app.run_session(&mut hw, &mut link, &mut sink).unwrap();
    assert!(!hw.delays().contains(&2000), "no pause before the first session");

    app.run_session(&mut hw, &mut link, &mut sink).unwrap();
    assert_eq!(hw.delays().iter().filter(|&&ms| ms == 2000).count(), 1);

    assert_eq!(link.sent, vec!["2\n".to_owned(), "2\n".to_owned()]);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::TriggerReceived { .. })), 0);
    assert_eq!(app.sessions_completed(), 2);
}

// ── Failure handling ──────────────────────────────────────────

#[test]
fn failure_bound_skips_remaining_samples() {
    let config = SystemConfig {
        max_failures_per_session: 2,
        ..SystemConfig::default()
    };
    let (mut app, mut sink) = make_app(config, puno());
    let mut hw = MockHardware::failing_at(&[0, 1, 2, 3]);
    let mut link = MockLink::with_triggers(1);

    let report = app.run_session(&mut hw, &mut link, &mut sink).unwrap();

    assert_eq!(link.sent, vec!["-1,-1,-1,-1\n".to_owned()]);
    assert_eq!(hw.captures(), 2);
    assert_eq!(report.outcomes()[3], CycleOutcome::Skipped);
    assert_eq!(report.failures(), 2);
}

#[test]
fn report_write_failure_still_ends_the_session() {
    let (mut app, mut sink) = make_app(single_sample(), puno());
    let mut hw = MockHardware::new();
    let mut link = MockLink::with_triggers(1);
    link.fail_writes = true;

    app.run_session(&mut hw, &mut link, &mut sink).unwrap();

    assert_eq!(app.state(), StateId::WaitTrigger);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ReportFailed(Error::Serial(_)))),
        1
    );
    assert_eq!(app.sessions_completed(), 1);
}

// ── Runtime configuration ─────────────────────────────────────

#[test]
fn config_update_changes_the_next_session() {
    let (mut app, mut sink) = make_app(SystemConfig::default(), puno());
    let mut hw = MockHardware::new();
    let mut link = MockLink::with_triggers(1);

    let update = SystemConfig {
        sample_count_per_session: 2,
        detected_servo_deg: 45,
        ..SystemConfig::default()
    };
    app.handle_command(AppCommand::UpdateConfig(update)).unwrap();
    app.run_session(&mut hw, &mut link, &mut sink).unwrap();

    assert_eq!(link.sent, vec!["2,2\n".to_owned()]);
    assert_eq!(hw.servo_moves(), vec![45, 45]);
}

#[test]
fn oversized_session_is_rejected_at_construction() {
    let config = SystemConfig {
        sample_count_per_session: 9,
        ..SystemConfig::default()
    };
    let result = AppService::new(config, session(puno()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn boot_only_settings_cannot_change_at_runtime() {
    let (mut app, _sink) = make_app(SystemConfig::default(), puno());
    for update in [
        SystemConfig {
            serial_baud: 9600,
            ..SystemConfig::default()
        },
        SystemConfig {
            servo_max_pulse_us: 2000,
            ..SystemConfig::default()
        },
        SystemConfig {
            serial_reader_task: true,
            ..SystemConfig::default()
        },
    ] {
        assert_eq!(
            app.handle_command(AppCommand::UpdateConfig(update)),
            Err(Error::Config("boot-only setting changed"))
        );
    }
    assert_eq!(app.config(), &SystemConfig::default());
}

#[test]
fn runtime_update_cannot_outgrow_the_boot_tick_budget() {
    let (mut app, _sink) = make_app(SystemConfig::default(), puno());
    let longer = SystemConfig {
        actuation_settle_delay_ms: 6000,
        ..SystemConfig::default()
    };
    assert_eq!(
        app.handle_command(AppCommand::UpdateConfig(longer)),
        Err(Error::Config("tick budget exceeded"))
    );

    let shorter = SystemConfig {
        actuation_settle_delay_ms: 1000,
        ..SystemConfig::default()
    };
    assert!(app.handle_command(AppCommand::UpdateConfig(shorter)).is_ok());
}

#[test]
fn invalid_config_update_is_rejected() {
    let (mut app, _sink) = make_app(SystemConfig::default(), puno());
    let bad = SystemConfig {
        sample_count_per_session: 9,
        ..SystemConfig::default()
    };
    assert!(app.handle_command(AppCommand::UpdateConfig(bad)).is_err());
    assert_eq!(app.config().sample_count_per_session, 4);
}
