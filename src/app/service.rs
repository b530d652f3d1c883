//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the session FSM, the inference session, the
//! decision policy and the actuation sequencer.  Each [`tick`](AppService::tick)
//! performs the I/O the current state needs through port traits, then
//! advances the FSM.
//!
//! ```text
//!  TriggerLink ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!  CameraPort  ──▶ │          AppService           │
//! ActuatorPort ◀── │ FSM · Session · Policy · Seq  │ ──▶ TriggerLink (report)
//!                  └──────────────────────────────┘
//! ```

use log::{error, info, warn};

use crate::actuation::{self, ActuationSequencer};
use crate::config::{SystemConfig, TriggerMode};
use crate::decision::{Decision, DecisionPolicy};
use crate::error::{Error, Result};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::inference::session::InferenceSession;
use crate::inference::{ScoreVector, category_label};
use crate::report::{CycleOutcome, CycleResult, SessionReport};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{ActuatorPort, CameraPort, ClockPort, EventSink, InferenceEngine, TriggerLink};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<E: InferenceEngine> {
    fsm: Fsm,
    ctx: FsmContext,
    session: InferenceSession<E>,
    policy: DecisionPolicy,
    sequencer: ActuationSequencer,
    last_report: Option<SessionReport>,
    /// A `Trigger` command waiting for the next `WaitTrigger` tick.
    command_trigger: bool,
    /// Longest tick the boot configuration allows; runtime updates may
    /// not exceed it since the watchdog was sized from it.
    block_budget_ms: u32,
}

impl<E: InferenceEngine> AppService<E> {
    /// Build the service around an initialised inference session.
    ///
    /// The configuration is range-checked first: the session report has
    /// room for at most eight samples.
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: SystemConfig, session: InferenceSession<E>) -> Result<Self> {
        config.validate().map_err(|e| {
            error!("AppService: rejecting config: {}", e);
            Error::from(e)
        })?;
        let policy = DecisionPolicy::from_config(&config);
        let sequencer = ActuationSequencer::from_config(&config);
        info!(
            "AppService: {:?} policy, {:?} trigger, {} sample(s)/session",
            config.decision_mode, config.trigger_mode, config.sample_count_per_session
        );
        let block_budget_ms = config.longest_block_ms();
        Ok(Self {
            fsm: Fsm::new(build_state_table(), StateId::WaitTrigger),
            ctx: FsmContext::new(config),
            session,
            policy,
            sequencer,
            last_report: None,
            command_trigger: false,
            block_budget_ms,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One step of the session loop.
    ///
    /// `hw` satisfies the camera, actuator and clock ports at once so the
    /// cycle can flash, capture, time and actuate without juggling borrows.
    pub fn tick(
        &mut self,
        hw: &mut (impl CameraPort + ActuatorPort + ClockPort),
        link: &mut impl TriggerLink,
        sink: &mut impl EventSink,
    ) {
        let prev_state = self.fsm.current_state();

        match prev_state {
            StateId::WaitTrigger => self.wait_for_trigger(hw, link, sink),
            StateId::RunCycle => {
                if !self.ctx.session_complete() {
                    let outcome = self.run_cycle(hw, sink);
                    self.ctx.record(outcome);
                }
            }
            StateId::Aggregate => {}
            StateId::Report => self.send_report(link, sink),
        }

        self.fsm.tick(&mut self.ctx);

        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }
    }

    /// Tick until a full session has been reported.
    ///
    /// Returns `None` if no trigger arrived on the first tick.
    pub fn run_session(
        &mut self,
        hw: &mut (impl CameraPort + ActuatorPort + ClockPort),
        link: &mut impl TriggerLink,
        sink: &mut impl EventSink,
    ) -> Option<SessionReport> {
        self.last_report = None;
        self.tick(hw, link, sink);
        if self.fsm.current_state() == StateId::WaitTrigger {
            return None;
        }
        while self.fsm.current_state() != StateId::WaitTrigger {
            self.tick(hw, link, sink);
        }
        self.last_report.clone()
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply a command.  A `Trigger` is consumed by the next
    /// [`tick`](Self::tick), which emits the same events as a serial
    /// trigger.  `UpdateConfig` may retune thresholds and timings but not
    /// the settings consumed at boot.
    pub fn handle_command(&mut self, cmd: AppCommand) -> Result<()> {
        match cmd {
            AppCommand::Trigger => {
                if self.fsm.current_state() != StateId::WaitTrigger {
                    warn!("Trigger ignored: session in progress");
                    return Err(Error::Config("session in progress"));
                }
                self.command_trigger = true;
                Ok(())
            }
            AppCommand::UpdateConfig(config) => {
                if self.fsm.current_state() != StateId::WaitTrigger {
                    warn!("Config update rejected: session in progress");
                    return Err(Error::Config("session in progress"));
                }
                config.validate().map_err(|e| {
                    warn!("Config update rejected: {}", e);
                    Error::from(e)
                })?;
                if !config.boot_settings_match(&self.ctx.config) {
                    warn!("Config update rejected: servo/UART settings apply at boot only");
                    return Err(Error::Config("boot-only setting changed"));
                }
                if config.longest_block_ms() > self.block_budget_ms {
                    warn!(
                        "Config update rejected: {}ms tick exceeds the {}ms boot budget",
                        config.longest_block_ms(),
                        self.block_budget_ms
                    );
                    return Err(Error::Config("tick budget exceeded"));
                }
                self.policy = DecisionPolicy::from_config(&config);
                self.sequencer = ActuationSequencer::from_config(&config);
                self.ctx.config = config;
                info!("Configuration updated at runtime");
                Ok(())
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.ctx.config
    }

    /// Outcomes recorded so far in the running session.
    pub fn pending_report(&self) -> &SessionReport {
        &self.ctx.report
    }

    /// The most recently reported session.
    pub fn last_report(&self) -> Option<&SessionReport> {
        self.last_report.as_ref()
    }

    pub fn sessions_completed(&self) -> u32 {
        self.ctx.sessions
    }

    pub fn session(&self) -> &InferenceSession<E> {
        &self.session
    }

    pub fn policy(&self) -> DecisionPolicy {
        self.policy
    }

    // ── State I/O ─────────────────────────────────────────────

    fn wait_for_trigger(
        &mut self,
        hw: &mut impl ActuatorPort,
        link: &mut impl TriggerLink,
        sink: &mut impl EventSink,
    ) {
        if self.ctx.discard_requested {
            link.discard_pending();
            self.ctx.discard_requested = false;
        }

        if self.command_trigger {
            self.command_trigger = false;
            self.ctx.trigger_received = true;
            sink.emit(&AppEvent::TriggerReceived { len: 0 });
            return;
        }

        if self.ctx.config.trigger_mode == TriggerMode::Continuous {
            if self.ctx.sessions > 0 {
                hw.delay_ms(self.ctx.config.free_run_pause_ms);
            }
            self.ctx.trigger_received = true;
            return;
        }

        match link.wait_trigger(self.ctx.config.serial_timeout_ms) {
            Ok(trigger) => {
                self.ctx.trigger_received = true;
                sink.emit(&AppEvent::TriggerReceived { len: trigger.len });
            }
            Err(Error::SerialTimeout) => {}
            Err(e) => warn!("Trigger read failed: {}", e),
        }
    }

    /// Flash, capture, infer, decide, actuate.  Failures stop the cycle
    /// before any decision exists.
    fn run_cycle(
        &mut self,
        hw: &mut (impl CameraPort + ActuatorPort + ClockPort),
        sink: &mut impl EventSink,
    ) -> CycleOutcome {
        let index = self.ctx.cycle_index();

        actuation::execute(&self.sequencer.flash_plan(), hw);

        let t0 = hw.uptime_us();
        if let Err(e) = self.session.capture(hw) {
            error!("Image capture failed: {}", e);
            return self.fail(index, e, sink);
        }
        let capture_us = hw.uptime_us().saturating_sub(t0);

        let scores = match self.session.infer(&*hw) {
            Ok(scores) => scores,
            Err(e) => {
                error!("Invoke failed: {}", e);
                return self.fail(index, e, sink);
            }
        };
        let inference_us = self.session.stats().last_latency_us();

        let decision = self.policy.decide(&scores);
        log_decision(&decision, &scores);

        actuation::execute(&self.sequencer.plan_for(&decision), hw);

        sink.emit(&AppEvent::CycleCompleted {
            index,
            decision,
            capture_us,
            inference_us,
        });
        CycleOutcome::Decided(CycleResult {
            decision,
            capture_us,
            inference_us,
        })
    }

    fn fail(&self, index: usize, error: Error, sink: &mut impl EventSink) -> CycleOutcome {
        sink.emit(&AppEvent::CycleFailed { index, error });
        CycleOutcome::Failed(error)
    }

    fn send_report(&mut self, link: &mut impl TriggerLink, sink: &mut impl EventSink) {
        if self.ctx.report_sent {
            return;
        }
        let line = self.ctx.line.take().unwrap_or_else(|| self.ctx.report.format_line());
        match link.send_report(&line) {
            Ok(()) => sink.emit(&AppEvent::ReportSent(line)),
            Err(e) => {
                error!("Report write failed: {}", e);
                sink.emit(&AppEvent::ReportFailed(e));
            }
        }
        self.session.stats().log();
        self.last_report = Some(self.ctx.report.clone());
        self.ctx.report_sent = true;
    }
}

/// Console trace of one decision, with the per-class score dump.
fn log_decision(decision: &Decision, scores: &ScoreVector) {
    match decision {
        Decision::Category { index, confidence } => {
            info!(
                "Detected sign: {} ({:.2})",
                category_label(*index),
                confidence
            );
        }
        Decision::NoDetection => info!("No sign detected"),
        Decision::Binary { class, confidence } => {
            info!("Binary decision: {:?} (score {:.3})", class, confidence);
            return;
        }
    }
    for (i, score) in scores.as_slice().iter().enumerate() {
        info!("  {}: {:.2}", category_label(i), score);
    }
}
