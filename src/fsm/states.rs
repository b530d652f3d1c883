//! Concrete state handler functions and table builder.
//!
//! ```text
//!  WAIT_TRIGGER ──[trigger | continuous]──▶ RUN_CYCLE ◀─┐
//!       ▲                                     │  │      │
//!       │                           [N done]  │  └[i<N]─┘
//!       │                     [failure bound] ▼
//!       └──────[sent]────── REPORT ◀────── AGGREGATE
//! ```
//!
//! Triggers are consumed only in `WaitTrigger`.  Leaving `Report` asks the
//! service to drop anything that arrived while the session was running.

use log::{info, warn};

use super::context::FsmContext;
use super::{StateDescriptor, StateId};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::WaitTrigger,
            name: "WaitTrigger",
            on_enter: Some(wait_enter),
            on_exit: Some(wait_exit),
            on_update: wait_update,
        },
        StateDescriptor {
            id: StateId::RunCycle,
            name: "RunCycle",
            on_enter: None,
            on_exit: None,
            on_update: run_update,
        },
        StateDescriptor {
            id: StateId::Aggregate,
            name: "Aggregate",
            on_enter: Some(aggregate_enter),
            on_exit: None,
            on_update: aggregate_update,
        },
        StateDescriptor {
            id: StateId::Report,
            name: "Report",
            on_enter: None,
            on_exit: Some(report_exit),
            on_update: report_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAIT_TRIGGER
// ═══════════════════════════════════════════════════════════════════════════

fn wait_enter(ctx: &mut FsmContext) {
    ctx.report.clear();
    ctx.line = None;
    ctx.aborted = false;
    ctx.report_sent = false;
    ctx.trigger_received = false;
}

fn wait_exit(ctx: &mut FsmContext) {
    ctx.trigger_received = false;
    info!(
        "SESSION: starting {} sample(s)",
        ctx.config.sample_count_per_session
    );
}

fn wait_update(ctx: &mut FsmContext) -> Option<StateId> {
    ctx.trigger_received.then_some(StateId::RunCycle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUN_CYCLE: one capture/infer/decide/actuate per tick
// ═══════════════════════════════════════════════════════════════════════════

fn run_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.session_complete() {
        return Some(StateId::Aggregate);
    }
    if ctx.failure_bound_hit() {
        warn!(
            "SESSION: {} failure(s), skipping remaining {} sample(s)",
            ctx.report.failures(),
            ctx.config.samples() - ctx.report.len()
        );
        ctx.aborted = true;
        return Some(StateId::Aggregate);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  AGGREGATE: fill skipped slots, freeze the line
// ═══════════════════════════════════════════════════════════════════════════

fn aggregate_enter(ctx: &mut FsmContext) {
    let n = ctx.config.samples();
    ctx.report.pad_to(n);
    ctx.line = Some(ctx.report.format_line());
    info!("SESSION: results {}", ctx.report.summary());
}

fn aggregate_update(_ctx: &mut FsmContext) -> Option<StateId> {
    Some(StateId::Report)
}

// ═══════════════════════════════════════════════════════════════════════════
//  REPORT: the service writes the line, then we go back to waiting
// ═══════════════════════════════════════════════════════════════════════════

fn report_exit(ctx: &mut FsmContext) {
    ctx.sessions = ctx.sessions.wrapping_add(1);
    ctx.discard_requested = true;
}

fn report_update(ctx: &mut FsmContext) -> Option<StateId> {
    ctx.report_sent.then_some(StateId::WaitTrigger)
}
