//! Function-pointer finite state machine engine for the session loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  StateTable                                                │
//! │  ┌─────────────┬───────────┬──────────┬───────────────────┐│
//! │  │ StateId     │ on_enter  │ on_exit  │ on_update         ││
//! │  ├─────────────┼───────────┼──────────┼───────────────────┤│
//! │  │ WaitTrigger │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> ││
//! │  │ RunCycle    │    -      │    -     │ fn(ctx)->Option<> ││
//! │  │ Aggregate   │ fn(ctx)   │    -     │ fn(ctx)->Option<> ││
//! │  │ Report      │    -      │ fn(ctx)  │ fn(ctx)->Option<> ││
//! │  └─────────────┴───────────┴──────────┴───────────────────┘│
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  Handlers never do I/O; the
//! [`AppService`](crate::app::service::AppService) performs the I/O a
//! state needs before ticking.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Session loop states.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    WaitTrigger = 0,
    RunCycle = 1,
    Aggregate = 2,
    Report = 3,
}

impl StateId {
    pub const COUNT: usize = 4;

    /// Convert an index back to `StateId`.  Out-of-range falls back to
    /// `WaitTrigger` in release builds.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::WaitTrigger,
            1 => Self::RunCycle,
            2 => Self::Aggregate,
            3 => Self::Report,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::WaitTrigger
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// `on_enter` / `on_exit` action, run once per transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Per-tick update.  `Some(next)` requests a transition.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

/// One row of the state table.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance by one tick: `on_update`, then the transition if any.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        if let Some(next_id) = (self.table[self.current].on_update)(ctx) {
            self.transition(next_id, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
