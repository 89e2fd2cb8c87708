//! Function-pointer finite state machine engine for the pairing controller.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  StateTable                                                │
//! │  ┌──────────┬───────────┬──────────┬───────────────────┐   │
//! │  │ StateId  │ on_enter  │ on_exit  │ on_update         │   │
//! │  ├──────────┼───────────┼──────────┼───────────────────┤   │
//! │  │ Unpaired │ fn(ctx)   │    -     │ fn(ctx)->Option<> │   │
//! │  │ Paired   │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  └──────────┴───────────┴──────────┴───────────────────┘   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the current state. If it
//! returns `Some(next_id)`, the engine runs `on_exit` for the current
//! state, then `on_enter` for the next. Handlers never do I/O: they read
//! the inputs staged in [`PairingContext`] and push [`context::Action`]s
//! into its outbox, which the service applies through the ports.

pub mod context;
pub mod states;

use context::PairingContext;
use log::info;

/// Pairing controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Unpaired = 0,
    Paired = 1,
}

impl StateId {
    pub const COUNT: usize = 2;

    /// Convert a table index back to `StateId`. Out-of-range falls back to
    /// `Unpaired`.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            1 => Self::Paired,
            0 => Self::Unpaired,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Unpaired
            }
        }
    }
}

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut PairingContext);

/// Per-tick update handler. Returns `Some(next)` to trigger a transition.
pub type StateUpdateFn = fn(&mut PairingContext) -> Option<StateId>;

/// One row in the state table.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

/// The finite state machine engine.
pub struct Fsm {
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter`. Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut PairingContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance by one tick using whatever inputs are staged in `ctx`.
    pub fn tick(&mut self, ctx: &mut PairingContext) {
        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            if next_id as usize != self.current {
                self.transition(next_id, ctx);
            }
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    fn transition(&mut self, next_id: StateId, ctx: &mut PairingContext) {
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
