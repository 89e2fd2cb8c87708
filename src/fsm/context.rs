//! Blackboard threaded through every pairing-controller handler.
//!
//! The service stages one input at a time (an inbound pairing response
//! or the button events of one poll), ticks the FSM, then drains the
//! [`Action`] outbox and applies each action through the ports.

use log::warn;

use crate::app::events::AppEvent;
use crate::app::messages::{DeviceId, PairingResponse, ScoreAction};
use crate::app::persistence::PairingRecord;
use crate::drivers::button::{Button, ButtonEvent, ButtonEvents};

/// Upper bound on actions produced by a single tick.
pub const MAX_ACTIONS: usize = 8;

/// Side effects requested by state handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Publish `{deviceId, timestamp}` on the pairing request topic.
    PublishPairingRequest,
    /// Publish a score event on the session topic.
    PublishScore(ScoreAction),
    /// Persist the current record.
    SaveRecord,
    /// Erase the persisted record.
    ClearRecord,
    /// The response topic subscription is needed (`true`) or not.
    Listen(bool),
    /// Forward an event to the sink.
    Notify(AppEvent),
}

pub struct PairingContext {
    /// Timestamp of the current loop step.
    pub now_ms: u64,

    // -- Inputs (cleared after each tick) --
    pub response: Option<PairingResponse>,
    pub buttons: ButtonEvents,

    // -- State --
    pub record: PairingRecord,
    pub device_id: DeviceId,

    // -- Outputs --
    pub outbox: heapless::Vec<Action, MAX_ACTIONS>,
}

impl PairingContext {
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            now_ms: 0,
            response: None,
            buttons: ButtonEvents::new(),
            record: PairingRecord::default(),
            device_id,
            outbox: heapless::Vec::new(),
        }
    }

    /// Replace the staged button events.
    pub fn stage_buttons(&mut self, events: &[ButtonEvent]) {
        self.buttons.clear();
        for ev in events {
            if self.buttons.push(*ev).is_err() {
                break;
            }
        }
    }

    pub fn clear_inputs(&mut self) {
        self.response = None;
        self.buttons.clear();
    }

    /// Queue an action for the service.
    pub fn push(&mut self, action: Action) {
        if let Err(dropped) = self.outbox.push(action) {
            warn!("FSM: outbox full, dropping {:?}", dropped);
        }
    }

    /// The score action for this poll, if exactly one lone press occurred.
    pub fn single_lone_press(&self) -> Option<ScoreAction> {
        let mut presses = self.buttons.iter().filter_map(|ev| match ev {
            ButtonEvent::PressedAlone(b) => Some(*b),
            _ => None,
        });
        let first = presses.next()?;
        if presses.next().is_some() {
            return None;
        }
        Some(match first {
            Button::Increment => ScoreAction::Increment,
            Button::Decrement => ScoreAction::Decrement,
        })
    }

    pub fn has_event(&self, event: ButtonEvent) -> bool {
        self.buttons.contains(&event)
    }
}
