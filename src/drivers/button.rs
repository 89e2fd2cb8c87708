//! Debounced two-button input tracker with combined-hold detection.
//!
//! ## Hardware
//!
//! Two active-low momentary switches ("+" and "−"). The main loop samples
//! both raw levels every iteration and hands them to [`InputTracker::poll`],
//! which runs the debounce and gesture state machine. Nothing here touches
//! GPIO directly; see [`crate::adapters::hardware`].
//!
//! ## Gesture detection
//!
//! | Gesture        | Condition                                   | Event               |
//! |----------------|---------------------------------------------|---------------------|
//! | Lone press     | One button settles down, other is up        | `PressedAlone(b)`   |
//! | Lone release   | One button settles up outside a combo       | `ReleasedAlone(b)`  |
//! | Pairing hold   | Both down >= `pairing_hold_ms`              | `BothHeldReached`   |
//! | Reset hold     | Both down >= `factory_reset_hold_ms`        | `BothHeldLong`      |
//! | Combo release  | Both up again after a combined episode      | `BothReleased`      |
//!
//! Once both buttons have been down together, the episode lasts until both
//! are up again. Inside an episode no per-button event is emitted, and each
//! hold event fires at most once.

use crate::config::BraceletConfig;

/// Upper bound on events produced by a single poll.
pub const MAX_EVENTS_PER_POLL: usize = 4;

/// Logical button identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Increment,
    Decrement,
}

/// Clean events emitted after debounce and gesture classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    PressedAlone(Button),
    ReleasedAlone(Button),
    BothHeldReached,
    BothHeldLong,
    BothReleased,
}

/// Events produced by one [`InputTracker::poll`] call.
pub type ButtonEvents = heapless::Vec<ButtonEvent, MAX_EVENTS_PER_POLL>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Pressed,
    Released,
}

/// Debounce state for one physical button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    /// Last raw level seen.
    pub raw_pressed: bool,
    /// Level accepted after the debounce window.
    pub debounced_pressed: bool,
    /// Time of the last raw level change.
    pub last_transition_ms: u64,
}

impl ButtonState {
    fn sample(&mut self, raw: bool, now_ms: u64, debounce_ms: u64) -> Option<Edge> {
        if raw != self.raw_pressed {
            self.raw_pressed = raw;
            self.last_transition_ms = now_ms;
        }

        let stable_for = now_ms.saturating_sub(self.last_transition_ms);
        if self.debounced_pressed == self.raw_pressed || stable_for < debounce_ms {
            return None;
        }

        self.debounced_pressed = self.raw_pressed;
        Some(if self.debounced_pressed {
            Edge::Pressed
        } else {
            Edge::Released
        })
    }
}

/// Tracks the simultaneous-hold gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CombinedPressTracker {
    /// When the current overlap of both debounced presses began.
    /// Cleared as soon as either button releases.
    pub both_held_since: Option<u64>,
    /// `BothHeldReached` already fired in this episode.
    pub pairing_fired: bool,
    /// `BothHeldLong` already fired in this episode.
    pub reset_fired: bool,
    /// Both buttons have been down together and not yet both released.
    pub engaged: bool,
}

pub struct InputTracker {
    increment: ButtonState,
    decrement: ButtonState,
    combined: CombinedPressTracker,
    debounce_ms: u64,
    pairing_hold_ms: u64,
    reset_hold_ms: u64,
}

impl InputTracker {
    pub fn new(config: &BraceletConfig) -> Self {
        Self {
            increment: ButtonState::default(),
            decrement: ButtonState::default(),
            combined: CombinedPressTracker::default(),
            debounce_ms: u64::from(config.debounce_ms),
            pairing_hold_ms: u64::from(config.pairing_hold_ms),
            reset_hold_ms: u64::from(config.factory_reset_hold_ms),
        }
    }

    /// Feed one pair of raw samples taken at `now_ms`.
    pub fn poll(&mut self, raw_increment: bool, raw_decrement: bool, now_ms: u64) -> ButtonEvents {
        let mut events = ButtonEvents::new();

        let inc_edge = self.increment.sample(raw_increment, now_ms, self.debounce_ms);
        let dec_edge = self.decrement.sample(raw_decrement, now_ms, self.debounce_ms);
        let inc_down = self.increment.debounced_pressed;
        let dec_down = self.decrement.debounced_pressed;

        if inc_down && dec_down {
            self.combined.engaged = true;
            let since = *self.combined.both_held_since.get_or_insert(now_ms);
            let held_ms = now_ms.saturating_sub(since);

            if !self.combined.pairing_fired && held_ms >= self.pairing_hold_ms {
                self.combined.pairing_fired = true;
                let _ = events.push(ButtonEvent::BothHeldReached);
            }
            if !self.combined.reset_fired && held_ms >= self.reset_hold_ms {
                self.combined.reset_fired = true;
                let _ = events.push(ButtonEvent::BothHeldLong);
            }
            return events;
        }

        self.combined.both_held_since = None;

        if self.combined.engaged {
            // The episode ends only when both are up; a straggler still held
            // from the combo never counts as a lone press.
            if !inc_down && !dec_down {
                self.combined = CombinedPressTracker::default();
                let _ = events.push(ButtonEvent::BothReleased);
            }
            return events;
        }

        for (button, edge) in [
            (Button::Increment, inc_edge),
            (Button::Decrement, dec_edge),
        ] {
            match edge {
                Some(Edge::Pressed) => {
                    let _ = events.push(ButtonEvent::PressedAlone(button));
                }
                Some(Edge::Released) => {
                    let _ = events.push(ButtonEvent::ReleasedAlone(button));
                }
                None => {}
            }
        }

        events
    }

    pub fn button(&self, button: Button) -> &ButtonState {
        match button {
            Button::Increment => &self.increment,
            Button::Decrement => &self.decrement,
        }
    }

    pub fn combined(&self) -> &CombinedPressTracker {
        &self.combined
    }
}
