//! Status LED indication sink.
//!
//! Implements [`EventSink`] by translating [`AppEvent`]s into requests on
//! the [`LedPatternEngine`]. The main loop calls [`LedIndicator::tick`]
//! once per iteration to advance the pattern and drive the GPIO.

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::drivers::led_patterns::LedPatternEngine;
use crate::drivers::status_led::StatusLed;
use crate::fsm::StateId;

pub struct LedIndicator {
    engine: LedPatternEngine,
    led: StatusLed,
}

impl LedIndicator {
    pub fn new(led: StatusLed) -> Self {
        let mut engine = LedPatternEngine::new();
        engine.set_paired(false);
        engine.set_link_up(false);
        Self { engine, led }
    }

    /// Advance by `delta_ms` and write the resulting level.
    pub fn tick(&mut self, delta_ms: u32) {
        let on = self.engine.tick(delta_ms);
        self.led.set(on);
    }

    pub fn is_lit(&self) -> bool {
        self.led.is_on()
    }
}

impl EventSink for LedIndicator {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => self.engine.set_paired(*state == StateId::Paired),
            AppEvent::Paired { .. } => self.engine.set_paired(true),
            AppEvent::Unpaired => self.engine.set_paired(false),
            AppEvent::LinkUp { .. } => self.engine.set_link_up(true),
            AppEvent::LinkDown => self.engine.set_link_up(false),
            AppEvent::PairingRequested | AppEvent::ScoreSent(_) => self.engine.flash(),
            e if e.is_error() => self.engine.raise_error(),
            _ => {}
        }
    }
}
