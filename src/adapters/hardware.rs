//! Hardware adapter for the two scoring buttons.
//!
//! Generic over `embedded-hal` 1.0 [`InputPin`]s so the same adapter runs
//! on an `esp-idf-hal` `PinDriver` in firmware and on a mock pin in tests.
//! Both switches are active-low with the internal pull-up enabled.

use embedded_hal::digital::InputPin;
use log::warn;

use crate::app::ports::{ButtonPort, RawButtons};

pub struct ButtonPins<I, D> {
    increment: I,
    decrement: D,
}

impl<I: InputPin, D: InputPin> ButtonPins<I, D> {
    pub fn new(increment: I, decrement: D) -> Self {
        Self {
            increment,
            decrement,
        }
    }
}

/// A pin that cannot be read counts as released.
fn is_pressed<P: InputPin>(pin: &mut P, name: &str) -> bool {
    match pin.is_low() {
        Ok(low) => low,
        Err(e) => {
            warn!("Buttons: {} read failed: {:?}", name, e);
            false
        }
    }
}

impl<I: InputPin, D: InputPin> ButtonPort for ButtonPins<I, D> {
    fn read_raw(&mut self) -> RawButtons {
        RawButtons {
            increment: is_pressed(&mut self.increment, "increment"),
            decrement: is_pressed(&mut self.decrement, "decrement"),
        }
    }
}
