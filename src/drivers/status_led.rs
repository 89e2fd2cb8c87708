//! Single-colour status LED driver.
//!
//! On ESP-IDF: drives the LED GPIO through an `esp-idf-hal` output pin.
//! On host/test: tracks the level in memory only.

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};

pub struct StatusLed {
    #[cfg(target_os = "espidf")]
    pin: PinDriver<'static, AnyOutputPin, Output>,
    on: bool,
}

impl StatusLed {
    #[cfg(target_os = "espidf")]
    pub fn new(pin: PinDriver<'static, AnyOutputPin, Output>) -> Self {
        Self { pin, on: false }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self { on: false }
    }

    /// Drive the LED. Writes only on change.
    pub fn set(&mut self, on: bool) {
        if on == self.on {
            return;
        }
        #[cfg(target_os = "espidf")]
        {
            let res = if on {
                self.pin.set_high()
            } else {
                self.pin.set_low()
            };
            if let Err(e) = res {
                warn!("StatusLed: GPIO write failed: {}", e);
                return;
            }
        }
        self.on = on;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}
