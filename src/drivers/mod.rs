//! Input tracking and status LED drivers.

pub mod button;
pub mod led_patterns;
pub mod status_led;
