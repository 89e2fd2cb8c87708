//! Monotonic clock adapter.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` for time and
//!   `FreeRtos::delay_ms` for the cooperative wait.
//! - **host**: `std::time::Instant` and `std::thread::sleep`.

use crate::app::ports::ClockPort;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl ClockPort for SystemClock {
    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u64 {
        // SAFETY: esp_timer is started by the IDF before app_main.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(target_os = "espidf")]
    fn sleep_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
