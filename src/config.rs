//! System configuration parameters
//!
//! All tunable timing parameters for the bracelet.
//! Values can be overridden via NVS (see [`ConfigPort`](crate::app::ports::ConfigPort)).

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BraceletConfig {
    // --- Buttons ---
    /// A raw level must hold this long before it is accepted (milliseconds)
    pub debounce_ms: u32,
    /// Both buttons held this long requests pairing (milliseconds)
    pub pairing_hold_ms: u32,
    /// Both buttons held this long while paired clears the pairing (milliseconds)
    pub factory_reset_hold_ms: u32,

    // --- Transport ---
    /// Fixed delay between broker connect attempts (milliseconds)
    pub connect_retry_delay_ms: u32,

    // --- Persistence ---
    /// Delay before retrying a failed pairing-record save (milliseconds)
    pub persist_retry_ms: u32,

    // --- Timing ---
    /// Main loop period (milliseconds)
    pub loop_interval_ms: u32,
}

impl Default for BraceletConfig {
    fn default() -> Self {
        Self {
            // Buttons
            debounce_ms: 50,
            pairing_hold_ms: 2_000,
            factory_reset_hold_ms: 10_000,

            // Transport
            connect_retry_delay_ms: 5_000,

            // Persistence
            persist_retry_ms: 5_000,

            // Timing
            loop_interval_ms: 10, // 100 Hz
        }
    }
}

/// Range-check every field. Called before a config is persisted.
pub fn validate_config(cfg: &BraceletConfig) -> Result<(), &'static str> {
    if !(5..=500).contains(&cfg.debounce_ms) {
        return Err("debounce_ms must be 5–500");
    }
    if !(500..=10_000).contains(&cfg.pairing_hold_ms) {
        return Err("pairing_hold_ms must be 500–10000");
    }
    if cfg.factory_reset_hold_ms <= cfg.pairing_hold_ms {
        return Err("factory_reset_hold_ms must be > pairing_hold_ms");
    }
    if !(100..=60_000).contains(&cfg.connect_retry_delay_ms) {
        return Err("connect_retry_delay_ms must be 100–60000");
    }
    if !(100..=60_000).contains(&cfg.persist_retry_ms) {
        return Err("persist_retry_ms must be 100–60000");
    }
    if !(1..=100).contains(&cfg.loop_interval_ms) {
        return Err("loop_interval_ms must be 1–100");
    }
    if cfg.loop_interval_ms >= cfg.debounce_ms {
        return Err("loop_interval_ms must be < debounce_ms");
    }
    Ok(())
}
