//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DeviceState (domain)
//! ```
//!
//! Driven adapters (buttons, messaging link, clock, flash store, event
//! sinks) implement these traits. [`DeviceState`](super::service::DeviceState)
//! consumes them via generics, so the domain core never touches hardware
//! directly and every loop step can be driven from a host test.

use crate::config::BraceletConfig;
use crate::error::{StorageError, TransportError};

// ───────────────────────────────────────────────────────────────
// Button port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw, undebounced button levels. `true` = pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawButtons {
    pub increment: bool,
    pub decrement: bool,
}

/// Read-side port: the domain samples both buttons once per loop step.
pub trait ButtonPort {
    fn read_raw(&mut self) -> RawButtons;
}

// ───────────────────────────────────────────────────────────────
// Publish/subscribe port (driven adapter: domain ↔ broker)
// ───────────────────────────────────────────────────────────────

/// Messaging link capability.
///
/// There is no outbound queue: anything published while the link is down
/// is lost, and the caller is told so through the returned error.
pub trait PubSubPort {
    /// Establish the broker connection using `client_id`.
    fn connect(&mut self, client_id: &str) -> Result<(), TransportError>;

    /// Whether the link is currently usable.
    fn is_connected(&self) -> bool;

    /// Publish one payload.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Subscribe to an exact topic.
    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Hand every inbound message received since the last call to
    /// `on_message`, synchronously and in arrival order.
    fn poll<F: FnMut(&str, &[u8])>(&mut self, on_message: F);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time and cooperative delay. Injected so tests can run the
/// connect retry loop and debounce windows without real waiting.
pub trait ClockPort {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Block the loop for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / indication)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, status
/// LED, …). This is the side channel every error is reported on.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Fan an event out to two sinks.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting and
/// reject invalid ranges with [`ConfigError::ValidationFailed`].
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`BraceletConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<BraceletConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &BraceletConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value file store.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic, with no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Underlying store failed.
    Storage(StorageError),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}
