//! Outbound application events.
//!
//! [`DeviceState`](super::service::DeviceState) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them.

use crate::error::{Error, StorageError, TransportError};
use crate::fsm::StateId;

use super::messages::ScoreAction;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The device finished loading its record (carries initial state).
    Started(StateId),

    /// Broker link established after `attempts` connect calls.
    LinkUp { attempts: u32 },

    /// Broker link was found down.
    LinkDown,

    /// One connect attempt failed; the session waits and retries.
    ConnectRetry { attempt: u32, delay_ms: u32 },

    /// Subscribed to this device's pairing-response topic.
    AwaitingResponse,

    /// A pairing request was published.
    PairingRequested,

    /// Backend accepted the pairing.
    Paired { team: u32 },

    /// Backend rejected the pairing; state unchanged.
    PairingRejected,

    /// Pairing was cleared by the reset gesture.
    Unpaired,

    /// A scoring event was published to the session topic.
    ScoreSent(ScoreAction),

    /// A scoring event could not be published and was dropped.
    ScoreDropped(ScoreAction, TransportError),

    /// The pairing record on flash is older than the one in memory.
    PersistenceStale(StorageError),

    /// A previously failed pairing-record write has now succeeded.
    PersistenceRestored,

    /// Any other non-fatal error.
    Fault(Error),
}

impl AppEvent {
    /// Whether the event reports a failure on the side channel.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectRetry { .. }
                | Self::PairingRejected
                | Self::ScoreDropped(..)
                | Self::PersistenceStale(_)
                | Self::Fault(_)
        )
    }
}
