//! Log-based event sink adapter.
//!
//! Writes every [`AppEvent`] as one `TAG | key=value` line through the
//! `log` facade (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => info!("START | state={:?}", state),
            AppEvent::LinkUp { attempts } => info!("LINK  | up attempts={}", attempts),
            AppEvent::LinkDown => warn!("LINK  | down"),
            AppEvent::ConnectRetry { attempt, delay_ms } => {
                warn!("LINK  | retry attempt={} delay_ms={}", attempt, delay_ms)
            }
            AppEvent::AwaitingResponse => info!("PAIR  | subscribed"),
            AppEvent::PairingRequested => info!("PAIR  | requested"),
            AppEvent::Paired { team } => info!("PAIR  | paired team={}", team),
            AppEvent::PairingRejected => warn!("PAIR  | rejected"),
            AppEvent::Unpaired => info!("PAIR  | cleared"),
            AppEvent::ScoreSent(action) => info!("SCORE | sent action={}", action.as_str()),
            AppEvent::ScoreDropped(action, e) => {
                warn!("SCORE | dropped action={} err={}", action.as_str(), e)
            }
            AppEvent::PersistenceStale(e) => warn!("STORE | stale err={}", e),
            AppEvent::PersistenceRestored => info!("STORE | restored"),
            AppEvent::Fault(e) => warn!("FAULT | {}", e),
        }
    }
}
