//! Transport session: broker connection lifecycle and inbound routing.
//!
//! The session never queues. A publish attempted while the link is down
//! fails with [`TransportError::NotConnected`] and the payload is gone.
//!
//! ## Reconnection policy
//!
//! [`TransportSession::ensure_connected`] blocks the loop until the link
//! is up, retrying `connect` with a fixed delay taken from the injected
//! [`ClockPort`]. After every (re)connect the pairing-response topic is
//! subscribed again if, and only if, the controller is listening for it.

use log::{info, warn};

use crate::error::{Error, TransportError};

use super::events::AppEvent;
use super::messages::{DeviceId, ResponseTopic, response_topic};
use super::ports::{ClockPort, EventSink, PubSubPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

pub struct TransportSession {
    client_id: DeviceId,
    response_topic: ResponseTopic,
    retry_delay_ms: u32,
    state: LinkState,
    listening: bool,
    subscribed: bool,
    connect_count: u32,
}

impl TransportSession {
    pub fn new(client_id: DeviceId, retry_delay_ms: u32) -> Self {
        let response_topic = response_topic(&client_id);
        Self {
            client_id,
            response_topic,
            retry_delay_ms,
            state: LinkState::Disconnected,
            listening: false,
            subscribed: false,
            connect_count: 0,
        }
    }

    /// Bring the link up if needed, then make sure the response
    /// subscription matches what the controller wants.
    pub fn ensure_connected(
        &mut self,
        link: &mut impl PubSubPort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        if !link.is_connected() {
            if self.state == LinkState::Connected {
                warn!("Session: link lost");
                sink.emit(&AppEvent::LinkDown);
            }
            self.state = LinkState::Disconnected;
            self.subscribed = false;
            self.connect(link, clock, sink);
        } else if self.state == LinkState::Disconnected {
            // Link came up on its own (client auto-reconnect): one attempt.
            self.mark_connected(1, sink);
        }

        if self.listening && !self.subscribed {
            match link.subscribe(&self.response_topic) {
                Ok(()) => {
                    self.subscribed = true;
                    info!("Session: listening on '{}'", self.response_topic);
                    sink.emit(&AppEvent::AwaitingResponse);
                }
                Err(e) => {
                    warn!("Session: subscribe failed ({}), retrying next step", e);
                    sink.emit(&AppEvent::Fault(Error::TransportUnavailable(e)));
                }
            }
        }
    }

    fn connect(
        &mut self,
        link: &mut impl PubSubPort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            match link.connect(&self.client_id) {
                Ok(()) => break,
                Err(e) => {
                    warn!(
                        "Session: connect attempt {} failed ({}), retry in {} ms",
                        attempt, e, self.retry_delay_ms
                    );
                    sink.emit(&AppEvent::ConnectRetry {
                        attempt,
                        delay_ms: self.retry_delay_ms,
                    });
                    clock.sleep_ms(self.retry_delay_ms);
                }
            }
        }
        self.mark_connected(attempt, sink);
    }

    fn mark_connected(&mut self, attempts: u32, sink: &mut impl EventSink) {
        self.state = LinkState::Connected;
        self.subscribed = false;
        self.connect_count = self.connect_count.saturating_add(1);
        info!("Session: connected as '{}'", self.client_id);
        sink.emit(&AppEvent::LinkUp { attempts });
    }

    /// Whether the response subscription should be held.
    pub fn set_listening(&mut self, listening: bool) {
        if listening && !self.listening {
            self.subscribed = false;
        }
        self.listening = listening;
    }

    /// Route filter for inbound messages.
    pub fn accepts(&self, topic: &str) -> bool {
        topic == self.response_topic.as_str()
    }

    /// Publish without queueing.
    pub fn publish(
        &mut self,
        link: &mut impl PubSubPort,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        if !link.is_connected() {
            return Err(TransportError::NotConnected);
        }
        link.publish(topic, payload)
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Number of successful connections since boot.
    pub fn connect_count(&self) -> u32 {
        self.connect_count
    }

    pub fn response_topic(&self) -> &str {
        &self.response_topic
    }
}
