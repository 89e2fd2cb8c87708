//! MQTT link adapter.
//!
//! Implements [`PubSubPort`].
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`
//!   with an event callback that records the connection flag and queues
//!   received messages. `poll` drains that queue on the main loop.
//! - **host**: an in-process loopback broker. Publishes to a subscribed
//!   topic are delivered back on the next `poll`, and
//!   [`MqttLink::inject`] lets a simulation play the backend.
//!
//! All traffic uses QoS 1, matching the backend.

use log::info;

use crate::app::ports::PubSubPort;
use crate::error::TransportError;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
use std::sync::{Arc, Mutex};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
};

/// Received messages kept between two polls; older ones are dropped.
const INBOX_CAPACITY: usize = 8;

/// Broker endpoint and credentials, fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MqttSettings {
    pub url: &'static str,
    pub username: Option<&'static str>,
    pub password: Option<&'static str>,
    /// How long one `connect` waits for the broker handshake.
    pub connect_timeout_ms: u32,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            url: match option_env!("BRACELET_MQTT_URL") {
                Some(url) => url,
                None => "mqtt://192.168.1.100:1883",
            },
            username: option_env!("BRACELET_MQTT_USER"),
            password: option_env!("BRACELET_MQTT_PASS"),
            connect_timeout_ms: 5_000,
        }
    }
}

type Message = (String, Vec<u8>);

#[derive(Default)]
struct Inbox {
    connected: bool,
    queue: heapless::Deque<Message, INBOX_CAPACITY>,
}

impl Inbox {
    fn push(&mut self, topic: &str, payload: &[u8]) {
        if self.queue.is_full() {
            self.queue.pop_front();
        }
        // A slot is free at this point.
        let _ = self.queue.push_back((topic.to_owned(), payload.to_vec()));
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct MqttLink {
    settings: MqttSettings,
    client: Option<EspMqttClient<'static>>,
    inbox: Arc<Mutex<Inbox>>,
}

#[cfg(target_os = "espidf")]
impl MqttLink {
    pub fn new(settings: MqttSettings) -> Self {
        Self {
            settings,
            client: None,
            inbox: Arc::new(Mutex::new(Inbox::default())),
        }
    }

    fn inbox(&self) -> std::sync::MutexGuard<'_, Inbox> {
        self.inbox.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn create_client(&mut self, client_id: &str) -> Result<(), TransportError> {
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            username: self.settings.username,
            password: self.settings.password,
            ..Default::default()
        };
        let inbox = Arc::clone(&self.inbox);
        let client = EspMqttClient::new_cb(self.settings.url, &conf, move |event| {
            let mut inbox = inbox.lock().unwrap_or_else(|p| p.into_inner());
            match event.payload() {
                EventPayload::Connected(_) => inbox.connected = true,
                EventPayload::Disconnected => inbox.connected = false,
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    details: Details::Complete,
                    ..
                } => inbox.push(topic, data),
                EventPayload::Error(e) => warn!("MQTT: client error {:?}", e),
                _ => {}
            }
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {}", e);
            TransportError::ConnectFailed
        })?;
        self.client = Some(client);
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl PubSubPort for MqttLink {
    fn connect(&mut self, client_id: &str) -> Result<(), TransportError> {
        if self.client.is_none() {
            self.create_client(client_id)?;
            info!("MQTT: client started for '{}'", self.settings.url);
        }

        // The IDF client reconnects on its own; wait for the handshake.
        let step_ms = 50;
        let mut waited = 0;
        while waited < self.settings.connect_timeout_ms {
            if self.is_connected() {
                return Ok(());
            }
            esp_idf_hal::delay::FreeRtos::delay_ms(step_ms);
            waited += step_ms;
        }
        Err(TransportError::ConnectFailed)
    }

    fn is_connected(&self) -> bool {
        self.inbox().connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;
        client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: publish to '{}' failed: {}", topic, e);
                TransportError::PublishFailed
            })
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtLeastOnce)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: subscribe to '{}' failed: {}", topic, e);
                TransportError::SubscribeFailed
            })
    }

    fn poll<F: FnMut(&str, &[u8])>(&mut self, mut on_message: F) {
        let drained: Vec<Message> = {
            let mut inbox = self.inbox();
            core::iter::from_fn(|| inbox.queue.pop_front()).collect()
        };
        for (topic, payload) in drained {
            on_message(&topic, &payload);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host loopback backend
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct MqttLink {
    settings: MqttSettings,
    inbox: Inbox,
    subscriptions: Vec<String>,
    client_id: Option<String>,
}

#[cfg(not(target_os = "espidf"))]
impl MqttLink {
    pub fn new(settings: MqttSettings) -> Self {
        Self {
            settings,
            inbox: Inbox::default(),
            subscriptions: Vec::new(),
            client_id: None,
        }
    }

    /// Deliver a message as if the backend had published it.
    pub fn inject(&mut self, topic: &str, payload: &[u8]) {
        if self.inbox.connected && self.subscriptions.iter().any(|t| t == topic) {
            self.inbox.push(topic, payload);
        }
    }

    /// Simulate a dropped connection. Subscriptions are lost with it.
    pub fn drop_connection(&mut self) {
        self.inbox.connected = false;
        self.subscriptions.clear();
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }
}

#[cfg(not(target_os = "espidf"))]
impl PubSubPort for MqttLink {
    fn connect(&mut self, client_id: &str) -> Result<(), TransportError> {
        self.client_id = Some(client_id.to_owned());
        self.inbox.connected = true;
        info!("MQTT(sim): '{}' connected to {}", client_id, self.settings.url);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inbox.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        if !self.inbox.connected {
            return Err(TransportError::NotConnected);
        }
        info!("MQTT(sim): publish '{}' ({} bytes)", topic, payload.len());
        self.inject(topic, payload);
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        if !self.inbox.connected {
            return Err(TransportError::NotConnected);
        }
        if !self.subscriptions.iter().any(|t| t == topic) {
            self.subscriptions.push(topic.to_owned());
        }
        Ok(())
    }

    fn poll<F: FnMut(&str, &[u8])>(&mut self, mut on_message: F) {
        while let Some((topic, payload)) = self.inbox.queue.pop_front() {
            on_message(&topic, &payload);
        }
    }
}
