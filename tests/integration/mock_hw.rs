//! Mock adapters for integration tests.
//!
//! Every mock records what the core did to it so tests can assert on
//! the full history without a broker, flash or GPIO.

use std::collections::{HashMap, VecDeque};

use bracelet::adapters::device_id;
use bracelet::app::events::AppEvent;
use bracelet::app::messages::DeviceId;
use bracelet::app::ports::{
    ButtonPort, ClockPort, EventSink, PubSubPort, RawButtons, StoragePort,
};
use bracelet::app::service::DeviceState;
use bracelet::config::BraceletConfig;
use bracelet::error::{StorageError, TransportError};

// ── Buttons ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockButtons {
    pub increment: bool,
    pub decrement: bool,
}

impl ButtonPort for MockButtons {
    fn read_raw(&mut self) -> RawButtons {
        RawButtons {
            increment: self.increment,
            decrement: self.decrement,
        }
    }
}

// ── Pub/sub link ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockLink {
    pub connected: bool,
    /// Number of upcoming `connect` calls that fail.
    pub fail_connects: u32,
    pub fail_subscribe: bool,
    pub fail_publish: bool,
    pub connect_calls: Vec<String>,
    pub subscribe_calls: Vec<String>,
    pub published: Vec<(String, Vec<u8>)>,
    inbox: VecDeque<(String, Vec<u8>)>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for the next `poll`.
    pub fn deliver(&mut self, topic: &str, payload: &[u8]) {
        self.inbox.push_back((topic.to_owned(), payload.to_vec()));
    }

    pub fn drop_link(&mut self) {
        self.connected = false;
    }

    /// Payloads published on `topic`, parsed as JSON.
    pub fn published_on(&self, topic: &str) -> Vec<serde_json::Value> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| serde_json::from_slice(p).expect("published payload is JSON"))
            .collect()
    }
}

impl PubSubPort for MockLink {
    fn connect(&mut self, client_id: &str) -> Result<(), TransportError> {
        self.connect_calls.push(client_id.to_owned());
        if self.fail_connects > 0 {
            self.fail_connects -= 1;
            return Err(TransportError::ConnectFailed);
        }
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        if self.fail_publish {
            return Err(TransportError::PublishFailed);
        }
        self.published.push((topic.to_owned(), payload.to_vec()));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.subscribe_calls.push(topic.to_owned());
        if self.fail_subscribe {
            return Err(TransportError::SubscribeFailed);
        }
        Ok(())
    }

    fn poll<F: FnMut(&str, &[u8])>(&mut self, mut on_message: F) {
        while let Some((topic, payload)) = self.inbox.pop_front() {
            on_message(&topic, &payload);
        }
    }
}

// ── Clock ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockClock {
    pub now: u64,
    pub sleeps: Vec<u32>,
}

impl ClockPort for MockClock {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.sleeps.push(ms);
        self.now += u64::from(ms);
    }
}

// ── Store ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStore {
    pub data: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
    pub writes: u32,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<&Vec<u8>> {
        self.data.get(&format!("{}::{}", namespace, key))
    }

    pub fn put(&mut self, namespace: &str, key: &str, bytes: &[u8]) {
        self.data
            .insert(format!("{}::{}", namespace, key), bytes.to_vec());
    }
}

impl StoragePort for MockStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.get(namespace, key).ok_or(StorageError::NotFound)?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::WriteFailed);
        }
        self.writes += 1;
        self.put(namespace, key, data);
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{}::{}", namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.get(namespace, key).is_some()
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig: device + mocks driven in 10 ms loop steps ────────────

pub const STEP_MS: u64 = 10;

pub fn sim_id() -> DeviceId {
    device_id::device_id(&device_id::read_mac())
}

pub struct Rig {
    pub device: DeviceState,
    pub buttons: MockButtons,
    pub link: MockLink,
    pub store: MockStore,
    pub clock: MockClock,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with_store(MockStore::new())
    }

    /// Boot a device against an existing flash image.
    pub fn with_store(store: MockStore) -> Self {
        let mut rig = Self {
            device: DeviceState::new(BraceletConfig::default(), sim_id()),
            buttons: MockButtons::default(),
            link: MockLink::new(),
            store,
            clock: MockClock::default(),
            sink: RecordingSink::default(),
        };
        rig.device.start(&rig.store, &mut rig.sink);
        rig
    }

    pub fn step(&mut self) {
        self.clock.now += STEP_MS;
        self.device.step(
            &mut self.buttons,
            &mut self.link,
            &mut self.store,
            &mut self.clock,
            &mut self.sink,
        );
    }

    pub fn run_ms(&mut self, ms: u64) {
        for _ in 0..ms / STEP_MS {
            self.step();
        }
    }

    pub fn set(&mut self, increment: bool, decrement: bool) {
        self.buttons.increment = increment;
        self.buttons.decrement = decrement;
    }

    /// Press and release one button, long enough to clear debounce.
    pub fn tap(&mut self, increment: bool) {
        self.set(increment, !increment);
        self.run_ms(100);
        self.set(false, false);
        self.run_ms(100);
    }

    /// Hold both buttons for `ms`, then release both.
    pub fn hold_both(&mut self, ms: u64) {
        self.set(true, true);
        self.run_ms(ms);
        self.set(false, false);
        self.run_ms(100);
    }

    pub fn response_topic(&self) -> String {
        format!("pairing/response/{}", self.device.device_id())
    }

    /// Deliver a pairing response and let one step process it.
    pub fn respond(&mut self, json: &str) {
        let topic = self.response_topic();
        self.link.deliver(&topic, json.as_bytes());
        self.step();
    }

    /// Request pairing and accept it with `topic` / `team`.
    pub fn pair(&mut self, topic: &str, team: u32) {
        self.hold_both(2_200);
        self.respond(&format!(
            r#"{{"status":"ok","topic":"{}","team":{},"sessionId":"S1"}}"#,
            topic, team
        ));
    }
}
