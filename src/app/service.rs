//! Device state aggregate, the hexagonal core.
//!
//! [`DeviceState`] owns the input tracker, the pairing FSM with its
//! context, and the transport session. One call to [`DeviceState::step`]
//! is one iteration of the cooperative main loop:
//!
//! 1. service the transport (connect, resubscribe),
//! 2. drain inbound messages into the controller,
//! 3. poll the buttons and feed their events to the controller,
//! 4. retry a stale pairing-record write if one is due.
//!
//! ```text
//!  ButtonPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                 │       DeviceState        │
//!  PubSubPort ◀──▶│ Tracker · FSM · Session  │ ◀──▶ StoragePort
//!                 └──────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::config::BraceletConfig;
use crate::drivers::button::InputTracker;
use crate::error::{Error, MessageError, StorageError};
use crate::fsm::context::{Action, MAX_ACTIONS, PairingContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};

use super::events::AppEvent;
use super::messages::{
    DeviceId, PAIRING_REQUEST_TOPIC, PairingRequest, PairingResponse, ScoreAction, ScoreEvent,
    decode_pairing_response, encode,
};
use super::persistence::{self, PairingRecord};
use super::ports::{ButtonPort, ClockPort, EventSink, PubSubPort, StoragePort};
use super::session::TransportSession;

/// Inbound messages handled per step; extras are dropped.
pub const MAX_INBOUND_PER_STEP: usize = 4;

type Decoded = Result<PairingResponse, MessageError>;

pub struct DeviceState {
    config: BraceletConfig,
    tracker: InputTracker,
    fsm: Fsm,
    ctx: PairingContext,
    session: TransportSession,
    /// Set while the record on flash lags the one in memory.
    persist_failed_at: Option<u64>,
}

impl DeviceState {
    /// Does **not** load the record; call [`start`](Self::start) next.
    pub fn new(config: BraceletConfig, device_id: DeviceId) -> Self {
        let tracker = InputTracker::new(&config);
        let session = TransportSession::new(device_id.clone(), config.connect_retry_delay_ms);
        Self {
            tracker,
            fsm: Fsm::new(build_state_table(), StateId::Unpaired),
            ctx: PairingContext::new(device_id),
            session,
            persist_failed_at: None,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the persisted record and enter the matching state.
    pub fn start(&mut self, store: &impl StoragePort, sink: &mut impl EventSink) {
        let initial = match persistence::load(store) {
            Ok(record) => {
                self.ctx.record = record;
                StateId::Paired
            }
            Err(StorageError::NotFound) => StateId::Unpaired,
            Err(e) => {
                warn!("Pairing record unavailable ({}), starting unpaired", e);
                sink.emit(&AppEvent::Fault(Error::StorageUnavailable(e)));
                StateId::Unpaired
            }
        };

        self.fsm = Fsm::new(build_state_table(), initial);
        self.fsm.start(&mut self.ctx);
        for action in core::mem::take(&mut self.ctx.outbox) {
            match action {
                Action::Listen(on) => self.session.set_listening(on),
                Action::Notify(event) => sink.emit(&event),
                other => debug!("start: ignoring {:?}", other),
            }
        }

        sink.emit(&AppEvent::Started(initial));
        info!("DeviceState started in {:?}", initial);
    }

    // ── Per-step orchestration ────────────────────────────────

    /// Run one loop iteration. See the module docs for the order.
    pub fn step(
        &mut self,
        hw: &mut impl ButtonPort,
        link: &mut impl PubSubPort,
        store: &mut impl StoragePort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        // 1. Transport
        self.session.ensure_connected(link, clock, sink);
        let now = clock.now_ms();
        self.ctx.now_ms = now;

        // 2. Inbound
        let mut inbound: heapless::Vec<Decoded, MAX_INBOUND_PER_STEP> = heapless::Vec::new();
        let session = &self.session;
        link.poll(|topic, payload| {
            if !session.accepts(topic) {
                debug!("Ignoring message on '{}'", topic);
                return;
            }
            if inbound.push(decode_pairing_response(payload)).is_err() {
                warn!("Inbound backlog full, dropping message on '{}'", topic);
            }
        });
        for decoded in inbound {
            self.handle_response(decoded, link, store, sink);
        }

        // 3. Buttons
        let raw = hw.read_raw();
        let events = self.tracker.poll(raw.increment, raw.decrement, now);
        if !events.is_empty() {
            debug!("Buttons: {:?}", events);
            self.ctx.stage_buttons(&events);
            self.fsm.tick(&mut self.ctx);
            self.ctx.clear_inputs();
            self.apply_actions(link, store, sink);
        }

        // 4. Persistence retry
        self.retry_save_if_due(store, now, sink);
    }

    /// Route one inbound message. Messages on other topics are ignored.
    pub fn on_message(
        &mut self,
        topic: &str,
        payload: &[u8],
        link: &mut impl PubSubPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        if !self.session.accepts(topic) {
            debug!("Ignoring message on '{}'", topic);
            return;
        }
        self.handle_response(decode_pairing_response(payload), link, store, sink);
    }

    fn handle_response(
        &mut self,
        decoded: Decoded,
        link: &mut impl PubSubPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        match decoded {
            Ok(response) => {
                self.ctx.response = Some(response);
                self.fsm.tick(&mut self.ctx);
                self.ctx.clear_inputs();
                self.apply_actions(link, store, sink);
            }
            Err(e) => {
                warn!("Malformed pairing response: {}", e);
                sink.emit(&AppEvent::Fault(Error::MalformedMessage(e)));
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn record(&self) -> &PairingRecord {
        &self.ctx.record
    }

    pub fn device_id(&self) -> &str {
        &self.ctx.device_id
    }

    pub fn session(&self) -> &TransportSession {
        &self.session
    }

    pub fn tracker(&self) -> &InputTracker {
        &self.tracker
    }

    pub fn config(&self) -> &BraceletConfig {
        &self.config
    }

    /// Whether the record on flash lags the one in memory.
    pub fn is_persistence_stale(&self) -> bool {
        self.persist_failed_at.is_some()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Translate the FSM outbox into port calls.
    fn apply_actions(
        &mut self,
        link: &mut impl PubSubPort,
        store: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        let actions: heapless::Vec<Action, MAX_ACTIONS> = core::mem::take(&mut self.ctx.outbox);
        let now = self.ctx.now_ms;

        for action in actions {
            match action {
                Action::PublishPairingRequest => {
                    let request = PairingRequest {
                        device_id: self.ctx.device_id.clone(),
                        timestamp: now,
                    };
                    match encode(&request) {
                        Ok(payload) => {
                            match self.session.publish(link, PAIRING_REQUEST_TOPIC, &payload) {
                                Ok(()) => sink.emit(&AppEvent::PairingRequested),
                                Err(e) => {
                                    warn!("Pairing request not sent: {}", e);
                                    sink.emit(&AppEvent::Fault(Error::TransportUnavailable(e)));
                                }
                            }
                        }
                        Err(e) => sink.emit(&AppEvent::Fault(Error::MalformedMessage(e))),
                    }
                }
                Action::PublishScore(action) => self.publish_score(action, link, sink),
                Action::SaveRecord => match persistence::save(store, &self.ctx.record) {
                    Ok(()) => self.persist_failed_at = None,
                    Err(e) => {
                        warn!("Pairing record not saved ({}), memory stays authoritative", e);
                        self.persist_failed_at = Some(now);
                        sink.emit(&AppEvent::PersistenceStale(e));
                    }
                },
                Action::ClearRecord => {
                    self.persist_failed_at = None;
                    if let Err(e) = persistence::clear(store) {
                        warn!("Pairing record not erased: {}", e);
                        sink.emit(&AppEvent::Fault(Error::StorageUnavailable(e)));
                    }
                }
                Action::Listen(on) => self.session.set_listening(on),
                Action::Notify(event) => sink.emit(&event),
            }
        }
    }

    fn publish_score(
        &mut self,
        action: ScoreAction,
        link: &mut impl PubSubPort,
        sink: &mut impl EventSink,
    ) {
        let record = &self.ctx.record;
        if !record.is_paired {
            return;
        }
        let event = ScoreEvent::new(
            action,
            record.team_number,
            self.ctx.device_id.clone(),
            self.ctx.now_ms,
        );
        let payload = match encode(&event) {
            Ok(p) => p,
            Err(e) => {
                sink.emit(&AppEvent::Fault(Error::MalformedMessage(e)));
                return;
            }
        };
        match self.session.publish(link, &record.session_topic, &payload) {
            Ok(()) => {
                info!("Score {} sent for team {}", action.as_str(), record.team_number);
                sink.emit(&AppEvent::ScoreSent(action));
            }
            Err(e) => {
                warn!("Score {} dropped: {}", action.as_str(), e);
                sink.emit(&AppEvent::ScoreDropped(action, e));
            }
        }
    }

    fn retry_save_if_due(&mut self, store: &mut impl StoragePort, now: u64, sink: &mut impl EventSink) {
        let Some(failed_at) = self.persist_failed_at else {
            return;
        };
        if !self.ctx.record.is_paired {
            self.persist_failed_at = None;
            return;
        }
        if now.saturating_sub(failed_at) < u64::from(self.config.persist_retry_ms) {
            return;
        }
        match persistence::save(store, &self.ctx.record) {
            Ok(()) => {
                self.persist_failed_at = None;
                info!("Pairing record persisted on retry");
                sink.emit(&AppEvent::PersistenceRestored);
            }
            Err(e) => {
                debug!("Pairing record retry failed: {}", e);
                self.persist_failed_at = Some(now);
            }
        }
    }
}
