//! Wire messages exchanged with the backend.
//!
//! All payloads are UTF-8 JSON objects (`serde_json`):
//!
//! | Direction | Topic                        | Payload                                           |
//! |-----------|------------------------------|---------------------------------------------------|
//! | out       | `pairing/request`            | `{deviceId, timestamp}`                           |
//! | in        | `pairing/response/<id>`      | `{status, topic?, team?, sessionId?, message?}`   |
//! | out       | `<sessionTopic>`             | `{type:"score", action, team, deviceId, timestamp}` |
//!
//! `topic` and `team` are required only when `status == "ok"`.

use core::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::MessageError;

/// Topic every pairing request is published to.
pub const PAIRING_REQUEST_TOPIC: &str = "pairing/request";

/// Prefix of the per-device response topic.
pub const PAIRING_RESPONSE_PREFIX: &str = "pairing/response/";

/// Longest session topic the device will accept and persist.
pub const MAX_TOPIC_LEN: usize = 128;

/// Device identity as embedded in messages and used as MQTT client id.
pub type DeviceId = heapless::String<24>;

/// Session topic assigned by the backend.
pub type SessionTopic = heapless::String<MAX_TOPIC_LEN>;

/// `pairing/response/<deviceId>`.
pub type ResponseTopic = heapless::String<64>;

/// Build the response topic scoped to this device.
pub fn response_topic(device_id: &str) -> ResponseTopic {
    let mut topic = ResponseTopic::new();
    let _ = write!(topic, "{}{}", PAIRING_RESPONSE_PREFIX, device_id);
    topic
}

// ───────────────────────────────────────────────────────────────
// Outbound
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingRequest {
    pub device_id: DeviceId,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreAction {
    Increment,
    Decrement,
}

impl ScoreAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Increment => "increment",
            Self::Decrement => "decrement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub action: ScoreAction,
    pub team: u32,
    pub device_id: DeviceId,
    pub timestamp: u64,
}

impl ScoreEvent {
    pub fn new(action: ScoreAction, team: u32, device_id: DeviceId, timestamp: u64) -> Self {
        Self {
            kind: "score",
            action,
            team,
            device_id,
            timestamp,
        }
    }
}

/// Encode any outbound message as a JSON byte vector.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, MessageError> {
    serde_json::to_vec(msg).map_err(|_| MessageError::Encode)
}

// ───────────────────────────────────────────────────────────────
// Inbound
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPairingResponse {
    status: String,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    team: Option<i64>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Decoded pairing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingResponse {
    Accepted {
        topic: SessionTopic,
        team: u32,
        session_id: Option<String>,
    },
    Rejected {
        status: String,
        message: Option<String>,
    },
}

/// Decode and validate a payload received on the response topic.
pub fn decode_pairing_response(payload: &[u8]) -> Result<PairingResponse, MessageError> {
    let raw: RawPairingResponse =
        serde_json::from_slice(payload).map_err(|_| MessageError::Parse)?;

    if raw.status != "ok" {
        return Ok(PairingResponse::Rejected {
            status: raw.status,
            message: raw.message,
        });
    }

    let topic_str = raw.topic.ok_or(MessageError::MissingField("topic"))?;
    if topic_str.is_empty() {
        return Err(MessageError::InvalidField("topic"));
    }
    let mut topic = SessionTopic::new();
    topic
        .push_str(&topic_str)
        .map_err(|()| MessageError::InvalidField("topic"))?;

    let team = raw.team.ok_or(MessageError::MissingField("team"))?;
    let team = u32::try_from(team).map_err(|_| MessageError::InvalidField("team"))?;

    Ok(PairingResponse::Accepted {
        topic,
        team,
        session_id: raw.session_id,
    })
}
