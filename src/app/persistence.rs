//! Pairing-record persistence.
//!
//! Serializes the single [`PairingRecord`] to JSON and stores it under
//! `bracelet/pairing` through the [`StoragePort`]. Only the topic and team
//! are written; `is_paired` is derived on load. Encoding is deterministic,
//! so saving the same record twice writes identical bytes.
//!
//! Loading never propagates a parse error: a corrupt, truncated or
//! incomplete record reads as [`StorageError::NotFound`] and the device
//! simply starts unpaired.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

use super::messages::{MAX_TOPIC_LEN, SessionTopic};
use super::ports::StoragePort;

pub const RECORD_NAMESPACE: &str = "bracelet";
pub const RECORD_KEY: &str = "pairing";

/// Largest encoded record: every topic byte escaped as `\u00XX`, plus
/// the keys and a `u32` team.
pub const MAX_RECORD_BYTES: usize = MAX_TOPIC_LEN * 6 + 48;

/// In-memory pairing state. Owned by the pairing controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PairingRecord {
    pub session_topic: SessionTopic,
    pub team_number: u32,
    pub is_paired: bool,
}

impl PairingRecord {
    /// A paired record, or `None` when `session_topic` is empty.
    pub fn paired(session_topic: SessionTopic, team_number: u32) -> Option<Self> {
        if session_topic.is_empty() {
            return None;
        }
        Some(Self {
            session_topic,
            team_number,
            is_paired: true,
        })
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// On-flash document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    session_topic: SessionTopic,
    team_number: u32,
}

/// Load the persisted record.
///
/// Missing, unreadable-as-JSON and semantically invalid records all come
/// back as `Err(NotFound)`. Other errors mean the store itself failed.
pub fn load(store: &impl StoragePort) -> Result<PairingRecord, StorageError> {
    let mut buf = [0u8; MAX_RECORD_BYTES];
    let len = store.read(RECORD_NAMESPACE, RECORD_KEY, &mut buf)?;

    let stored: StoredRecord = match serde_json::from_slice(&buf[..len]) {
        Ok(r) => r,
        Err(e) => {
            warn!("Persistence: discarding unreadable pairing record ({})", e);
            return Err(StorageError::NotFound);
        }
    };

    let record = PairingRecord::paired(stored.session_topic, stored.team_number).ok_or_else(|| {
        warn!("Persistence: discarding pairing record with empty topic");
        StorageError::NotFound
    })?;
    info!(
        "Persistence: loaded pairing (topic='{}', team={})",
        record.session_topic, record.team_number
    );
    Ok(record)
}

/// Persist `record`. Only paired records are meaningful on flash.
pub fn save(store: &mut impl StoragePort, record: &PairingRecord) -> Result<(), StorageError> {
    let stored = StoredRecord {
        session_topic: record.session_topic.clone(),
        team_number: record.team_number,
    };
    let bytes = serde_json::to_vec(&stored).map_err(|_| StorageError::WriteFailed)?;
    if bytes.len() > MAX_RECORD_BYTES {
        warn!("Persistence: encoded record too large ({} bytes)", bytes.len());
        return Err(StorageError::WriteFailed);
    }
    store.write(RECORD_NAMESPACE, RECORD_KEY, &bytes)?;
    info!("Persistence: pairing record saved ({} bytes)", bytes.len());
    Ok(())
}

/// Remove the persisted record (reset gesture).
pub fn clear(store: &mut impl StoragePort) -> Result<(), StorageError> {
    store.delete(RECORD_NAMESPACE, RECORD_KEY)?;
    info!("Persistence: pairing record erased");
    Ok(())
}
