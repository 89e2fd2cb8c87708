//! Unified error types for the bracelet firmware.
//!
//! Three families cover everything that can go wrong at runtime: the
//! messaging link, the content of inbound messages, and the flash store.
//! All variants are `Copy` so they can travel through the event sink and
//! the status LED without allocation. None of them is fatal; callers log,
//! indicate, and keep looping.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Connect or publish on the messaging link failed.
    TransportUnavailable(TransportError),
    /// An inbound message could not be decoded or lacks a required field.
    MalformedMessage(MessageError),
    /// Mount, read or write on the key-value store failed.
    StorageUnavailable(StorageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportUnavailable(e) => write!(f, "transport: {e}"),
            Self::MalformedMessage(e) => write!(f, "message: {e}"),
            Self::StorageUnavailable(e) => write!(f, "storage: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Broker refused or could not be reached.
    ConnectFailed,
    /// Operation attempted while the link is down.
    NotConnected,
    /// Broker did not accept the publish.
    PublishFailed,
    /// Broker did not accept the subscription.
    SubscribeFailed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::NotConnected => write!(f, "not connected"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::TransportUnavailable(e)
    }
}

// ---------------------------------------------------------------------------
// Message errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageError {
    /// Payload is not a JSON document of the expected shape.
    Parse,
    /// A field required for this status is absent.
    MissingField(&'static str),
    /// A field is present but carries an unusable value.
    InvalidField(&'static str),
    /// Outgoing message could not be encoded.
    Encode,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "unparsable payload"),
            Self::MissingField(name) => write!(f, "missing field '{name}'"),
            Self::InvalidField(name) => write!(f, "invalid field '{name}'"),
            Self::Encode => write!(f, "encode failed"),
        }
    }
}

impl From<MessageError> for Error {
    fn from(e: MessageError) -> Self {
        Self::MalformedMessage(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition could not be opened.
    MountFailed,
    /// Read returned an error.
    ReadFailed,
    /// Write or commit returned an error.
    WriteFailed,
    /// Storage partition is full.
    Full,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::MountFailed => write!(f, "mount failed"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::Full => write!(f, "storage full"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::StorageUnavailable(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
