//! Application core: pure domain logic, zero I/O.
//!
//! Wire messages, the pairing-record codec, the transport session and the
//! [`service::DeviceState`] aggregate that ties them to the pairing FSM.
//! All interaction with hardware and the network happens through the
//! port traits in [`ports`], so this layer runs unchanged on the host.

pub mod events;
pub mod messages;
pub mod persistence;
pub mod ports;
pub mod service;
pub mod session;
