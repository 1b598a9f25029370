//! # babelhelper-protocol
//!
//! Decoder for the babel routing daemon's local control protocol.
//!
//! This crate provides:
//! - Sorted keyword tables for event verbs, object types and parameters
//! - Line framing over partial reads
//! - Tolerant event decoding into borrowed, fixed-shape records
//! - MAC / EUI-64 IPv6 address conversions

pub mod address;
pub mod codec;
pub mod error;
pub mod event;
pub mod keyword;

pub use codec::{decode_event, decode_line, Encoder, LineDecoder, Message, END_OF_BATCH};
pub use error::ProtocolError;
pub use event::{Event, OwnedEvent};
pub use keyword::{EventType, ObjectType, Param};

/// Default port of the babeld local control interface.
pub const DEFAULT_PORT: u16 = 33123;
