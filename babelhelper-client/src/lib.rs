//! # babelhelper-client
//!
//! Client library for the babel routing daemon's local control socket.
//!
//! This crate provides:
//! - Connection setup with banner handshake
//! - Line-oriented command writes and event reads
//! - High-level helpers for `dump`, `monitor` and `unmonitor`

pub mod client;
pub mod connection;
pub mod error;

pub use babelhelper_protocol::{Event, EventType, Message, ObjectType, OwnedEvent, Param};
pub use client::Client;
pub use connection::{Connection, ConnectionConfig, ConnectionState};
pub use error::ClientError;
