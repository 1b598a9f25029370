//! Protocol error types.

use thiserror::Error;

/// Errors raised while framing the daemon's output into lines.
///
/// Content-level irregularities (unknown keywords, short lines, bytes that
/// are not UTF-8) are never errors; only framing and transport problems are.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("stream ended inside a line ({len} bytes without terminator)")]
    TruncatedLine { len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
