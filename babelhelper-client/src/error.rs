//! Client error types.

use babelhelper_protocol::ProtocolError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timed out")]
    Timeout,
}

impl ClientError {
    /// Returns the OS error code behind an I/O failure, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            ClientError::Io(e) | ClientError::Protocol(ProtocolError::Io(e)) => e.raw_os_error(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_raw_os_error() {
        let err = ClientError::Io(io::Error::from_raw_os_error(111));
        assert_eq!(err.raw_os_error(), Some(111));
        assert_eq!(ClientError::ConnectionClosed.raw_os_error(), None);

        let err = ClientError::from(ProtocolError::Io(io::Error::from_raw_os_error(104)));
        assert_eq!(err.raw_os_error(), Some(104));
        assert_eq!(ClientError::Timeout.raw_os_error(), None);
    }
}
