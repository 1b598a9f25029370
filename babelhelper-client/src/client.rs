//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use babelhelper_protocol::{Message, OwnedEvent, END_OF_BATCH};
use std::borrow::Cow;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// High-level client for the babel daemon.
pub struct Client<S = TcpStream> {
    conn: Connection<S>,
}

impl Client<TcpStream> {
    /// Connects to the daemon and drains its banner.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ClientError> {
        Ok(Self::new(Connection::open_with_config(config).await?))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an open connection.
    pub fn new(conn: Connection<S>) -> Self {
        Self { conn }
    }

    /// Returns the underlying connection.
    pub fn connection(&mut self) -> &mut Connection<S> {
        &mut self.conn
    }

    /// Closes the connection.
    pub async fn close(self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    /// Reads events up to the closing `ok`. A batch cut short by an error
    /// leaves the connection closed.
    async fn collect_batch(&mut self) -> Result<Vec<OwnedEvent>, ClientError> {
        let mut events = Vec::new();
        loop {
            let next = self
                .conn
                .read_event()
                .await
                .map(|message| message.event().map(|event| event.to_owned_event()));
            match next {
                Ok(Some(event)) => events.push(event),
                Ok(None) => return Ok(events),
                Err(e) => {
                    self.conn.abandon();
                    return Err(e);
                }
            }
        }
    }

    /// Reads raw lines up to the closing `ok`, with the same error handling
    /// as [`collect_batch`](Self::collect_batch).
    async fn collect_lines(&mut self) -> Result<Vec<String>, ClientError> {
        let mut lines = Vec::new();
        loop {
            let next = self.conn.read_line().await.map(Cow::into_owned);
            match next {
                Ok(line) if line == END_OF_BATCH => return Ok(lines),
                Ok(line) => lines.push(line),
                Err(e) => {
                    self.conn.abandon();
                    return Err(e);
                }
            }
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Requests a full dump of the daemon's state.
    pub async fn dump(&mut self) -> Result<Vec<OwnedEvent>, ClientError> {
        self.conn.write_line("dump").await?;
        let events = self.collect_batch().await?;
        tracing::debug!("dump returned {} events", events.len());
        Ok(events)
    }

    /// Subscribes to live updates. Returns the initial dump the daemon sends
    /// before switching to incremental events; read those with
    /// [`next_event`](Self::next_event).
    pub async fn monitor(&mut self) -> Result<Vec<OwnedEvent>, ClientError> {
        self.conn.write_line("monitor").await?;
        self.collect_batch().await
    }

    /// Cancels a subscription. Events that were already in flight are
    /// discarded.
    pub async fn unmonitor(&mut self) -> Result<(), ClientError> {
        self.conn.write_line("unmonitor").await?;
        let discarded = self.collect_batch().await?.len();
        if discarded > 0 {
            tracing::debug!("unmonitor discarded {} in-flight events", discarded);
        }
        Ok(())
    }

    /// Sends an arbitrary command and returns the raw lines of its response,
    /// without the closing `ok`.
    pub async fn send(&mut self, command: &str) -> Result<Vec<String>, ClientError> {
        self.conn.write_line(command).await?;
        self.collect_lines().await
    }

    /// Reads the next event or end-of-batch marker.
    pub async fn next_event(&mut self) -> Result<Message<'_>, ClientError> {
        self.conn.read_event().await
    }
}
