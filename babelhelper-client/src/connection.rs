//! Connection management.

use crate::error::ClientError;
use babelhelper_protocol::{decode_line, Encoder, LineDecoder, Message, DEFAULT_PORT, END_OF_BATCH};
use std::borrow::Cow;
use std::net::{Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Daemon address.
    pub addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Per-read timeout. `None` blocks until the daemon sends something.
    pub read_timeout: Option<Duration>,
    /// Size of a single socket read. Lines longer than this are still
    /// assembled across reads.
    pub read_buffer_size: usize,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    /// Targets the IPv6 loopback address on `port`.
    pub fn with_port(port: u16) -> Self {
        Self::new(SocketAddr::new(Ipv6Addr::LOCALHOST.into(), port))
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::with_port(DEFAULT_PORT)
    }
}

/// Lifecycle state of a [`Connection`].
///
/// Connecting and closed-by-caller have no representation: a `Connection`
/// only exists once the socket is up, and [`Connection::close`] consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Draining the daemon's banner.
    Syncing,
    /// Banner drained; commands and events flow.
    Ready,
    /// The stream is gone or out of step with the daemon. Reads and writes
    /// fail with `ConnectionClosed`.
    Closed,
}

/// A connection to the babel daemon's control socket.
///
/// Operations take `&mut self`; a connection serves one caller at a time.
pub struct Connection<S = TcpStream> {
    stream: S,
    /// Line framing over everything read so far.
    lines: LineDecoder,
    /// Scratch buffer for socket reads.
    read_buf: Vec<u8>,
    read_timeout: Option<Duration>,
    state: ConnectionState,
}

impl Connection<TcpStream> {
    /// Connects to the daemon on the IPv6 loopback address and drains its
    /// banner.
    pub async fn open(port: u16) -> Result<Self, ClientError> {
        Self::open_with_config(ConnectionConfig::with_port(port)).await
    }

    /// Connects using an explicit configuration and drains the banner.
    pub async fn open_with_config(config: ConnectionConfig) -> Result<Self, ClientError> {
        tracing::debug!("Connecting to {}...", config.addr);

        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(config.addr))
            .await
            .map_err(|_| {
                tracing::debug!("Connection timeout");
                ClientError::Timeout
            })?
            .map_err(|e| {
                tracing::debug!("Connection failed: {}", e);
                ClientError::Io(e)
            })?;

        stream.set_nodelay(true).ok();
        tracing::debug!("TCP connected");

        Self::handshake(stream, &config).await
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already connected stream and reads lines until the daemon
    /// signals the end of its banner.
    ///
    /// On failure the stream is dropped and no connection is returned.
    pub async fn handshake(stream: S, config: &ConnectionConfig) -> Result<Self, ClientError> {
        let mut conn = Self {
            stream,
            lines: LineDecoder::with_capacity(config.read_buffer_size),
            read_buf: vec![0u8; config.read_buffer_size],
            read_timeout: config.read_timeout,
            state: ConnectionState::Syncing,
        };

        tracing::debug!("Draining banner...");
        let mut banner_lines = 0usize;
        loop {
            let line = conn.next_line().await.map_err(|e| {
                tracing::debug!("Handshake failed after {} lines: {}", banner_lines, e);
                e
            })?;
            if line == END_OF_BATCH.as_bytes() {
                break;
            }
            tracing::debug!("banner: {}", String::from_utf8_lossy(line));
            banner_lines += 1;
        }

        conn.state = ConnectionState::Ready;
        tracing::debug!("Handshake complete ({} banner lines)", banner_lines);
        Ok(conn)
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns whether the banner has been drained and no stream failure has
    /// been seen since.
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// Writes `text` followed by a newline. Returns the number of bytes
    /// written.
    pub async fn write_line(&mut self, text: &str) -> Result<usize, ClientError> {
        if self.state == ConnectionState::Closed {
            return Err(ClientError::ConnectionClosed);
        }

        let encoded = Encoder::encode_command(text);
        tracing::debug!("Sending command {:?} ({} bytes)", text, encoded.len());

        if let Err(e) = self.write_all(&encoded).await {
            self.state = ConnectionState::Closed;
            return Err(ClientError::Io(e));
        }
        Ok(encoded.len())
    }

    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(buf).await?;
        self.stream.flush().await
    }

    /// Reads the next line as text, without its terminator. Bytes that are
    /// not UTF-8 are replaced with U+FFFD.
    ///
    /// The line borrows the connection's buffer and is gone after the next
    /// call. A clean end of stream is `ConnectionClosed`; a stream ending
    /// inside a line is a protocol error.
    pub async fn read_line(&mut self) -> Result<Cow<'_, str>, ClientError> {
        let line = self.next_line().await?;
        Ok(String::from_utf8_lossy(line))
    }

    /// Reads and decodes the next line.
    pub async fn read_event(&mut self) -> Result<Message<'_>, ClientError> {
        let line = self.next_line().await?;
        Ok(decode_line(line))
    }

    /// Marks the connection closed after a response was abandoned before its
    /// closing `ok`.
    pub(crate) fn abandon(&mut self) {
        if self.state != ConnectionState::Closed {
            tracing::debug!("Response abandoned mid-batch, closing connection");
            self.state = ConnectionState::Closed;
        }
    }

    async fn next_line(&mut self) -> Result<&[u8], ClientError> {
        if self.state == ConnectionState::Closed {
            return Err(ClientError::ConnectionClosed);
        }
        while !self.lines.find_line() {
            self.fill_buf().await?;
        }
        Ok(self.lines.current_line())
    }

    /// Reads one chunk from the stream into the line decoder.
    async fn fill_buf(&mut self) -> Result<(), ClientError> {
        let read = match self.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.stream.read(&mut self.read_buf))
                .await
                .map_err(|_| {
                    tracing::debug!("Read timeout");
                    ClientError::Timeout
                })?,
            None => self.stream.read(&mut self.read_buf).await,
        };

        let n = match read {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!("Read failed: {}", e);
                self.state = ConnectionState::Closed;
                return Err(ClientError::Io(e));
            }
        };

        if n == 0 {
            tracing::debug!("Connection closed by daemon");
            self.state = ConnectionState::Closed;
            self.lines.finish()?;
            return Err(ClientError::ConnectionClosed);
        }

        tracing::trace!("Read {} bytes", n);
        self.lines.extend(&self.read_buf[..n]);
        Ok(())
    }

    /// Shuts down the write side and releases the stream and its buffers.
    /// The stream is released even when the shutdown fails.
    pub async fn close(mut self) -> Result<(), ClientError> {
        tracing::debug!("Closing connection...");
        self.stream.shutdown().await?;
        tracing::debug!("Connection closed");
        Ok(())
    }
}
