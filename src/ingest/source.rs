use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpStream,
    sync::mpsc,
};

/// Longest line [`TcpLineSource`] buffers by default.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Failures while talking to a message source.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Could not open the source.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Address dialed.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Read failed mid-stream.
    #[error("read from traffic source failed: {0}")]
    Read(#[from] std::io::Error),
    /// Read attempted before a successful connect.
    #[error("traffic source is not connected")]
    NotConnected,
    /// The source will never produce another message.
    #[error("traffic source exhausted")]
    Exhausted,
    /// One line was not UTF-8; the stream is still usable.
    #[error("traffic line is not valid UTF-8")]
    InvalidUtf8,
    /// One line ran past the length cap and was discarded; the stream is still usable.
    #[error("traffic line longer than {limit} bytes")]
    LineTooLong {
        /// Configured cap.
        limit: usize,
    },
}

impl IngestError {
    /// True when only the current message was bad and reading can go on.
    pub fn is_malformed_message(&self) -> bool {
        matches!(self, Self::InvalidUtf8 | Self::LineTooLong { .. })
    }
}

/// Stream of raw feed messages that can be (re)opened.
#[async_trait]
pub trait MessageSource: Send {
    /// Opens the stream, replacing any previous connection.
    async fn connect(&mut self) -> Result<(), IngestError>;

    /// Next raw message, or `Ok(None)` once the peer closes the stream.
    ///
    /// Must be cancel safe; the adapter races it against reset requests.
    async fn next_message(&mut self) -> Result<Option<String>, IngestError>;

    /// Drops the current connection, if any.
    async fn disconnect(&mut self) {}

    /// Human-readable origin for logs.
    fn describe(&self) -> String;
}

/// In-process source fed through an mpsc channel.
///
/// Reconnecting keeps reading the same channel; once every sender is gone the
/// source reports [`IngestError::Exhausted`] on the next connect.
pub struct ChannelSource {
    rx: mpsc::Receiver<String>,
    drained: bool,
}

impl ChannelSource {
    /// Source plus the sender that feeds it.
    pub fn new(capacity: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx, drained: false })
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn connect(&mut self) -> Result<(), IngestError> {
        if self.drained {
            return Err(IngestError::Exhausted);
        }
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<String>, IngestError> {
        let msg = self.rx.recv().await;
        if msg.is_none() {
            self.drained = true;
        }
        Ok(msg)
    }

    fn describe(&self) -> String {
        "channel".to_string()
    }
}

/// Newline-delimited JSON over TCP.
///
/// Lines that are not UTF-8 or exceed the length cap come back as
/// [`IngestError::is_malformed_message`] errors without closing the stream.
pub struct TcpLineSource {
    addr: String,
    max_line_bytes: usize,
    reader: Option<BufReader<TcpStream>>,
    line: Vec<u8>,
    overflowed: bool,
}

impl TcpLineSource {
    /// Source that dials `addr` on connect.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            reader: None,
            line: Vec::new(),
            overflowed: false,
        }
    }

    /// Overrides the per-line length cap.
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes.max(1);
        self
    }

    fn reset_line(&mut self) {
        self.line.clear();
        self.overflowed = false;
    }

    fn finish_line(&mut self) -> Result<Option<String>, IngestError> {
        if std::mem::take(&mut self.overflowed) {
            self.line.clear();
            return Err(IngestError::LineTooLong {
                limit: self.max_line_bytes,
            });
        }
        let bytes = std::mem::take(&mut self.line);
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| IngestError::InvalidUtf8)
    }
}

#[async_trait]
impl MessageSource for TcpLineSource {
    async fn connect(&mut self) -> Result<(), IngestError> {
        self.reader = None;
        self.reset_line();
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| IngestError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        self.reader = Some(BufReader::new(stream));
        Ok(())
    }

    // Partial lines live in `self.line` between polls, so dropping this
    // future mid-line loses nothing.
    async fn next_message(&mut self) -> Result<Option<String>, IngestError> {
        loop {
            let Some(reader) = self.reader.as_mut() else {
                return Err(IngestError::NotConnected);
            };
            let available = reader.fill_buf().await?;

            if available.is_empty() {
                if self.overflowed || !self.line.is_empty() {
                    return self.finish_line();
                }
                self.reader = None;
                return Ok(None);
            }

            let newline = available.iter().position(|b| *b == b'\n');
            let used = newline.map_or(available.len(), |i| i + 1);
            let content = &available[..newline.unwrap_or(used)];
            if !self.overflowed {
                if self.line.len() + content.len() > self.max_line_bytes {
                    self.overflowed = true;
                    self.line.clear();
                } else {
                    self.line.extend_from_slice(content);
                }
            }
            reader.consume(used);

            if newline.is_some() {
                return self.finish_line();
            }
        }
    }

    async fn disconnect(&mut self) {
        self.reader = None;
        self.reset_line();
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}
