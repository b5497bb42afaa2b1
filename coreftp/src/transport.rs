//! # Transport
//!
//! A byte stream over a TCP socket, optionally upgraded to TLS.
//!
//! The same type backs the control channel and every data channel. Every
//! blocking operation is bounded by the timeout given at connect time.

mod data_stream;
pub mod tls;

use std::future::Future;
use std::net::{Shutdown, SocketAddr};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use async_std::io::{BufReader, Read, Write};
use async_std::net::TcpStream;
use futures_lite::future::poll_once;
use futures_lite::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};

pub use data_stream::DataStream;
pub use tls::{NativeTlsConnector, TlsConnector, TlsSettings, TlsStream};

use crate::types::Encoding;
use crate::{FtpError, FtpResult};

/// Inactivity after which `is_connected` probes the socket
const LIVENESS_IDLE: Duration = Duration::from_secs(15);
/// Idle time before the kernel starts sending keep-alive probes
const KEEPALIVE_TIME: Duration = Duration::from_secs(60);
/// Chunk size used when draining a data channel
const READ_CHUNK: usize = 8192;

#[derive(Debug)]
pub struct Transport {
    stream: Option<BufReader<DataStream>>,
    timeout: Option<Duration>,
    last_activity: Instant,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self {
            stream: None,
            timeout: None,
            last_activity: Instant::now(),
        }
    }

    /// Open a TCP connection to `addr`, with keep-alive enabled.
    ///
    /// `timeout` bounds the connect and, from then on, every read and write.
    pub async fn connect(&mut self, addr: SocketAddr, timeout: Option<Duration>) -> FtpResult<()> {
        self.disconnect();
        debug!("Connecting to {addr}");
        let stream = bounded(timeout, TcpStream::connect(addr))
            .await
            .map_err(FtpError::ConnectionError)?;
        if let Err(err) = enable_keepalive(&stream) {
            warn!("Could not enable TCP keep-alive: {err}");
        }
        self.stream = Some(BufReader::new(DataStream::Tcp(stream)));
        self.timeout = timeout;
        self.touch();
        debug!("Established connection with {addr}");
        Ok(())
    }

    /// Wrap the connected stream in TLS.
    ///
    /// Fails if there is no stream or if it is already encrypted. A failed
    /// handshake leaves the transport disconnected.
    pub async fn upgrade_to_tls(
        &mut self,
        domain: &str,
        connector: &dyn TlsConnector,
    ) -> FtpResult<()> {
        let reader = match self.stream.take() {
            None => {
                return Err(FtpError::TlsError(
                    "cannot activate encryption: not connected".to_string(),
                ))
            }
            Some(reader) if reader.get_ref().is_tls() => {
                self.stream = Some(reader);
                return Err(FtpError::TlsError(
                    "cannot activate encryption: already encrypted".to_string(),
                ));
            }
            Some(reader) => reader,
        };
        if !reader.buffer().is_empty() {
            warn!(
                "Discarding {} unread bytes before the TLS handshake",
                reader.buffer().len()
            );
        }
        let tcp = match reader.into_inner() {
            DataStream::Tcp(tcp) => tcp,
            DataStream::Tls(_) => {
                return Err(FtpError::TlsError(
                    "cannot activate encryption: already encrypted".to_string(),
                ))
            }
        };
        debug!("Starting TLS handshake with {domain}");
        let handshake = connector.connect(domain, tcp);
        let tls = match self.timeout {
            Some(timeout) => async_std::future::timeout(timeout, handshake)
                .await
                .map_err(|_| FtpError::TlsError("TLS handshake timed out".to_string()))??,
            None => handshake.await?,
        };
        self.stream = Some(BufReader::new(DataStream::Tls(tls)));
        self.touch();
        debug!("TLS OK");
        Ok(())
    }

    pub fn is_encrypted(&self) -> bool {
        self.stream
            .as_ref()
            .map(|reader| reader.get_ref().is_tls())
            .unwrap_or(false)
    }

    /// Read one line, without its `\r\n`. `None` at EOF.
    pub async fn read_line(&mut self, encoding: Encoding) -> FtpResult<Option<String>> {
        let timeout = self.timeout;
        let reader = self.stream.as_mut().ok_or_else(not_connected)?;
        let mut line = Vec::new();
        let read = bounded(timeout, reader.read_until(b'\n', &mut line))
            .await
            .map_err(FtpError::ConnectionError)?;
        self.touch();
        if read == 0 {
            return Ok(None);
        }
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        Ok(Some(encoding.decode(&line)))
    }

    /// Write `text` followed by `\r\n`
    pub async fn write_line(&mut self, encoding: Encoding, text: &str) -> FtpResult<()> {
        let timeout = self.timeout;
        let mut bytes = encoding.encode(text);
        bytes.extend_from_slice(b"\r\n");
        let stream = self.stream.as_mut().ok_or_else(not_connected)?.get_mut();
        bounded(timeout, async {
            stream.write_all(&bytes).await?;
            stream.flush().await
        })
        .await
        .map_err(FtpError::ConnectionError)?;
        self.touch();
        Ok(())
    }

    /// Read until EOF or until `limit` has elapsed.
    ///
    /// Returns the bytes and whether EOF was reached; when the limit elapses the
    /// partial payload is returned.
    pub async fn read_to_end(&mut self, limit: Option<Duration>) -> FtpResult<(Vec<u8>, bool)> {
        let started = Instant::now();
        let reader = self.stream.as_mut().ok_or_else(not_connected)?;
        let mut payload = Vec::new();
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let remaining = limit.map(|limit| limit.saturating_sub(started.elapsed()));
            if remaining == Some(Duration::ZERO) {
                return Ok((payload, false));
            }
            match bounded(remaining, reader.read(&mut chunk)).await {
                Ok(0) => break,
                Ok(read) => payload.extend_from_slice(&chunk[..read]),
                Err(err) if err.kind() == std::io::ErrorKind::TimedOut => {
                    return Ok((payload, false));
                }
                Err(err) => return Err(FtpError::ConnectionError(err)),
            }
        }
        self.touch();
        Ok((payload, true))
    }

    /// Liveness check.
    ///
    /// After 15 seconds without traffic the socket is peeked without blocking:
    /// EOF or an error means the peer is gone. This is a best-effort heuristic;
    /// a dead peer may still go unnoticed until the next read times out.
    pub async fn is_connected(&mut self) -> bool {
        let socket = match self.stream.as_ref() {
            None => return false,
            Some(reader)
                if self.last_activity.elapsed() < LIVENESS_IDLE || !reader.buffer().is_empty() =>
            {
                return true
            }
            Some(reader) => reader.get_ref().get_ref().clone(),
        };
        let mut probe = [0u8; 1];
        let alive = match poll_once(socket.peek(&mut probe)).await {
            Some(Ok(0)) => {
                debug!("Peer closed the connection");
                false
            }
            Some(Err(err)) => {
                debug!("Liveness probe failed: {err}");
                false
            }
            Some(Ok(_)) | None => true,
        };
        if alive {
            self.touch();
        } else {
            self.disconnect();
        }
        alive
    }

    /// Whether decoded bytes are waiting to be read, checked without blocking.
    /// Best-effort: data still in flight is not seen.
    pub async fn has_pending_data(&mut self) -> bool {
        let Some(reader) = self.stream.as_mut() else {
            return false;
        };
        matches!(poll_once(reader.fill_buf()).await, Some(Ok(buf)) if !buf.is_empty())
    }

    /// Flush and close the write half (sending TLS close_notify), then disconnect
    pub async fn close(&mut self) -> FtpResult<()> {
        let timeout = self.timeout;
        let result = match self.stream.as_mut() {
            Some(reader) => bounded(timeout, reader.get_mut().close()).await,
            None => Ok(()),
        };
        self.disconnect();
        result.map_err(FtpError::ConnectionError)
    }

    /// Shut down both directions and drop the stream. Idempotent, never fails.
    pub fn disconnect(&mut self) {
        if let Some(reader) = self.stream.take() {
            if let Err(err) = reader.get_ref().get_ref().shutdown(Shutdown::Both) {
                trace!("Shutdown failed: {err}");
            }
            debug!("Transport disconnected");
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

impl Read for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        this.last_activity = Instant::now();
        match this.stream.as_mut() {
            Some(reader) => Pin::new(reader).poll_read(cx, buf),
            None => Poll::Ready(Err(not_connected_io())),
        }
    }
}

impl Write for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        this.last_activity = Instant::now();
        match this.stream.as_mut() {
            Some(reader) => Pin::new(reader.get_mut()).poll_write(cx, buf),
            None => Poll::Ready(Err(not_connected_io())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut().stream.as_mut() {
            Some(reader) => Pin::new(reader.get_mut()).poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut().stream.as_mut() {
            Some(reader) => Pin::new(reader.get_mut()).poll_close(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}

/// Run `fut`, failing with `TimedOut` once `timeout` elapses
async fn bounded<F, T>(timeout: Option<Duration>, fut: F) -> std::io::Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match timeout {
        Some(timeout) => async_std::io::timeout(timeout, fut).await,
        None => fut.await,
    }
}

#[cfg(unix)]
fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use std::os::fd::{AsRawFd, BorrowedFd};
    // SAFETY: the descriptor is owned by `stream`, which outlives the borrow
    let fd = unsafe { BorrowedFd::borrow_raw(stream.as_raw_fd()) };
    set_keepalive(socket2::SockRef::from(&fd))
}

#[cfg(windows)]
fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use std::os::windows::io::{AsRawSocket, BorrowedSocket};
    // SAFETY: the socket is owned by `stream`, which outlives the borrow
    let socket = unsafe { BorrowedSocket::borrow_raw(stream.as_raw_socket()) };
    set_keepalive(socket2::SockRef::from(&socket))
}

#[cfg(not(any(unix, windows)))]
fn enable_keepalive(_stream: &TcpStream) -> std::io::Result<()> {
    Ok(())
}

#[cfg(any(unix, windows))]
fn set_keepalive(socket: socket2::SockRef<'_>) -> std::io::Result<()> {
    socket.set_tcp_keepalive(&socket2::TcpKeepalive::new().with_time(KEEPALIVE_TIME))
}

fn not_connected_io() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "transport is not connected")
}

fn not_connected() -> FtpError {
    FtpError::ConnectionError(not_connected_io())
}
