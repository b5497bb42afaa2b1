//! # Control
//!
//! The control channel: commands out, replies in

use async_std::sync::{Mutex, MutexGuard};

use crate::command::Command;
use crate::regex::REPLY_TERMINAL_RE;
use crate::transport::Transport;
use crate::types::{Encoding, Response};
use crate::{FtpError, FtpResult};

/// The control connection, behind the receive lock.
///
/// The lock guards raw reads and writes only; command sequencing is up to the
/// session holding the client gate.
#[derive(Debug, Default)]
pub struct ControlChannel {
    transport: Mutex<Transport>,
}

impl ControlChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, Transport> {
        self.transport.lock().await
    }

    /// Write a command and read its reply.
    ///
    /// Replies already waiting on the socket belong to no command of ours and
    /// are discarded first.
    pub async fn execute(&self, command: &Command, encoding: Encoding) -> FtpResult<Response> {
        let mut transport = self.lock().await;
        while transport.has_pending_data().await {
            let stale = read_response(&mut transport, encoding).await?;
            warn!("Discarding stale response before {}: {stale}", command.verb());
        }
        trace!("CC OUT: {}", command.redacted());
        transport.write_line(encoding, &command.line()).await?;
        read_response(&mut transport, encoding).await
    }

    /// Read one reply without sending anything
    pub async fn read(&self, encoding: Encoding) -> FtpResult<Response> {
        let mut transport = self.lock().await;
        read_response(&mut transport, encoding).await
    }
}

/// Read lines until the terminal `DDD message` line of a reply
pub async fn read_response(transport: &mut Transport, encoding: Encoding) -> FtpResult<Response> {
    let mut lines = Vec::new();
    loop {
        let Some(line) = transport.read_line(encoding).await? else {
            return Err(FtpError::ConnectionError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed while reading response",
            )));
        };
        trace!("CC IN: {line}");
        let terminal = REPLY_TERMINAL_RE
            .captures(&line)
            .and_then(|caps| Some((caps[1].parse::<u32>().ok()?, caps[2].to_string())));
        lines.push(line);
        if let Some((code, message)) = terminal {
            return Ok(Response::new(code, message, lines));
        }
    }
}
