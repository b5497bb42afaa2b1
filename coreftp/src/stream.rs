//! # Stream
//!
//! File transfers over a data channel

use std::pin::Pin;
use std::task::{Context, Poll};

use async_std::io::{Read, Write};

use crate::command::Command;
use crate::session::Session;
use crate::transport::Transport;
use crate::types::Response;
use crate::FtpResult;

/// An open download (RETR) or upload (STOR).
///
/// Read from it or write to it with the usual async io traits, then call
/// [`TransferStream::close`] to collect the server's final reply. The stream
/// holds the client for its whole life: no other command can be sent until
/// it is closed or dropped.
///
/// Dropping the stream without closing it aborts the transfer locally. The
/// next command first waits for the transfer's final reply and discards it.
pub struct TransferStream<'a> {
    session: Session<'a>,
    data: Transport,
    opening: Response,
    command: Command,
    closed: bool,
}

impl<'a> TransferStream<'a> {
    pub(crate) fn new(session: Session<'a>, data: Transport, opening: Response, command: Command) -> Self {
        Self {
            session,
            data,
            opening,
            command,
            closed: false,
        }
    }

    /// The preliminary reply the server sent when the transfer started
    pub fn opening_response(&self) -> &Response {
        &self.opening
    }

    /// Flush and close the data channel, then read the final control reply.
    ///
    /// Fails with `ProtocolError` if the final reply is not 2xx.
    pub async fn close(mut self) -> FtpResult<Response> {
        self.closed = true;
        debug!("Closing transfer stream for {}", self.command.verb());
        let closed = self.data.close().await;
        let response = self
            .session
            .finish_transfer(&self.command, self.opening.clone())
            .await?;
        closed?;
        debug!("Transfer completed: {response}");
        Ok(response)
    }
}

impl Drop for TransferStream<'_> {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                "Transfer stream for `{}` dropped without being closed",
                self.command.redacted()
            );
            self.data.disconnect();
            self.session.abandon_reply_of(&self.opening);
        }
    }
}

impl Read for TransferStream<'_> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.get_mut().data).poll_read(cx, buf)
    }
}

impl Write for TransferStream<'_> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.get_mut().data).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().data).poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().data).poll_close(cx)
    }
}
