//! # Types
//!
//! Errors, replies and the small value types shared across the engine

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::list::ParseError;
use crate::status::{ReplyClass, Status};

/// A shorthand for a Result whose error type is always an FtpError.
pub type FtpResult<T> = std::result::Result<T, FtpError>;

/// `FtpError` is a library-global error type to describe the different kinds of
/// errors that might occur while using FTP.
#[derive(Debug, Error)]
pub enum FtpError {
    /// Socket-level failure while connecting, reading or writing (timeouts included)
    #[error("Connection error: {0}")]
    ConnectionError(std::io::Error),
    /// The host could not be turned into a socket address
    #[error("Could not resolve '{host}': {reason}")]
    ResolutionError { host: String, reason: String },
    /// The server replied with a status the operation does not accept.
    /// Carries the reply and, where known, the command which was sent.
    #[error("Unexpected response{}: {response}", fmt_command(.command))]
    ProtocolError {
        command: Option<String>,
        response: Response,
    },
    /// The server rejected the credentials
    #[error("Authentication failed: {0}")]
    AuthenticationError(Response),
    /// The EPSV reply could not be turned into a data port
    #[error("Passive negotiation failed: {0}")]
    PassiveNegotiationError(String),
    /// Handshake or certificate failure, or an invalid encryption transition
    #[error("TLS error: {0}")]
    TlsError(String),
    /// A listing line violated its format
    #[error("Listing parse error: {0}")]
    ParseError(#[from] ParseError),
    /// The reply had the expected status, but its content is unusable
    #[error("Response contains an invalid syntax: {0}")]
    BadResponse(Response),
    /// The operation needs an authenticated session
    #[error("User must be logged in")]
    NotLoggedIn,
    /// The argument was rejected before reaching the wire
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

fn fmt_command(command: &Option<String>) -> String {
    command
        .as_deref()
        .map(|c| format!(" to `{c}`"))
        .unwrap_or_default()
}

/// A complete server reply.
///
/// `lines` holds every raw line that was read, continuation lines first and the
/// terminal `DDD message` line last.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    code: u32,
    message: String,
    lines: Vec<String>,
}

impl Response {
    /// Instantiates a new `Response`
    pub fn new(code: u32, message: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            code,
            message: message.into(),
            lines,
        }
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn status(&self) -> Status {
        Status::from(self.code)
    }

    pub fn class(&self) -> ReplyClass {
        ReplyClass::of(self.code)
    }

    /// Message of the terminal line
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether the server accepted the command (1xx to 3xx)
    pub fn is_success(&self) -> bool {
        self.class().is_success()
    }

    /// Whether the status is one of `expected`
    pub fn is_any(&self, expected: &[Status]) -> bool {
        let status = self.status();
        expected.iter().any(|s| *s == status)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Text encoding of the control channel and of listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Ascii,
    Utf8,
}

impl Encoding {
    /// Decode bytes; anything the encoding cannot represent becomes a replacement char
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Ascii => bytes
                .iter()
                .map(|b| if b.is_ascii() { char::from(*b) } else { '?' })
                .collect(),
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Self::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            Self::Utf8 => text.as_bytes().to_vec(),
        }
    }
}

/// Representation type requested with `TYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    #[default]
    Binary,
    Ascii,
}

impl TransferMode {
    fn code(&self) -> char {
        match self {
            Self::Binary => 'I',
            Self::Ascii => 'A',
        }
    }
}

/// Argument of the `TYPE` command: the mode plus an optional second type
/// character (e.g. `N` for non-print).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferType {
    pub mode: TransferMode,
    pub second_type: Option<char>,
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.second_type {
            Some(second) => write!(f, "{} {}", self.mode.code(), second),
            None => write!(f, "{}", self.mode.code()),
        }
    }
}

/// Features returned by FEAT command (key, maybe value)
pub type Features = HashMap<String, Option<String>>;
