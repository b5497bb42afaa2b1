//! # Status
//!
//! Reply codes the engine reacts to, grouped by their RFC 959 reply class

use thiserror::Error;

#[derive(Debug, Copy, Clone, Error, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
/// Ftp status returned after command execution
pub enum Status {
    // 1xx: Positive Preliminary Reply
    #[error("restart marker reply")]
    RestartMarker = 110,
    #[error("service ready in (n) minutes")]
    ServiceReadyInMinutes = 120,
    #[error("data connection already open, transfer starting")]
    DataAlreadyOpen = 125,
    #[error("file status okay, about to open data connection")]
    OpeningData = 150,
    // 2xx: Positive Completion Reply
    #[error("command okay")]
    CommandOk = 200,
    #[error("command not implemented, superfluous at this site")]
    CommandSuperfluous = 202,
    #[error("system status, or system help reply")]
    SystemStatus = 211,
    #[error("file status")]
    FileStatus = 213,
    #[error("service ready for new user")]
    ServiceReady = 220,
    #[error("service closing control connection")]
    ClosingControl = 221,
    #[error("closing data connection")]
    ClosingData = 226,
    #[error("entering extended passive mode")]
    EnteringExtendedPassive = 229,
    #[error("user logged in, proceed")]
    LoggedInProceed = 230,
    #[error("security mechanism accepted")]
    AuthAccepted = 234,
    #[error("requested file action okay, completed")]
    FileActionOk = 250,
    #[error("pathname created")]
    PathnameCreated = 257,
    // 3xx: Positive Intermediate Reply
    #[error("user name okay, need password")]
    SendPasswordCommand = 331,
    #[error("requested file action pending further information")]
    FileActionPending = 350,
    // 4xx: Transient Negative Completion Reply
    #[error("service not available, closing control connection")]
    ServiceNotAvailable = 421,
    #[error("can't open data connection")]
    CantOpenData = 425,
    #[error("connection closed; transfer aborted")]
    TransferAborted = 426,
    #[error("requested action aborted; local error in processing")]
    LocalProcessingError = 451,
    // 5xx: Permanent Negative Completion Reply
    #[error("syntax error, command unrecognized")]
    CommandUnrecognized = 500,
    #[error("syntax error in parameters or arguments")]
    ArgumentSyntaxError = 501,
    #[error("command not implemented")]
    CommandNotImplemented = 502,
    #[error("bad sequence of commands")]
    BadCommandSequence = 503,
    #[error("not logged in")]
    NotLoggedIn = 530,
    #[error("requested action not taken; file unavailable")]
    FileUnavailable = 550,
    #[error("requested file action aborted; exceeded storage allocation")]
    ExceededStorage = 552,
    #[error("requested action not taken; file name not allowed")]
    BadFilename = 553,
    #[error("unknown reply code")]
    Unknown = 0,
}

/// The class of a reply, given by the first digit of its code
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReplyClass {
    PositivePreliminary,
    PositiveCompletion,
    PositiveIntermediate,
    TransientNegative,
    PermanentNegative,
    Invalid,
}

impl Status {
    /// Get status code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get status description
    pub fn desc(&self) -> String {
        self.to_string()
    }
}

impl ReplyClass {
    /// Classify a raw reply code
    pub fn of(code: u32) -> Self {
        match code / 100 {
            1 => Self::PositivePreliminary,
            2 => Self::PositiveCompletion,
            3 => Self::PositiveIntermediate,
            4 => Self::TransientNegative,
            5 => Self::PermanentNegative,
            _ => Self::Invalid,
        }
    }

    /// 1xx, 2xx and 3xx replies mean the server accepted the command
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::PositivePreliminary | Self::PositiveCompletion | Self::PositiveIntermediate
        )
    }
}

impl From<u32> for Status {
    fn from(code: u32) -> Self {
        match code {
            110 => Self::RestartMarker,
            120 => Self::ServiceReadyInMinutes,
            125 => Self::DataAlreadyOpen,
            150 => Self::OpeningData,
            200 => Self::CommandOk,
            202 => Self::CommandSuperfluous,
            211 => Self::SystemStatus,
            213 => Self::FileStatus,
            220 => Self::ServiceReady,
            221 => Self::ClosingControl,
            226 => Self::ClosingData,
            229 => Self::EnteringExtendedPassive,
            230 => Self::LoggedInProceed,
            234 => Self::AuthAccepted,
            250 => Self::FileActionOk,
            257 => Self::PathnameCreated,
            331 => Self::SendPasswordCommand,
            350 => Self::FileActionPending,
            421 => Self::ServiceNotAvailable,
            425 => Self::CantOpenData,
            426 => Self::TransferAborted,
            451 => Self::LocalProcessingError,
            500 => Self::CommandUnrecognized,
            501 => Self::ArgumentSyntaxError,
            502 => Self::CommandNotImplemented,
            503 => Self::BadCommandSequence,
            530 => Self::NotLoggedIn,
            550 => Self::FileUnavailable,
            552 => Self::ExceededStorage,
            553 => Self::BadFilename,
            _ => Self::Unknown,
        }
    }
}
