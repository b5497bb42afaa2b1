//! # Command
//!
//! The set of FTP commands the engine sends on the control channel

pub mod feat;

use std::fmt;

use crate::types::TransferType;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Ftp commands with their arguments
pub enum Command {
    /// Set auth to TLS
    Auth,
    /// Tell the server the client name
    Clnt(String),
    /// Change working directory
    Cwd(String),
    /// Remove file at specified path
    Dele(String),
    /// Extended passive mode <https://www.rfc-editor.org/rfc/rfc2428#section-3>
    Epsv,
    /// List server features
    Feat,
    /// List entries at specified path. If path is not provided list entries at current working directory
    List(Option<String>),
    /// Make directory
    Mkd(String),
    /// Machine-readable listing of a directory
    Mlsd(Option<String>),
    /// Get the list of file names at specified path. If path is not provided list entries at current working directory
    Nlst(Option<String>),
    /// Set an option, with an optional value
    Opts(String, Option<String>),
    /// Provide login password
    Pass(String),
    /// Protection buffer size
    Pbsz(usize),
    /// Set protection level for protocol
    Prot(ProtectionLevel),
    /// Print working directory
    Pwd,
    /// Quit
    Quit,
    /// Select file to rename
    RenameFrom(String),
    /// Rename selected file to
    RenameTo(String),
    /// Retrieve file
    Retr(String),
    /// Remove directory
    Rmd(String),
    /// Get file size of specified path
    Size(String),
    /// Put file at specified path
    Store(String),
    /// Set transfer type
    Type(TransferType),
    /// Provide user to login as
    User(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(unused)]
/// Protection level; argument for `Prot` command
pub enum ProtectionLevel {
    Clear,
    Private,
}

impl Command {
    /// The verb, as sent on the wire
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Auth => "AUTH",
            Self::Clnt(_) => "CLNT",
            Self::Cwd(_) => "CWD",
            Self::Dele(_) => "DELE",
            Self::Epsv => "EPSV",
            Self::Feat => "FEAT",
            Self::List(_) => "LIST",
            Self::Mkd(_) => "MKD",
            Self::Mlsd(_) => "MLSD",
            Self::Nlst(_) => "NLST",
            Self::Opts(..) => "OPTS",
            Self::Pass(_) => "PASS",
            Self::Pbsz(_) => "PBSZ",
            Self::Prot(_) => "PROT",
            Self::Pwd => "PWD",
            Self::Quit => "QUIT",
            Self::RenameFrom(_) => "RNFR",
            Self::RenameTo(_) => "RNTO",
            Self::Retr(_) => "RETR",
            Self::Rmd(_) => "RMD",
            Self::Size(_) => "SIZE",
            Self::Store(_) => "STOR",
            Self::Type(_) => "TYPE",
            Self::User(_) => "USER",
        }
    }

    /// The single argument, if any
    pub fn argument(&self) -> Option<String> {
        match self {
            Self::Auth => Some("TLS".to_string()),
            Self::Epsv | Self::Feat | Self::Pwd | Self::Quit => None,
            Self::List(p) | Self::Mlsd(p) | Self::Nlst(p) => p.clone(),
            Self::Opts(option, value) => Some(match value {
                Some(value) => format!("{option} {value}"),
                None => option.clone(),
            }),
            Self::Pbsz(sz) => Some(sz.to_string()),
            Self::Prot(level) => Some(level.to_string()),
            Self::Type(t) => Some(t.to_string()),
            Self::Clnt(s)
            | Self::Cwd(s)
            | Self::Dele(s)
            | Self::Mkd(s)
            | Self::Pass(s)
            | Self::RenameFrom(s)
            | Self::RenameTo(s)
            | Self::Retr(s)
            | Self::Rmd(s)
            | Self::Size(s)
            | Self::Store(s)
            | Self::User(s) => Some(s.clone()),
        }
    }

    /// The command line without the trailing CRLF
    pub fn line(&self) -> String {
        match self.argument() {
            Some(arg) => format!("{} {}", self.verb(), arg),
            None => self.verb().to_string(),
        }
    }

    /// The command line as it may be written to logs
    pub fn redacted(&self) -> String {
        match self {
            Self::Pass(_) => "PASS *****".to_string(),
            _ => self.line(),
        }
    }
}

// -- stringify

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n", self.line())
    }
}

impl fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear => write!(f, "C"),
            Self::Private => write!(f, "P"),
        }
    }
}
