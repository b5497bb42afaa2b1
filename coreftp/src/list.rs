//! # List
//!
//! This module exposes the parsers for directory listings.
//! There's no specification regarding the LIST command output, so it basically depends on the implementation of the
//! remote FTP server. MLSD output is machine-readable and always preferred when the server supports it.
//!
//! A listing is parsed as a whole: the first meaningful line is probed against each parser, in order
//! MLSD, Unix (`ls -l`) and DOS, and the first parser which accepts it is used for every line.
//!
//! ```rust
//! use coreftp::list::{parse_listing, NodeType};
//!
//! let lines = vec![
//!     "total 8".to_string(),
//!     "drwxr-xr-x 1 ftp ftp 0 Oct 08  2008 history".to_string(),
//!     "-r--r--r-- 1 ftp ftp 52 Oct 08  2008 readme.txt".to_string(),
//! ];
//! let entries = parse_listing(&lines).unwrap();
//! assert_eq!(entries.len(), 2);
//! assert_eq!(entries[0].node_type(), NodeType::Directory);
//! ```

mod dos;
mod mlsd;
mod unix;

use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

pub use self::dos::DosParser;
pub use self::mlsd::MlsdParser;
pub use self::unix::UnixParser;
use crate::command::Command;
use crate::regex::LIST_TOTAL_RE;

/// Kind of a node on the remote file system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    File,
    Directory,
    SymbolicLink,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "dir"),
            Self::SymbolicLink => write!(f, "link"),
        }
    }
}

/// Describes a node on the remote system.
/// This data type is returned in a collection after parsing a listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryEntry {
    name: String,
    node_type: NodeType,
    size: u64,
    modified: Option<NaiveDateTime>,
}

impl DirectoryEntry {
    pub fn new(
        name: impl Into<String>,
        node_type: NodeType,
        size: u64,
        modified: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            name: name.into(),
            node_type,
            size,
            modified,
        }
    }

    /// Entry name, relative to the listed directory
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Size in bytes; 0 when the server did not report it
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Last modification time, as reported by the server (no time zone)
    pub fn modified(&self) -> Option<NaiveDateTime> {
        self.modified
    }

    pub fn is_file(&self) -> bool {
        self.node_type == NodeType::File
    }

    pub fn is_directory(&self) -> bool {
        self.node_type == NodeType::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.node_type == NodeType::SymbolicLink
    }
}

// -- Error

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ParseError {
    #[error("Syntax error: invalid line")]
    SyntaxError,
    #[error("Invalid date")]
    InvalidDate,
    #[error("Bad file size")]
    BadSize,
    #[error("Unknown node type '{0}'")]
    UnknownNodeType(char),
}

pub type ParseResult = Result<Option<DirectoryEntry>, ParseError>;

/// A parser for one listing format
pub trait ListingParser {
    /// Whether `line` looks like this format
    fn test(&self, line: &str) -> bool;

    /// Parse a line. `Ok(None)` means the line carries no entry and is skipped.
    fn parse(&self, line: &str) -> ParseResult;
}

/// The command used to list a directory, chosen once at login from the server features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingStrategy {
    Mlsd,
    #[default]
    List,
}

impl ListingStrategy {
    pub(crate) fn command(&self, path: Option<String>) -> Command {
        match self {
            Self::Mlsd => Command::Mlsd(path),
            Self::List => Command::List(path),
        }
    }
}

/// Parse a complete listing.
///
/// Blank lines and a leading `total N` summary are ignored. When no parser
/// recognizes the first line, the listing is empty.
pub fn parse_listing<S: AsRef<str>>(lines: &[S]) -> Result<Vec<DirectoryEntry>, ParseError> {
    let mut lines = lines
        .iter()
        .map(|line| line.as_ref().trim_end_matches(['\r', '\n']))
        .filter(|line| !line.trim().is_empty())
        .peekable();
    if lines
        .peek()
        .map(|line| LIST_TOTAL_RE.is_match(line.trim()))
        .unwrap_or(false)
    {
        lines.next();
    }
    let Some(first) = lines.peek() else {
        return Ok(Vec::new());
    };
    let parsers: [&dyn ListingParser; 3] = [&MlsdParser, &UnixParser, &DosParser];
    let Some(parser) = parsers.into_iter().find(|parser| parser.test(first)) else {
        debug!("No parser recognizes listing line '{first}'");
        return Ok(Vec::new());
    };
    let mut entries = Vec::new();
    for line in lines {
        if let Some(entry) = parser.parse(line)? {
            trace!("Parsed {} '{}' ({} bytes)", entry.node_type, entry.name, entry.size);
            entries.push(entry);
        }
    }
    Ok(entries)
}
