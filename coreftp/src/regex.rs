//! # FTP Regex
//!
//! Regular expressions to parse FTP response

use lazy_regex::{Lazy, Regex};

/// Matches the terminal line of a reply: three digits, a space, then the message
pub static REPLY_TERMINAL_RE: Lazy<Regex> = lazy_regex!(r"^(\d{3}) (.*)$");

/// This regex extract the port number from EPSV command response.
/// The regex looks for the pattern (|||port_number|)
pub static EPSV_PORT_RE: Lazy<Regex> = lazy_regex!(r"\(\|\|\|(\d+)\|\)");

/// Leading `total N` summary some servers print before a LIST payload
pub static LIST_TOTAL_RE: Lazy<Regex> = lazy_regex!(r"^total\s+\d+$");
