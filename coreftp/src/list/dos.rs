//! # DOS
//!
//! Listings from IIS and other Windows servers:
//!
//! ```text
//! {DATE} {TIME} {<DIR> | SIZE} {FILENAME}
//! 10-19-20  03:19PM <DIR> pub
//! 04-08-14  03:09PM 403   readme.txt
//! ```

use chrono::NaiveDateTime;
use lazy_regex::{Lazy, Regex};

use super::{DirectoryEntry, ListingParser, NodeType, ParseResult};

/// DOS system regex to parse list output
static DOS_LS_RE: Lazy<Regex> =
    lazy_regex!(r#"^(\d{2}\-\d{2}\-\d{2}\s+\d{2}:\d{2}\s*[AP]M)\s+(<DIR>)?([\d,]*)\s+(.+)$"#);

#[derive(Debug, Default, Clone, Copy)]
pub struct DosParser;

impl ListingParser for DosParser {
    fn test(&self, line: &str) -> bool {
        DOS_LS_RE.is_match(line)
    }

    /// Lines which do not parse are skipped
    fn parse(&self, line: &str) -> ParseResult {
        let Some(metadata) = DOS_LS_RE.captures(line) else {
            trace!("Not a DOS listing line: {line}");
            return Ok(None);
        };
        let modified = parse_dostime(&metadata[1]);
        let (node_type, size) = match metadata.get(2) {
            Some(_) => (NodeType::Directory, 0),
            None => {
                let digits = metadata[3].replace(',', "");
                match digits.parse::<u64>() {
                    Ok(size) => (NodeType::File, size),
                    Err(_) => {
                        trace!("Bad size in DOS line: {line}");
                        return Ok(None);
                    }
                }
            }
        };
        Ok(Some(DirectoryEntry::new(
            metadata[4].to_string(),
            node_type,
            size,
            modified,
        )))
    }
}

/// Parse date time string in DOS representation ("%m-%d-%y %I:%M%p")
fn parse_dostime(tm: &str) -> Option<NaiveDateTime> {
    let mut tokens = tm.split_whitespace();
    let date = tokens.next()?;
    let time: String = tokens.collect();
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%m-%d-%y %I:%M%p").ok()
}
