//! # MLSD
//!
//! Machine-readable listings (RFC 3659): `fact=value;...; name`

use chrono::NaiveDateTime;
use lazy_regex::{Lazy, Regex};

use super::{DirectoryEntry, ListingParser, NodeType, ParseResult};

/// A line starting with a `fact=value;` pair
static MLSD_FACT_RE: Lazy<Regex> = lazy_regex!(r"^[A-Za-z0-9.\-]+=[^;]*;");

#[derive(Debug, Default, Clone, Copy)]
pub struct MlsdParser;

impl ListingParser for MlsdParser {
    fn test(&self, line: &str) -> bool {
        MLSD_FACT_RE.is_match(line)
    }

    fn parse(&self, line: &str) -> ParseResult {
        let (facts, name) = split_facts(line);
        let Some(name) = name.filter(|n| !n.is_empty()) else {
            trace!("MLSD line without a name: {line}");
            return Ok(None);
        };
        let mut node_type = NodeType::File;
        let mut size = 0;
        let mut modified = None;
        for fact in facts.split(';') {
            let Some((key, value)) = fact.split_once('=') else {
                continue;
            };
            match key.trim().to_lowercase().as_str() {
                "type" => {
                    node_type = match value.to_lowercase().as_str() {
                        "file" => NodeType::File,
                        "dir" => NodeType::Directory,
                        "cdir" | "pdir" => return Ok(None),
                        _ => NodeType::SymbolicLink,
                    }
                }
                "size" => size = value.trim().parse::<u64>().unwrap_or(0),
                "modify" => modified = parse_modify(value.trim()),
                _ => {}
            }
        }
        Ok(Some(DirectoryEntry::new(name, node_type, size, modified)))
    }
}

/// Split the facts from the name. The name follows the `"; "` separator; servers
/// omitting the space put it in the first token without `=`.
fn split_facts(line: &str) -> (&str, Option<&str>) {
    if let Some((facts, name)) = line.split_once("; ") {
        return (facts, Some(name));
    }
    let name = line
        .split(';')
        .map(str::trim)
        .find(|token| !token.is_empty() && !token.contains('='));
    (line, name)
}

/// `YYYYMMDDHHMMSS[.sss]`
fn parse_modify(value: &str) -> Option<NaiveDateTime> {
    let format = match value.contains('.') {
        true => "%Y%m%d%H%M%S%.f",
        false => "%Y%m%d%H%M%S",
    };
    NaiveDateTime::parse_from_str(value, format).ok()
}
