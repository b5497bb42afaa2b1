//! # Unix
//!
//! `ls -l` style listings

use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use lazy_regex::{Lazy, Regex};

use super::{DirectoryEntry, ListingParser, NodeType, ParseError, ParseResult};

/// Captures permissions, link count, owner, group, size, date and the name
static UNIX_LS_RE: Lazy<Regex> = lazy_regex!(
    r"^(\S+)\s+(\d+)\s+(\S+)\s+(\S+)\s+(\d+)\s+(\w{3}\s+\d{1,2}\s+(?:\d{1,2}:\d{2}|\d{4}))\s+(.*)$"
);

#[derive(Debug, Default, Clone, Copy)]
pub struct UnixParser;

impl ListingParser for UnixParser {
    fn test(&self, line: &str) -> bool {
        UNIX_LS_RE.is_match(line)
    }

    fn parse(&self, line: &str) -> ParseResult {
        let Some(metadata) = UNIX_LS_RE.captures(line) else {
            trace!("Not a unix listing line: {line}");
            return Ok(None);
        };
        let node_type = match metadata[1].chars().next() {
            Some('d') => NodeType::Directory,
            Some('-') | Some('s') => NodeType::File,
            Some('l') => NodeType::SymbolicLink,
            Some(other) => return Err(ParseError::UnknownNodeType(other)),
            None => return Err(ParseError::SyntaxError),
        };
        let size = metadata[5]
            .parse::<u64>()
            .map_err(|_| ParseError::BadSize)?;
        let modified = parse_lstime(&metadata[6]);
        if modified.is_none() {
            debug!("Could not parse date '{}' of '{line}'", &metadata[6]);
        }
        let mut name = &metadata[7];
        if node_type == NodeType::SymbolicLink {
            if let Some((link, _target)) = name.split_once(" -> ") {
                name = link;
            }
        }
        if name == "." || name == ".." {
            return Ok(None);
        }
        Ok(Some(DirectoryEntry::new(name, node_type, size, modified)))
    }
}

/// ls time has two possible syntaxes:
/// 1. if year is current: `Mon DD HH:MM` (e.g. Nov 5 13:46)
/// 2. else: `Mon DD YYYY` (e.g. Nov 5 2019), at midnight
fn parse_lstime(tm: &str) -> Option<NaiveDateTime> {
    let mut tokens = tm.split_whitespace();
    let month = month_number(tokens.next()?)?;
    let day = tokens.next()?.parse::<u32>().ok()?;
    let year_or_time = tokens.next()?;
    let (year, hour, minute) = match year_or_time.split_once(':') {
        Some((hour, minute)) => (
            Utc::now().year(),
            hour.parse::<u32>().ok()?,
            minute.parse::<u32>().ok()?,
        ),
        None => (year_or_time.parse::<i32>().ok()?, 0, 0),
    };
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

fn month_number(month: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let month = month.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == month)
        .map(|index| index as u32 + 1)
}

#[cfg(test)]
mod test {

    use pretty_assertions::assert_eq;

    use super::*;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(hour, minute, 0))
    }

    fn this_year(month: u32, day: u32, hour: u32, minute: u32) -> Option<NaiveDateTime> {
        at(Utc::now().year(), month, day, hour, minute)
    }

    #[test]
    fn should_parse_listing_table() {
        let table = [
            (
                "-rwx---A--  1 user    group       392468 Nov 13 07:20 Group-2~20121112_0020BD3001000614.uhh",
                NodeType::File,
                392468,
                this_year(11, 13, 7, 20),
                "Group-2~20121112_0020BD3001000614.uhh",
            ),
            (
                "-rwx----S-  1 user    group         9702 Jan 23 15:23 Group-1~20130123_0196EE300000005D.uhh",
                NodeType::File,
                9702,
                this_year(1, 23, 15, 23),
                "Group-1~20130123_0196EE300000005D.uhh",
            ),
            (
                "-rw-rw-r--    1 1000     1000         5647 Nov 14 16:03 Furnace-1~~20080630_00208930000034A0.uhh",
                NodeType::File,
                5647,
                this_year(11, 14, 16, 3),
                "Furnace-1~~20080630_00208930000034A0.uhh",
            ),
            (
                "-r--r--r-- 1 ftp ftp             52 Nov 08 20:15 Batches~Batch-1~20000101_0001acxx4105000001.uhh",
                NodeType::File,
                52,
                this_year(11, 8, 20, 15),
                "Batches~Batch-1~20000101_0001acxx4105000001.uhh",
            ),
            (
                "drwxr-xr-x 1 ftp ftp              0 Nov 08 20:15 history",
                NodeType::Directory,
                0,
                this_year(11, 8, 20, 15),
                "history",
            ),
            (
                "-rwx------  1 user    group         1171 Oct  3  2011 FD8~20111003_801C5826000007EB.uhh",
                NodeType::File,
                1171,
                at(2011, 10, 3, 0, 0),
                "FD8~20111003_801C5826000007EB.uhh",
            ),
            (
                "drwxrwxr-x    3 1000     1000         4096 Aug 08 09:09 ÷¿¡¥¢{$&GS",
                NodeType::Directory,
                4096,
                this_year(8, 8, 9, 9),
                "÷¿¡¥¢{$&GS",
            ),
            (
                "drwxrwxr-x    3 1000     1000         4096 Aug 08 09:09 密码౱㙔㥓戀氀欀",
                NodeType::Directory,
                4096,
                this_year(8, 8, 9, 9),
                "密码౱㙔㥓戀氀欀",
            ),
            (
                "drwxr-xr-x 1 ftp ftp              0 Oct 08  2008 347Arch",
                NodeType::Directory,
                0,
                at(2008, 10, 8, 0, 0),
                "347Arch",
            ),
            // IIS, single digit hours
            (
                "-r-xr-xr-x   1 owner    group           14271 May  3  2:24 02001318~01488A2402001318.UHH",
                NodeType::File,
                14271,
                this_year(5, 3, 2, 24),
                "02001318~01488A2402001318.UHH",
            ),
            (
                "dr-xr-xr-x   1 owner    group               0 Jun  4  9:21 EYCON_40",
                NodeType::Directory,
                0,
                this_year(6, 4, 9, 21),
                "EYCON_40",
            ),
            // Baby FTP, two spaces before the name
            (
                "-rwx------ 1 user group         400366 Jan 04 2011  DoncastersNo-417~816~20110103_00F1ED300000087D.uhh",
                NodeType::File,
                400366,
                at(2011, 1, 4, 0, 0),
                "DoncastersNo-417~816~20110103_00F1ED300000087D.uhh",
            ),
        ];
        for (line, node_type, size, modified, name) in table {
            let entry = UnixParser.parse(line).unwrap().unwrap();
            assert_eq!(entry.node_type(), node_type, "{line}");
            assert_eq!(entry.size(), size, "{line}");
            assert_eq!(entry.modified(), modified, "{line}");
            assert_eq!(entry.name(), name, "{line}");
        }
    }

    #[test]
    fn should_strip_symlink_target() {
        let entry = UnixParser
            .parse("lrwxrwxrwx 1 root root 7 Oct 08  2008 bin -> usr/bin")
            .unwrap()
            .unwrap();
        assert_eq!(entry.node_type(), NodeType::SymbolicLink);
        assert_eq!(entry.name(), "bin");
    }

    #[test]
    fn should_treat_socket_as_file() {
        let entry = UnixParser
            .parse("srwxrwxrwx 1 root root 0 Oct 08  2008 agent.sock")
            .unwrap()
            .unwrap();
        assert_eq!(entry.node_type(), NodeType::File);
    }

    #[test]
    fn should_skip_dot_entries_and_garbage() {
        assert_eq!(
            UnixParser
                .parse("drwxr-xr-x 1 ftp ftp 0 Oct 08  2008 .")
                .unwrap(),
            None
        );
        assert_eq!(
            UnixParser
                .parse("drwxr-xr-x 1 ftp ftp 0 Oct 08  2008 ..")
                .unwrap(),
            None
        );
        assert_eq!(UnixParser.parse("total 12").unwrap(), None);
    }

    #[test]
    fn should_reject_unknown_node_type() {
        assert_eq!(
            UnixParser
                .parse("crw-rw-rw- 1 root root 0 Oct 08  2008 null")
                .unwrap_err(),
            ParseError::UnknownNodeType('c')
        );
    }

    #[test]
    fn should_leave_invalid_dates_empty() {
        let entry = UnixParser
            .parse("-rw-r--r-- 1 root root 10 Feb 31 2018 bad.txt")
            .unwrap()
            .unwrap();
        assert_eq!(entry.modified(), None);
    }

    #[test]
    fn should_parse_lstime() {
        assert_eq!(parse_lstime("Nov 5 2019"), at(2019, 11, 5, 0, 0));
        assert_eq!(parse_lstime("Nov  5 13:46"), this_year(11, 5, 13, 46));
        assert_eq!(parse_lstime("Foo 5 2019"), None);
    }
}
