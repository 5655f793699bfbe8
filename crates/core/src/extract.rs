//! Marker-relative field extraction.
//!
//! Every extractor is a total function over a line: any missing marker, out of range
//! offset or unexpected payload yields `None`, never an error.

use std::sync::OnceLock;

use regex::Regex;

const INDIVIDUAL_SUFFIX: &str = "@c.us";
const GROUP_SUFFIX: &str = "@g.us";

/// Locate `anchor`, move `offset` bytes from its start, and take everything up to the
/// next `delimiter`. The delimiter search begins one byte past the start position, so
/// the slice is never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub anchor: &'static str,
    pub offset: isize,
    pub delimiter: u8,
}

impl Slice {
    pub const fn new(anchor: &'static str, offset: isize, delimiter: u8) -> Self {
        Self {
            anchor,
            offset,
            delimiter,
        }
    }

    pub fn apply<'a>(&self, line: &'a str) -> Option<&'a str> {
        let anchor_pos = line.find(self.anchor)?;
        let start = anchor_pos.checked_add_signed(self.offset)?;
        let bytes = line.as_bytes();
        if start >= bytes.len() {
            return None;
        }
        let search_from = start + 1;
        let end = bytes[search_from..]
            .iter()
            .position(|&b| b == self.delimiter)
            .map(|i| search_from + i)?;
        line.get(start..end)
    }
}

pub const HOSTNAME: Slice = Slice::new("hostname", 11, b'"');

/// How the value of a category's field is derived from a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldExtractor {
    /// The sliced text as is.
    Literal(Slice),
    /// `true` / `false` payload combined with the contact number.
    BlockToggle(Slice),
    GroupAction(Slice),
    StatusAction(Slice),
    ReadOrDelete,
    SendMedia,
    ReceiveMedia,
}

impl FieldExtractor {
    pub fn extract(&self, line: &str) -> Option<String> {
        match self {
            FieldExtractor::Literal(slice) => slice.apply(line).map(str::to_string),
            FieldExtractor::BlockToggle(slice) => block_toggle(slice, line),
            FieldExtractor::GroupAction(slice) => group_action(slice, line),
            FieldExtractor::StatusAction(slice) => status_action(slice, line),
            FieldExtractor::ReadOrDelete => read_or_delete(line),
            FieldExtractor::SendMedia => send_media(line),
            FieldExtractor::ReceiveMedia => receive_media(line),
        }
    }
}

fn timestamp_regex() -> &'static Regex {
    static TIMESTAMP: OnceLock<Regex> = OnceLock::new();
    TIMESTAMP.get_or_init(|| {
        Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}").expect("timestamp pattern compiles")
    })
}

/// First `YYYY-MM-DD HH:MM:SS.mmm` in the line.
pub fn timestamp(line: &str) -> Option<String> {
    timestamp_regex().find(line).map(|m| m.as_str().to_string())
}

pub fn hostname(line: &str) -> Option<String> {
    HOSTNAME.apply(line).map(str::to_string)
}

/// Contact number: the 13 bytes before `@c.us`, digits only, leading zeros removed.
pub fn individual_number(line: &str) -> Option<String> {
    if line.len() <= 10 {
        return None;
    }
    number_before(line, INDIVIDUAL_SUFFIX, 13, 0)
}

/// Group id: bytes 23 to 11 before `@g.us`, digits only, leading zeros removed.
pub fn group_number(line: &str) -> Option<String> {
    number_before(line, GROUP_SUFFIX, 23, 11)
}

fn number_before(line: &str, marker: &str, from_back: usize, to_back: usize) -> Option<String> {
    let pos = line.find(marker)?;
    let start = pos.saturating_sub(from_back);
    let end = pos.saturating_sub(to_back);
    let digits: String = line.as_bytes()[start..end]
        .iter()
        .filter(|b| b.is_ascii_digit())
        .map(|&b| char::from(b))
        .collect();
    normalize_digits(&digits)
}

/// Integer form of a digit string. An all-zero string is the present value `"0"`.
pub fn normalize_digits(digits: &str) -> Option<String> {
    if digits.is_empty() {
        return None;
    }
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        Some("0".to_string())
    } else {
        Some(trimmed.to_string())
    }
}

fn block_toggle(slice: &Slice, line: &str) -> Option<String> {
    let verb = match slice.apply(line)? {
        "true" => "blocked",
        "false" => "unblocked",
        _ => return None,
    };
    individual_number(line).map(|n| format!("{} {}", n, verb))
}

fn group_action(slice: &Slice, line: &str) -> Option<String> {
    match slice.apply(line) {
        Some("create") => Some("group created".to_string()),
        Some("delete") => Some("group deleted".to_string()),
        _ if line.contains(INDIVIDUAL_SUFFIX) => {
            individual_number(line).map(|n| format!("Participant added: {}", n))
        }
        _ => None,
    }
}

fn status_action(slice: &Slice, line: &str) -> Option<String> {
    if slice.apply(line) == Some("set") {
        return Some("Suspect modified ABOUT".to_string());
    }
    if line.contains("read") {
        return individual_number(line).map(|n| format!("Suspect read story of: {}", n));
    }
    None
}

fn read_or_delete(line: &str) -> Option<String> {
    if line.contains("read") {
        individual_number(line).map(|n| format!("Read msg from: {}", n))
    } else if line.contains("delete") {
        group_number(line).map(|n| format!("Delete msg of: {}", n))
    } else {
        None
    }
}

fn send_media(line: &str) -> Option<String> {
    if line.contains(INDIVIDUAL_SUFFIX) {
        individual_number(line).map(|n| format!("Message sent individually: {}", n))
    } else if line.contains(GROUP_SUFFIX) {
        group_number(line).map(|n| format!("Message sent in group: {}", n))
    } else {
        None
    }
}

// Only the first matching media kind is considered, and a line mentioning `g.us`
// anywhere resolves to the group number even when a contact is also present.
fn receive_media(line: &str) -> Option<String> {
    let kind = if line.contains("chat") {
        "Text"
    } else if line.contains("image") {
        "Image"
    } else if line.contains("video") && !line.contains("status") {
        "Video"
    } else {
        return None;
    };
    let number = if line.contains("g.us") {
        group_number(line)
    } else if line.contains("c.us") {
        individual_number(line)
    } else {
        None
    };
    number.map(|n| format!("{} {} received", n, kind))
}
