use chrono::NaiveDateTime;

const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Parses an event timestamp ("2023-01-01 10:00:00.000").
/// Log timestamps carry no zone, they are taken as UTC.
pub fn parse_event_timestamp(timestamp_str: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(timestamp_str, EVENT_TIMESTAMP_FORMAT).ok()
}

pub fn timestamp_to_unix_millis(timestamp_str: &str) -> Option<i64> {
    parse_event_timestamp(timestamp_str).map(|dt| dt.and_utc().timestamp_millis())
}

/// Extracts year-month (YYYY-MM) from a timestamp string
/// Supports formats like: "2025-12-16 10:30:00.000", "2025-12-16T10:30:00", etc.
pub fn extract_year_month(timestamp: &str) -> Option<String> {
    let prefix = timestamp.get(..7)?;
    let (year, month) = prefix.split_once('-')?;
    if year.len() == 4
        && month.len() == 2
        && year.chars().all(|c| c.is_ascii_digit())
        && month.chars().all(|c| c.is_ascii_digit())
    {
        return Some(prefix.to_string());
    }
    None
}

/// Sanitizes a string for use in a filename
/// Replaces invalid filename characters with hyphens
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
