//! String formatting utilities for UI rendering.

use chrono::{DateTime, TimeZone, Utc};

/// Truncate a string to max length, adding ellipsis if needed.
pub fn truncate(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return s.chars().take(max_len).collect();
    }
    let truncated: String = s.chars().take(max_len - 3).collect();
    format!("{}...", truncated)
}

/// First non-blank line of a body, truncated for tables.
pub fn preview(body: &str, max_len: usize) -> String {
    let line = body.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    truncate(line, max_len)
}

/// Format an instant in `zone` for display.
pub fn format_datetime<Z>(dt: &DateTime<Utc>, zone: &Z, pretty: bool) -> String
where
    Z: TimeZone,
    Z::Offset: std::fmt::Display,
{
    let local = dt.with_timezone(zone);
    if pretty {
        local.format("%Y-%m-%d %H:%M").to_string()
    } else {
        local.to_rfc3339()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer sentence", 10), "a longe...");
        assert_eq!(truncate("abcdef", 2), "ab");
    }

    #[test]
    fn test_preview_skips_blank_lines() {
        assert_eq!(preview("\n\n  first line \nsecond", 40), "first line");
        assert_eq!(preview("", 40), "");
    }

    #[test]
    fn test_format_datetime_in_zone() {
        let dt = DateTime::parse_from_rfc3339("2024-05-17T04:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let zone = chrono_tz::America::New_York;
        assert_eq!(format_datetime(&dt, &zone, true), "2024-05-17 00:00");
        assert_eq!(format_datetime(&dt, &Utc, false), "2024-05-17T04:00:00+00:00");
    }
}
