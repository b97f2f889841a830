//! Offset-string parsing
//!
//! Reminder and snipe offsets come from configuration as human strings:
//! "30 seconds", "5 minutes", "1.5 hours", or compact forms like "90s".
//! Zero, negative, and unparseable offsets are rejected; the caller logs
//! and never schedules them.

use std::time::Duration;

/// Parse a human-readable offset into a duration.
pub fn parse_offset(raw: &str) -> Option<Duration> {
    let text = raw.trim().to_ascii_lowercase();
    let split = text.find(|c: char| !c.is_ascii_digit() && c != '.')?;
    let (number, unit) = text.split_at(split);
    let value: f64 = number.parse().ok()?;

    let seconds = match unit.trim() {
        "s" | "sec" | "secs" | "second" | "seconds" => value,
        "m" | "min" | "mins" | "minute" | "minutes" => value * 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => value * 3600.0,
        "d" | "day" | "days" => value * 86400.0,
        _ => return None,
    };

    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    Some(Duration::from_secs_f64(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spelled_out_units() {
        assert_eq!(parse_offset("30 seconds"), Some(Duration::from_secs(30)));
        assert_eq!(parse_offset("5 minutes"), Some(Duration::from_secs(300)));
        assert_eq!(parse_offset("1 minute"), Some(Duration::from_secs(60)));
        assert_eq!(parse_offset("2 hours"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_offset("1 day"), Some(Duration::from_secs(86400)));
    }

    #[test]
    fn test_compact_units() {
        assert_eq!(parse_offset("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_offset("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_offset("1h"), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_fractional_values() {
        assert_eq!(parse_offset("1.5 minutes"), Some(Duration::from_secs(90)));
        assert_eq!(parse_offset("0.5h"), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_whitespace_and_case() {
        assert_eq!(parse_offset("  30 Seconds  "), Some(Duration::from_secs(30)));
        assert_eq!(parse_offset("5 MIN"), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_zero_rejected() {
        assert_eq!(parse_offset("0 seconds"), None);
        assert_eq!(parse_offset("0m"), None);
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(parse_offset(""), None);
        assert_eq!(parse_offset("soon"), None);
        assert_eq!(parse_offset("30"), None);
        assert_eq!(parse_offset("five minutes"), None);
        assert_eq!(parse_offset("30 fortnights"), None);
    }
}
