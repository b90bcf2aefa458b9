//! Display formatting for durations, sizes and dates.

use chrono::{DateTime, Utc};

/// `m:ss`, e.g. `3:05`.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// `mm:ss`, e.g. `03:05`.
pub fn format_duration_padded(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Human-readable size in binary units, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// `Jan 1, 2023`, or `Unknown date`.
pub fn format_date(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(date) => date.format("%b %-d, %Y").to_string(),
        None => "Unknown date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_auth::wire::parse_timestamp;

    #[test]
    fn test_durations() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(185), "3:05");
        assert_eq!(format_duration(3600), "60:00");
        assert_eq!(format_duration_padded(0), "00:00");
        assert_eq!(format_duration_padded(185), "03:05");
    }

    #[test]
    fn test_file_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024 * 1024), "3072 GB");
    }

    #[test]
    fn test_dates() {
        assert_eq!(format_date(parse_timestamp("2023-01-01")), "Jan 1, 2023");
        assert_eq!(format_date(parse_timestamp("2024-11-23T08:00:00")), "Nov 23, 2024");
        assert_eq!(format_date(None), "Unknown date");
    }
}
