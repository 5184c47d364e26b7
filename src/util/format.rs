use time::OffsetDateTime;
use time::macros::format_description;

/// Format a Unix timestamp as a UTC `YYYY-MM-DD HH:MM` string
pub fn format_timestamp(timestamp: i64) -> String {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|dt| {
            let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
            dt.format(&format).ok()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Format an optional resume marker; repositories never scanned show "never"
pub fn format_marker(marker: Option<i64>) -> String {
    marker.map(format_timestamp).unwrap_or_else(|| "never".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13");
        assert_eq!(format_timestamp(0), "1970-01-01 00:00");
        assert_eq!(format_timestamp(i64::MAX), "unknown");
    }

    #[test]
    fn test_format_marker() {
        assert_eq!(format_marker(None), "never");
        assert_eq!(format_marker(Some(1_700_000_000)), "2023-11-14 22:13");
    }
}
