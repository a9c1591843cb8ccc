// [[AGENTDECK]]/apps/console-server/src/format.rs
// Purpose: Human-readable ages and durations embedded in view models.
// Architecture: Presentation Helper Layer
// Dependencies: Chrono

use chrono::{DateTime, Utc};

use crate::models::parse_timestamp;

/// Coarse relative age of `timestamp` as seen from `now`. Future timestamps read as "just now".
pub fn time_ago(timestamp: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(then) = timestamp.and_then(parse_timestamp) else {
        return "-".to_string();
    };

    let minutes = (now - then).num_minutes().max(0);
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{} min ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    format!("{}d ago", hours / 24)
}

/// Review job durations: seconds with one decimal under a minute, else minutes and seconds.
pub fn format_review_duration(ms: Option<f64>) -> Option<String> {
    let ms = ms.filter(|v| *v > 0.0)?;
    let secs = ms / 1000.0;
    if secs < 60.0 {
        return Some(format!("{:.1}s", secs));
    }
    let minutes = (secs / 60.0).floor();
    let rem = secs - minutes * 60.0;
    Some(format!("{}m {:.0}s", minutes as u64, rem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_time_ago_buckets() {
        assert_eq!(time_ago(Some("2025-03-10T11:59:30Z"), now()), "just now");
        assert_eq!(time_ago(Some("2025-03-10T11:45:00Z"), now()), "15 min ago");
        assert_eq!(time_ago(Some("2025-03-10T09:00:00Z"), now()), "3h ago");
        assert_eq!(time_ago(Some("2025-03-08T12:00:00Z"), now()), "2d ago");
    }

    #[test]
    fn test_time_ago_missing_or_future() {
        assert_eq!(time_ago(None, now()), "-");
        assert_eq!(time_ago(Some("garbage"), now()), "-");
        assert_eq!(time_ago(Some("2025-03-10T13:00:00Z"), now()), "just now");
    }

    #[test]
    fn test_review_duration() {
        assert_eq!(format_review_duration(Some(12_345.0)).as_deref(), Some("12.3s"));
        assert_eq!(format_review_duration(Some(125_000.0)).as_deref(), Some("2m 5s"));
        assert_eq!(format_review_duration(Some(0.0)), None);
        assert_eq!(format_review_duration(None), None);
    }
}
