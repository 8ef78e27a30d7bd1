//! Wall-clock and duration label formatting.

use chrono::{DateTime, Local, Utc};

/// `HH:MM` local wall-clock label for `at`.
///
/// Start/finish labels show household local time, matching the clock on the
/// appliance itself.
pub fn clock_label(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}

/// Human-readable remaining-duration label.
///
/// `H:MM` once at least an hour is left, `M:SS` below that. One policy,
/// applied uniformly everywhere a duration is shown.
pub fn duration_label(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}")
    } else {
        format!("{minutes}:{:02}", secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn duration_label_policy() {
        assert_eq!(duration_label(0), "0:00");
        assert_eq!(duration_label(59), "0:59");
        assert_eq!(duration_label(3000), "50:00");
        assert_eq!(duration_label(3599), "59:59");
        assert_eq!(duration_label(3600), "1:00");
        assert_eq!(duration_label(3 * 3600 + 10 * 60), "3:10");
    }

    #[test]
    fn clock_label_shape() {
        // The exact digits depend on the host timezone; the shape does not.
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 14, 30, 0).unwrap();
        let label = clock_label(at);
        assert_eq!(label.len(), 5);
        assert_eq!(&label[2..3], ":");
        let hours: u32 = label[0..2].parse().unwrap();
        assert!(hours < 24);
    }
}
