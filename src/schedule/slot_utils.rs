use chrono::{NaiveDate, NaiveTime};

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)` share
/// at least one instant. Touching endpoints do not overlap.
pub fn intervals_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Parses a time of day in HH:MM or HH:MM:SS form
pub fn parse_time_of_day(time_str: &str) -> Option<NaiveTime> {
    let clean = time_str.trim();
    NaiveTime::parse_from_str(clean, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(clean, "%H:%M"))
        .ok()
}

/// Parses an ISO calendar date (YYYY-MM-DD)
pub fn parse_work_date(date_str: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").ok()
}

/// Formats a window as "HH:MM-HH:MM" for rosters and log lines
pub fn format_window(start: NaiveTime, end: NaiveTime) -> String {
    format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        parse_time_of_day(s).unwrap()
    }

    #[test]
    fn overlapping_windows() {
        assert!(intervals_overlap(t("09:00"), t("12:00"), t("11:00"), t("13:00")));
        assert!(intervals_overlap(t("11:00"), t("13:00"), t("09:00"), t("12:00")));
        // one window inside the other
        assert!(intervals_overlap(t("09:00"), t("12:00"), t("10:00"), t("10:30")));
    }

    #[test]
    fn touching_windows_do_not_overlap() {
        assert!(!intervals_overlap(t("09:00"), t("12:00"), t("12:00"), t("13:00")));
        assert!(!intervals_overlap(t("12:00"), t("13:00"), t("09:00"), t("12:00")));
    }

    #[test]
    fn parses_both_time_forms() {
        assert_eq!(t("08:30"), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(t(" 08:30:15 "), NaiveTime::from_hms_opt(8, 30, 15).unwrap());
        assert!(parse_time_of_day("25:00").is_none());
        assert!(parse_time_of_day("noon").is_none());
    }

    #[test]
    fn formats_window() {
        assert_eq!(format_window(t("09:00"), t("12:30")), "09:00-12:30");
        assert_eq!(parse_work_date("2024-01-10"), NaiveDate::from_ymd_opt(2024, 1, 10));
        assert!(parse_work_date("10/01/2024").is_none());
    }
}
