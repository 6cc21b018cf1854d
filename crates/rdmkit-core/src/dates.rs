//! Conversions between split date components (as stored in the legacy tables)
//! and the `YYYY-MM-DD HH:MM:SS` / `YYYY[-MM[-DD]]` string forms.

use chrono::Utc;

/// Full timestamp when any time component is set, date-only when only the
/// date is known, empty when the year is missing.
pub fn make_timestamp(year: i64, month: i64, day: i64, hour: i64, minute: i64, second: i64) -> String {
    if year <= 0 {
        return String::new();
    }
    if hour > 0 || minute > 0 || second > 0 {
        format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
    } else {
        format!("{year:04}-{month:02}-{day:02}")
    }
}

/// `YYYY-MM-DD` only when all three parts are known.
pub fn make_datestamp(year: i64, month: i64, day: i64) -> String {
    if year > 0 && month > 0 && day > 0 {
        format!("{year:04}-{month:02}-{day:02}")
    } else {
        String::new()
    }
}

/// Partial date made of the leading positive components: `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
pub fn make_approx_date(year: i64, month: i64, day: i64) -> String {
    if year <= 0 {
        return String::new();
    }
    if month <= 0 {
        return format!("{year:04}");
    }
    if day <= 0 {
        return format!("{year:04}-{month:02}");
    }
    format!("{year:04}-{month:02}-{day:02}")
}

/// Inverse of [`make_approx_date`]. Unparseable parts become zero.
pub fn approx_ymd(s: &str) -> (i64, i64, i64) {
    let date = s.trim().split([' ', 'T']).next().unwrap_or_default();
    let mut parts = date.split('-').map(|p| p.parse::<i64>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

/// Inverse of [`make_timestamp`]; also accepts an ISO `T` separator.
pub fn parse_timestamp(s: &str) -> (i64, i64, i64, i64, i64, i64) {
    let (year, month, day) = approx_ymd(s);
    let time = s
        .trim()
        .split_once([' ', 'T'])
        .map(|(_, t)| t.trim_end_matches('Z'))
        .unwrap_or_default();
    let mut parts = time.split(':').map(|p| {
        p.split('.').next().unwrap_or_default().parse::<i64>().unwrap_or(0)
    });
    (
        year,
        month,
        day,
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

/// Current UTC wall clock as `YYYY-MM-DD HH:MM:SS`.
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Reduce a timestamp to a date usable as a publication date: truncated to ten
/// characters with zero month/day components replaced by `01`.
pub fn normalize_date(s: &str) -> String {
    let mut out: String = s.trim().chars().take(10).collect();
    if out.ends_with("-00-00") {
        out = format!("{}-01-01", &out[..out.len() - 6]);
    } else if out.ends_with("-00") {
        out = format!("{}-01", &out[..out.len() - 3]);
    }
    out
}

/// Split an ISO date into integer parts, stopping at the first non-numeric part.
pub fn date_parts(s: &str) -> Vec<i64> {
    let date = s.trim().split([' ', 'T']).next().unwrap_or_default();
    date.split('-')
        .map_while(|p| p.parse::<i64>().ok())
        .filter(|n| *n > 0)
        .take(3)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_forms() {
        assert_eq!(make_timestamp(2021, 3, 4, 5, 6, 7), "2021-03-04 05:06:07");
        assert_eq!(make_timestamp(2021, 3, 4, 0, 0, 0), "2021-03-04");
        assert_eq!(make_timestamp(0, 3, 4, 5, 6, 7), "");
    }

    #[test]
    fn datestamp_requires_all_parts() {
        assert_eq!(make_datestamp(2021, 3, 4), "2021-03-04");
        assert_eq!(make_datestamp(2021, 3, 0), "");
    }

    #[test]
    fn approx_dates_round_trip() {
        for s in ["2001", "2001-02", "2001-02-15"] {
            let (y, m, d) = approx_ymd(s);
            assert_eq!(make_approx_date(y, m, d), s);
        }
        assert_eq!(make_approx_date(0, 1, 1), "");
    }

    #[test]
    fn parse_full_timestamp() {
        assert_eq!(parse_timestamp("2020-01-02 03:04:05"), (2020, 1, 2, 3, 4, 5));
        assert_eq!(parse_timestamp("2020-01-02T03:04:05.123Z"), (2020, 1, 2, 3, 4, 5));
        assert_eq!(parse_timestamp("2020-01-02"), (2020, 1, 2, 0, 0, 0));
    }

    #[test]
    fn normalize_zero_components() {
        assert_eq!(normalize_date("2001-00-00"), "2001-01-01");
        assert_eq!(normalize_date("2001-05-00 10:11:12"), "2001-05-01");
        assert_eq!(normalize_date("2001-05-06 10:11:12"), "2001-05-06");
    }

    #[test]
    fn parts_of_partial_dates() {
        assert_eq!(date_parts("2001"), vec![2001]);
        assert_eq!(date_parts("2001-02"), vec![2001, 2]);
        assert_eq!(date_parts("2001-02-15 01:02:03"), vec![2001, 2, 15]);
        assert!(date_parts("").is_empty());
    }
}
