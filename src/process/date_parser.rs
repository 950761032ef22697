use chrono::{NaiveDate, NaiveDateTime};

/// Frame key layout: `MM-DD-YYYY`, zero padded.
pub const DISPLAY_FORMAT: &str = "%m-%d-%Y";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Parse a calendar date from the handful of layouts the sources use.
/// Time-of-day, when present, is dropped.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub fn format_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_source_layouts() {
        assert_eq!(parse_date("2020-03-05"), Some(ymd(2020, 3, 5)));
        assert_eq!(parse_date("2020/03/05"), Some(ymd(2020, 3, 5)));
        assert_eq!(parse_date("03/05/2020"), Some(ymd(2020, 3, 5)));
        assert_eq!(parse_date("\"2020-03-05\""), Some(ymd(2020, 3, 5)));
        assert_eq!(parse_date("2020-03-05 13:45:00"), Some(ymd(2020, 3, 5)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2020-13-40"), None);
    }

    #[test]
    fn display_is_zero_padded_month_day_year() {
        assert_eq!(format_display(ymd(2021, 1, 2)), "01-02-2021");
        assert_eq!(format_display(ymd(2020, 12, 31)), "12-31-2020");
    }

    #[test]
    fn display_key_names_the_same_calendar_day() {
        let original = "2020-07-04";
        let key = format_display(parse_date(original).unwrap());
        assert_eq!(key, "07-04-2020");
        assert_eq!(parse_date(&key), parse_date(original));
    }
}
