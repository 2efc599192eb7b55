use chrono::{Datelike, Local, NaiveDate, NaiveTime, Weekday};
use thiserror::Error;

/// Display format of the date line, e.g. `07 Tháng 03, 2025`.
pub const DATE_FORMAT: &str = "%d Tháng %m, %Y";

/// Display format of the time line.
pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Invalid date '{0}': expected \"DD Tháng MM, YYYY\" or YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid time '{0}': expected HH:MM")]
    InvalidTime(String),
}

/// The text content of one watermark.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatermarkFields {
    pub date: String,
    pub time: String,
    pub day: String,
    pub location: String,
}

impl WatermarkFields {
    /// Fields for the current local date and time, with no location.
    pub fn now() -> Self {
        let now = Local::now();
        Self::default()
            .with_date(now.date_naive())
            .with_time(now.time())
    }

    /// Set the date line and rewrite the weekday to match it.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = format_date(date);
        self.day = day_name(date.weekday()).to_string();
        self
    }

    pub fn with_time(mut self, time: NaiveTime) -> Self {
        self.time = time.format(TIME_FORMAT).to_string();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// The calendar date currently shown on the date line.
    pub fn date_value(&self) -> Result<NaiveDate, FieldError> {
        parse_date(&self.date)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a date in display format. Day and month may omit their leading zero.
pub fn parse_date(value: &str) -> Result<NaiveDate, FieldError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| FieldError::InvalidDate(value.to_string()))
}

/// Accepts either the display format or an ISO `YYYY-MM-DD` date.
pub fn parse_date_input(value: &str) -> Result<NaiveDate, FieldError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").or_else(|_| parse_date(value))
}

pub fn parse_time(value: &str) -> Result<NaiveTime, FieldError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map_err(|_| FieldError::InvalidTime(value.to_string()))
}

/// Vietnamese weekday name.
pub fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "Chủ nhật",
        Weekday::Mon => "Thứ Hai",
        Weekday::Tue => "Thứ Ba",
        Weekday::Wed => "Thứ Tư",
        Weekday::Thu => "Thứ Năm",
        Weekday::Fri => "Thứ Sáu",
        Weekday::Sat => "Thứ Bảy",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(format_date(date), "07 Tháng 03, 2025");
    }

    #[test]
    fn test_parse_date_round_trip() {
        let mut date = NaiveDate::from_ymd_opt(1999, 12, 25).unwrap();
        let end = NaiveDate::from_ymd_opt(2001, 3, 1).unwrap();
        while date <= end {
            assert_eq!(parse_date(&format_date(date)).unwrap(), date);
            date = date.succ_opt().unwrap();
        }

        for (y, m, d) in [(1000, 1, 1), (2024, 2, 29), (9999, 12, 31)] {
            let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
            assert_eq!(parse_date(&format_date(date)).unwrap(), date);
        }
    }

    #[test]
    fn test_parse_date_without_padding() {
        let date = parse_date("7 Tháng 3, 2025").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("").is_err());
        assert!(parse_date("2025-03-07").is_err());
        assert!(parse_date("31 Tháng 02, 2025").is_err());
    }

    #[test]
    fn test_parse_date_input_accepts_iso() {
        let expected = NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();
        assert_eq!(parse_date_input("2024-11-05").unwrap(), expected);
        assert_eq!(parse_date_input("05 Tháng 11, 2024").unwrap(), expected);
    }

    #[test]
    fn test_with_date_updates_day() {
        // 2025-03-07 is a Friday.
        let fields = WatermarkFields::default()
            .with_date(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        assert_eq!(fields.date, "07 Tháng 03, 2025");
        assert_eq!(fields.day, "Thứ Sáu");
        assert_eq!(
            fields.date_value().unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
        );
    }

    #[test]
    fn test_time_format() {
        let fields =
            WatermarkFields::default().with_time(NaiveTime::from_hms_opt(9, 5, 59).unwrap());
        assert_eq!(fields.time, "09:05");
        assert_eq!(parse_time("23:59").unwrap(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        assert!(parse_time("24:00").is_err());
        assert!(parse_time("noon").is_err());
    }

    #[test]
    fn test_now_is_consistent() {
        let fields = WatermarkFields::now();
        let date = fields.date_value().unwrap();
        assert_eq!(fields.day, day_name(date.weekday()));
        assert_eq!(fields.time.len(), 5);
        assert!(fields.location.is_empty());
    }

    #[test]
    fn test_day_names() {
        assert_eq!(day_name(Weekday::Sun), "Chủ nhật");
        assert_eq!(day_name(Weekday::Mon), "Thứ Hai");
        assert_eq!(day_name(Weekday::Sat), "Thứ Bảy");
    }
}
