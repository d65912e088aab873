use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 3] = ["%Y%m%d", "%Y-%m-%d", "%d/%m/%Y"];
const TIMESTAMP_FORMATS: [&str; 3] = ["%Y%m%d%H%M%S", "%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M:%S"];

/// `"20240131"`, `"2024-01-31"` or `"31/01/2024"` → days since the Unix epoch.
pub fn parse_date_days(s: &str) -> Option<i32> {
    let s = s.trim();
    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    i32::try_from((date - epoch).num_days()).ok()
}

/// Timestamp text (taken as UTC) → microseconds since the Unix epoch.
/// A bare date is accepted as midnight.
pub fn parse_timestamp_micros(s: &str) -> Option<i64> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|dt| dt.and_utc().timestamp_micros())
}
