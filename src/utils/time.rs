use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/* Format used by snapshots and price tables */
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

pub const SECONDS_IN_MIN: i64 = 60;
pub const SECONDS_IN_HOUR: i64 = 60 * SECONDS_IN_MIN;

pub fn seconds_to_datetime_utc(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

pub fn millis_to_datetime_utc(milliseconds: i64) -> Option<DateTime<Utc>> {
    let seconds = milliseconds.div_euclid(1000);
    let nanoseconds = (milliseconds.rem_euclid(1000) * 1_000_000) as u32;
    DateTime::from_timestamp(seconds, nanoseconds)
}

/* Accepts the snapshot format, RFC 3339 / ISO-8601 with an offset, and naive
"YYYY-MM-DD HH:MM:SS" or "YYYY-MM-DDTHH:MM:SS" (assumed UTC). */
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_str(raw, DATE_TIME_FORMAT) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(localize(naive));
        }
    }
    None
}

/* Naive instants are UTC */
pub fn localize(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}

pub fn datetime_to_str(date_time: &DateTime<Utc>) -> String {
    date_time.format(DATE_TIME_FORMAT).to_string()
}

pub fn get_delta_seconds(first: &DateTime<Utc>, second: &DateTime<Utc>) -> f64 {
    (*first - *second).num_milliseconds() as f64 / 1000.0
}
