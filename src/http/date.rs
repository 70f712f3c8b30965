//! RFC 1123 date formatting for `Date`, `Last-Modified` and `Expires` headers.
//!
//! HTTP/1.1 recipients must accept RFC 1123, RFC 850 and asctime dates, but
//! senders must only generate RFC 1123 (RFC 9110 §5.6.7). Only generation
//! lives here.

use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Timelike, Utc};

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A broken-down UTC timestamp.
///
/// `weekday` counts from Monday = 0. `yearday` and `isdst` are carried for
/// callers that produce full broken-down times but are ignored by formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tm {
    pub year: i32,
    /// 1–12.
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// 0 (Monday) – 6 (Sunday).
    pub weekday: u32,
    pub yearday: u32,
    pub isdst: i32,
}

impl Tm {
    /// Returns the current time in UTC.
    pub fn now() -> Self {
        Utc::now().into()
    }
}

impl From<DateTime<Utc>> for Tm {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
            weekday: dt.weekday().num_days_from_monday(),
            yearday: dt.ordinal(),
            isdst: 0,
        }
    }
}

impl From<SystemTime> for Tm {
    fn from(time: SystemTime) -> Self {
        DateTime::<Utc>::from(time).into()
    }
}

/// An RFC 1123 formatted timestamp: `Www, dd Mon yyyy hh:mm:ss GMT`.
///
/// # Examples
///
/// ```
/// use wirecore::http::date::{HttpDate, Tm};
///
/// let tm = Tm {
///     year: 1994, month: 11, day: 6,
///     hour: 8, minute: 49, second: 37,
///     weekday: 6, yearday: 310, isdst: 0,
/// };
/// assert_eq!(HttpDate::from(tm).to_string(), "Sun, 06 Nov 1994 08:49:37 GMT");
/// assert_eq!(HttpDate::now().to_string().len(), 29);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpDate(Tm);

impl HttpDate {
    /// The current time.
    pub fn now() -> Self {
        Self(Tm::now())
    }

    /// Returns the underlying broken-down time.
    pub fn tm(&self) -> &Tm {
        &self.0
    }
}

impl From<Tm> for HttpDate {
    fn from(tm: Tm) -> Self {
        Self(tm)
    }
}

impl From<SystemTime> for HttpDate {
    fn from(time: SystemTime) -> Self {
        Self(time.into())
    }
}

impl fmt::Display for HttpDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tm = &self.0;
        // Out-of-range indices wrap or clamp rather than fail: formatting is infallible.
        let weekday = WEEKDAYS[(tm.weekday % 7) as usize];
        let month = MONTHS[(tm.month.clamp(1, 12) - 1) as usize];
        write!(
            f,
            "{weekday}, {:02} {month} {:4} {:02}:{:02}:{:02} GMT",
            tm.day, tm.year, tm.hour, tm.minute, tm.second
        )
    }
}

/// Formats `tm` as an RFC 1123 date, or the current UTC time when `None`.
pub fn http_date(tm: Option<Tm>) -> String {
    tm.map_or_else(HttpDate::now, HttpDate::from).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn is_rfc1123(s: &str) -> bool {
        let b = s.as_bytes();
        b.len() == 29
            && WEEKDAYS.contains(&&s[0..3])
            && &s[3..5] == ", "
            && b[5..7].iter().all(u8::is_ascii_digit)
            && b[7] == b' '
            && MONTHS.contains(&&s[8..11])
            && b[11] == b' '
            && b[12..16].iter().all(u8::is_ascii_digit)
            && b[16] == b' '
            && b[17..19].iter().all(u8::is_ascii_digit)
            && b[19] == b':'
            && b[20..22].iter().all(u8::is_ascii_digit)
            && b[22] == b':'
            && b[23..25].iter().all(u8::is_ascii_digit)
            && &s[25..] == " GMT"
    }

    #[test]
    fn formats_known_timestamp() {
        let dt = Utc.with_ymd_and_hms(2007, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(HttpDate::from(Tm::from(dt)).to_string(), "Tue, 02 Jan 2007 03:04:05 GMT");
    }

    #[test]
    fn current_time_is_fixed_width() {
        let now = http_date(None);
        assert!(is_rfc1123(&now), "{now}");
    }

    #[test]
    fn ignores_trailing_fields() {
        let dt = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        let mut tm = Tm::from(dt);
        let expected = http_date(Some(tm));
        tm.yearday = 0;
        tm.isdst = 1;
        assert_eq!(http_date(Some(tm)), expected);
        assert_eq!(expected, "Thu, 29 Feb 2024 23:59:59 GMT");
    }
}
