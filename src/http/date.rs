//! HTTP date parsing and formatting.
//!
//! Wire dates use the fixed RFC 1123 form (`Sun, 06 Nov 1994 08:49:37 GMT`).
//! Receivers must also accept the obsolete RFC 850 and asctime forms
//! (RFC 9110 §5.6.7); on top of those this module accepts RFC 3339 and raw
//! Unix-timestamp strings so callers can pass machine-generated values.

use chrono::{DateTime, NaiveDateTime};

/// Obsolete RFC 850 form: `Sunday, 06-Nov-94 08:49:37 GMT`.
const RFC850_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S GMT";

/// Obsolete asctime form: `Sun Nov  6 08:49:37 1994`.
const ASCTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// RFC 1123 output form, always rendered in GMT.
const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Parses an HTTP date (or a numeric Unix timestamp) into Unix seconds.
///
/// Returns `None` if the value matches none of the accepted forms. Callers
/// handling client-supplied conditionals treat `None` as "no condition
/// supplied" rather than an error.
///
/// # Examples
///
/// ```
/// use cachet::http::date::parse_http_date;
///
/// assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Some(784111777));
/// assert_eq!(parse_http_date("784111777"), Some(784111777));
/// assert_eq!(parse_http_date("not a date"), None);
/// ```
pub fn parse_http_date(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(ts) = value.parse::<i64>() {
        return Some(ts);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, RFC850_FORMAT) {
        return Some(dt.and_utc().timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, ASCTIME_FORMAT) {
        return Some(dt.and_utc().timestamp());
    }
    None
}

/// Formats Unix seconds as an RFC 1123 HTTP date in GMT.
///
/// Returns `None` only when the timestamp falls outside chrono's
/// representable range.
pub fn fmt_http_date(timestamp: i64) -> Option<String> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.format(RFC1123_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPOCH: i64 = 784111777; // Sun, 06 Nov 1994 08:49:37 GMT

    #[test]
    fn parses_rfc1123() {
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Some(EPOCH));
    }

    #[test]
    fn parses_obsolete_rfc850() {
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Some(EPOCH));
    }

    #[test]
    fn parses_obsolete_asctime() {
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Some(EPOCH));
    }

    #[test]
    fn parses_rfc3339() {
        assert_eq!(parse_http_date("1994-11-06T08:49:37Z"), Some(EPOCH));
    }

    #[test]
    fn numeric_timestamp_passes_through() {
        assert_eq!(parse_http_date("784111777"), Some(EPOCH));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_http_date("yesterday-ish"), None);
        assert_eq!(parse_http_date(""), None);
    }

    #[test]
    fn round_trip() {
        let rendered = fmt_http_date(EPOCH).unwrap();
        assert_eq!(rendered, "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parse_http_date(&rendered), Some(EPOCH));
    }
}
