//! Standalone cache-header helpers.
//!
//! For handlers that want explicit control over caching headers instead of
//! the automatic [`CacheMiddleware`](super::CacheMiddleware). Each function
//! consumes a [`Response`] and returns it with exactly one header
//! set/replaced; no other header is touched.
//!
//! Errors here ([`CacheError`]) signal caller misuse (bad scope string,
//! unparseable date expression) and should surface during development, not
//! at request time.

use std::str::FromStr;

use chrono::Utc;

use super::{CacheError, Scope};
use crate::Response;
use crate::http::date::{fmt_http_date, parse_http_date};

/// ETag strength: strong tags render as `"value"`, weak as `W/"value"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtagStrength {
    Strong,
    Weak,
}

impl FromStr for EtagStrength {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strong" => Ok(Self::Strong),
            "weak" => Ok(Self::Weak),
            other => Err(CacheError::InvalidStrength(other.to_owned())),
        }
    }
}

/// A point in time accepted by the date-setting helpers: either Unix seconds
/// or a date expression ([`parse_http_date`] forms).
#[derive(Debug, Clone)]
pub enum HttpTime {
    Unix(i64),
    Expr(String),
}

impl HttpTime {
    /// Resolves to Unix seconds, failing on an unparseable expression.
    fn resolve(&self) -> Result<i64, CacheError> {
        match self {
            Self::Unix(ts) => Ok(*ts),
            Self::Expr(expr) => {
                parse_http_date(expr).ok_or_else(|| CacheError::DateParse(expr.clone()))
            }
        }
    }
}

impl From<i64> for HttpTime {
    fn from(ts: i64) -> Self {
        Self::Unix(ts)
    }
}

impl From<&str> for HttpTime {
    fn from(expr: &str) -> Self {
        Self::Expr(expr.to_owned())
    }
}

impl From<String> for HttpTime {
    fn from(expr: String) -> Self {
        Self::Expr(expr)
    }
}

/// A `max-age` argument: a relative number of seconds, or an absolute date
/// expression resolved to seconds-from-now at call time.
#[derive(Debug, Clone)]
pub enum MaxAge {
    Seconds(u64),
    Until(String),
}

impl MaxAge {
    /// Resolves to whole seconds relative to `now`.
    fn resolve_seconds(&self, now: i64) -> Result<i64, CacheError> {
        match self {
            Self::Seconds(seconds) => Ok(*seconds as i64),
            Self::Until(expr) => parse_http_date(expr)
                .map(|ts| ts - now)
                .ok_or_else(|| CacheError::DateParse(expr.clone())),
        }
    }
}

impl From<u64> for MaxAge {
    fn from(seconds: u64) -> Self {
        Self::Seconds(seconds)
    }
}

impl From<&str> for MaxAge {
    fn from(expr: &str) -> Self {
        Self::Until(expr.to_owned())
    }
}

impl From<String> for MaxAge {
    fn from(expr: String) -> Self {
        Self::Until(expr)
    }
}

/// Enables client-side caching via a `Cache-Control` header.
///
/// # Errors
///
/// [`CacheError::InvalidScope`] if `scope` is not `"public"` or `"private"`;
/// [`CacheError::DateParse`] if a `MaxAge::Until` expression is unparseable.
/// On error the response is not modified (it is consumed and dropped).
///
/// # Examples
///
/// ```
/// use cachet::Response;
/// use cachet::cache::provider::allow_cache;
///
/// let response = allow_cache(Response::default(), "private", Some(43200.into()), false).unwrap();
/// assert_eq!(response.headers().get("cache-control"), Some("private, max-age=43200"));
/// ```
pub fn allow_cache(
    mut response: Response,
    scope: &str,
    max_age: Option<MaxAge>,
    must_revalidate: bool,
) -> Result<Response, CacheError> {
    let scope: Scope = scope.parse()?;
    let mut value = scope.as_str().to_owned();
    if let Some(max_age) = max_age {
        let seconds = max_age.resolve_seconds(Utc::now().timestamp())?;
        value.push_str(&format!(", max-age={seconds}"));
    }
    if must_revalidate {
        value.push_str(", must-revalidate");
    }
    response.set_header("Cache-Control", value);
    Ok(response)
}

/// Disables client-side caching: `Cache-Control: no-store,no-cache`.
///
/// The exact header text (no space after the comma) is kept for wire
/// compatibility with existing clients.
pub fn deny_cache(mut response: Response) -> Response {
    response.set_header("Cache-Control", "no-store,no-cache");
    response
}

/// Sets the `Expires` header to the given time, rendered RFC 1123 in GMT.
///
/// # Errors
///
/// [`CacheError::DateParse`] if the time expression cannot be parsed.
pub fn with_expires(
    mut response: Response,
    time: impl Into<HttpTime>,
) -> Result<Response, CacheError> {
    let timestamp = time.into().resolve()?;
    let rendered =
        fmt_http_date(timestamp).ok_or_else(|| CacheError::DateParse(timestamp.to_string()))?;
    response.set_header("Expires", rendered);
    Ok(response)
}

/// Sets the `ETag` header. `strength` selects strong (`"value"`) or weak
/// (`W/"value"`) rendering.
///
/// # Errors
///
/// [`CacheError::InvalidStrength`] if `strength` is not `"strong"` or `"weak"`.
///
/// # Examples
///
/// ```
/// use cachet::Response;
/// use cachet::cache::provider::with_etag;
///
/// let response = with_etag(Response::default(), "abc", "weak").unwrap();
/// assert_eq!(response.headers().get("etag"), Some("W/\"abc\""));
/// ```
pub fn with_etag(
    mut response: Response,
    value: &str,
    strength: &str,
) -> Result<Response, CacheError> {
    let strength: EtagStrength = strength.parse()?;
    let tag = match strength {
        EtagStrength::Strong => format!("\"{value}\""),
        EtagStrength::Weak => format!("W/\"{value}\""),
    };
    response.set_header("ETag", tag);
    Ok(response)
}

/// Sets the `Last-Modified` header to the given time, rendered RFC 1123 in GMT.
///
/// # Errors
///
/// [`CacheError::DateParse`] if the time expression cannot be parsed.
pub fn with_last_modified(
    mut response: Response,
    time: impl Into<HttpTime>,
) -> Result<Response, CacheError> {
    let timestamp = time.into().resolve()?;
    let rendered =
        fmt_http_date(timestamp).ok_or_else(|| CacheError::DateParse(timestamp.to_string()))?;
    response.set_header("Last-Modified", rendered);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPOCH: i64 = 784111777; // Sun, 06 Nov 1994 08:49:37 GMT

    #[test]
    fn allow_cache_with_seconds() {
        let response = allow_cache(Response::default(), "private", Some(43200.into()), false)
            .expect("valid scope");
        assert_eq!(
            response.headers().get("cache-control"),
            Some("private, max-age=43200")
        );
    }

    #[test]
    fn allow_cache_with_must_revalidate() {
        let response = allow_cache(Response::default(), "private", Some(43200.into()), true)
            .expect("valid scope");
        assert_eq!(
            response.headers().get("cache-control"),
            Some("private, max-age=43200, must-revalidate")
        );
    }

    #[test]
    fn allow_cache_without_max_age() {
        let response =
            allow_cache(Response::default(), "public", None, false).expect("valid scope");
        assert_eq!(response.headers().get("cache-control"), Some("public"));
    }

    #[test]
    fn allow_cache_rejects_unknown_scope() {
        let result = allow_cache(Response::default(), "unknown", None, false);
        assert!(matches!(result, Err(CacheError::InvalidScope(_))));
    }

    #[test]
    fn allow_cache_replaces_existing_header() {
        let response = Response::default().header("Cache-Control", "no-store");
        let response =
            allow_cache(response, "public", Some(60.into()), false).expect("valid scope");
        assert_eq!(
            response.headers().get("cache-control"),
            Some("public, max-age=60")
        );
        assert_eq!(response.headers().get_all("cache-control").count(), 1);
    }

    #[test]
    fn max_age_until_resolves_relative_to_now() {
        let max_age = MaxAge::Until("Sun, 06 Nov 1994 08:49:37 GMT".to_owned());
        assert_eq!(max_age.resolve_seconds(EPOCH - 30).unwrap(), 30);
    }

    #[test]
    fn max_age_until_rejects_garbage() {
        let max_age = MaxAge::Until("in five minutes".to_owned());
        assert!(matches!(
            max_age.resolve_seconds(0),
            Err(CacheError::DateParse(_))
        ));
    }

    #[test]
    fn deny_cache_sets_exact_directive() {
        let response = deny_cache(Response::default());
        assert_eq!(
            response.headers().get("cache-control"),
            Some("no-store,no-cache")
        );
    }

    #[test]
    fn with_expires_from_timestamp() {
        let response = with_expires(Response::default(), EPOCH).expect("valid time");
        assert_eq!(
            response.headers().get("expires"),
            Some("Sun, 06 Nov 1994 08:49:37 GMT")
        );
    }

    #[test]
    fn with_expires_from_expression() {
        let response =
            with_expires(Response::default(), "1994-11-06T08:49:37Z").expect("valid time");
        assert_eq!(
            response.headers().get("expires"),
            Some("Sun, 06 Nov 1994 08:49:37 GMT")
        );
    }

    #[test]
    fn with_expires_rejects_garbage() {
        let result = with_expires(Response::default(), "next tuesday");
        assert!(matches!(result, Err(CacheError::DateParse(_))));
    }

    #[test]
    fn with_etag_strong() {
        let response = with_etag(Response::default(), "abc", "strong").expect("valid strength");
        assert_eq!(response.headers().get("etag"), Some("\"abc\""));
    }

    #[test]
    fn with_etag_weak() {
        let response = with_etag(Response::default(), "abc", "weak").expect("valid strength");
        assert_eq!(response.headers().get("etag"), Some("W/\"abc\""));
    }

    #[test]
    fn with_etag_rejects_unknown_strength() {
        let result = with_etag(Response::default(), "abc", "flimsy");
        assert!(matches!(result, Err(CacheError::InvalidStrength(_))));
    }

    #[test]
    fn with_last_modified_from_timestamp() {
        let response = with_last_modified(Response::default(), EPOCH).expect("valid time");
        assert_eq!(
            response.headers().get("last-modified"),
            Some("Sun, 06 Nov 1994 08:49:37 GMT")
        );
    }

    #[test]
    fn with_last_modified_rejects_garbage() {
        let result = with_last_modified(Response::default(), "ages ago");
        assert!(matches!(result, Err(CacheError::DateParse(_))));
    }
}
