//! HTTP conditional-caching middleware.
//!
//! [`CacheMiddleware`] decorates responses coming back from the downstream
//! handler:
//!
//! 1. If the response carries no `Cache-Control` header, one is synthesized
//!    from the configured [`Scope`], max-age, and must-revalidate flag.
//!    A handler-set `Cache-Control` always wins.
//! 2. If the response has an `ETag` and the request's `If-None-Match` list
//!    contains that tag verbatim (or the wildcard `*`), the response is
//!    replaced with an empty-bodied `304 Not Modified`.
//! 3. Otherwise, if the response has a `Last-Modified` date at or before the
//!    request's `If-Modified-Since` date, the same `304` downgrade applies.
//!    The ETag check takes precedence: a tag hit never re-consults dates.
//!
//! Malformed client conditionals are ignored rather than rejected; the
//! request then goes through normal (non-304) processing.
//!
//! Every decision is a pure function of the single request/response pair, so
//! one middleware instance is safe to share across concurrent requests.
//!
//! The [`provider`] module holds standalone helpers (`allow_cache`,
//! `with_etag`, ...) for handlers that want explicit control instead.

use std::{fmt, future::Future, pin::Pin, str::FromStr};

use thiserror::Error;

use crate::{
    Response, StatusCode,
    context::Context,
    http::date::parse_http_date,
    middleware::{Middleware, Next},
};

pub mod provider;

pub use provider::{EtagStrength, HttpTime, MaxAge};

/// Errors raised by cache configuration and the [`provider`] helpers.
///
/// These signal caller mistakes (bad scope string, bad ETag strength,
/// unparseable date expression) and are never produced by client input.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid Cache-Control scope {0:?}: must be \"public\" or \"private\"")]
    InvalidScope(String),

    #[error("invalid ETag strength {0:?}: must be \"strong\" or \"weak\"")]
    InvalidStrength(String),

    #[error("cannot parse {0:?} as an HTTP date")]
    DateParse(String),
}

/// `Cache-Control` scope: who may store the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Any cache may store the response.
    Public,
    /// Only the requesting client's private cache may store it.
    Private,
}

impl Scope {
    /// Returns the directive token for this scope.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(CacheError::InvalidScope(other.to_owned())),
        }
    }
}

/// Middleware that injects `Cache-Control` and answers conditional requests
/// with `304 Not Modified`.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use cachet::cache::{CacheMiddleware, Scope};
/// use cachet::middleware::from_middleware;
///
/// // public, cacheable for a day, revalidate once stale
/// let cache = CacheMiddleware::new(Scope::Public, 86400).must_revalidate(true);
/// let handler = from_middleware(Arc::new(cache));
/// ```
#[derive(Debug, Clone)]
pub struct CacheMiddleware {
    scope: Scope,
    max_age: u64,
    must_revalidate: bool,
}

impl CacheMiddleware {
    /// Creates a middleware emitting `"{scope}, max-age={max_age}"`.
    ///
    /// A `max_age` of `0` renders `"{scope}, no-cache"` instead; the exact
    /// directive text is a client compatibility surface and intentionally
    /// differs between the two branches.
    pub fn new(scope: Scope, max_age: u64) -> Self {
        Self {
            scope,
            max_age,
            must_revalidate: false,
        }
    }

    /// Appends `", must-revalidate"` to the synthesized directive.
    #[must_use]
    pub fn must_revalidate(mut self, must_revalidate: bool) -> Self {
        self.must_revalidate = must_revalidate;
        self
    }

    /// Renders the `Cache-Control` value this middleware would inject.
    fn directive(&self) -> String {
        let mut value = if self.max_age == 0 {
            format!("{}, no-cache", self.scope)
        } else {
            format!("{}, max-age={}", self.scope, self.max_age)
        };
        if self.must_revalidate {
            value.push_str(", must-revalidate");
        }
        value
    }
}

impl Default for CacheMiddleware {
    /// Private, cacheable for one day, no revalidation requirement.
    fn default() -> Self {
        Self::new(Scope::Private, 86400)
    }
}

/// Returns `true` if `etag` appears verbatim in the comma-separated
/// `If-None-Match` list, or the list contains the wildcard `*`.
fn if_none_match_hit(etag: &str, if_none_match: &str) -> bool {
    if_none_match
        .split(',')
        .map(str::trim)
        .any(|tag| tag == etag || tag == "*")
}

/// Downgrades a response to an empty-bodied `304 Not Modified`, keeping its
/// headers so the client can refresh stored metadata.
fn not_modified(mut response: Response) -> Response {
    response.set_status(StatusCode::NotModified);
    response.clear_body();
    response
}

impl Middleware for CacheMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let this = self.clone();

        Box::pin(async move {
            // Conditional headers must be captured before `next` consumes the
            // context.
            let if_none_match = ctx
                .request()
                .headers()
                .get("if-none-match")
                .map(str::to_owned);
            let if_modified_since = ctx
                .request()
                .headers()
                .get("if-modified-since")
                .map(str::to_owned);

            let mut response = next.run(ctx).await;

            if !response.has_header("cache-control") {
                response.add_header("Cache-Control", this.directive());
            }

            // ETag validation runs first and a hit never re-consults dates.
            let etag = response.headers().get("etag").map(str::to_owned);
            if let Some(etag) = etag {
                let list = if_none_match.as_deref().filter(|v| !v.trim().is_empty());
                if let Some(list) = list {
                    if if_none_match_hit(&etag, list) {
                        tracing::debug!(%etag, "If-None-Match hit, replying 304");
                        return not_modified(response);
                    }
                }
            }

            // Last-Modified validation. A client date that fails to parse is
            // treated as no condition at all.
            let last_modified = response.headers().get("last-modified").map(str::to_owned);
            if let Some(last_modified) = last_modified {
                let modified = parse_http_date(&last_modified);
                let since = if_modified_since.as_deref().and_then(parse_http_date);
                if let (Some(modified), Some(since)) = (modified, since) {
                    // At-or-before, not equality: a client copy newer than the
                    // server's is still valid.
                    if modified <= since {
                        tracing::debug!(
                            last_modified = modified,
                            if_modified_since = since,
                            "client copy is current, replying 304"
                        );
                        return not_modified(response);
                    }
                }
            }

            response
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        Request,
        middleware::{MiddlewareHandler, from_middleware},
    };

    const LAST_MODIFIED: &str = "Tue, 10 May 2022 12:00:00 GMT";
    const EARLIER: &str = "Tue, 10 May 2022 11:59:59 GMT";
    const LATER: &str = "Tue, 10 May 2022 12:00:01 GMT";

    /// A downstream handler that answers 200 with fixed headers and body.
    fn handler(headers: Vec<(&'static str, &'static str)>, body: &'static str) -> MiddlewareHandler {
        Arc::new(move |_ctx, _next| {
            let headers = headers.clone();
            Box::pin(async move {
                let mut response = Response::new(StatusCode::Ok).body(body);
                for (name, value) in headers {
                    response.add_header(name, value);
                }
                response
            })
        })
    }

    async fn run(
        middleware: CacheMiddleware,
        request_headers: &[(&str, &str)],
        downstream: MiddlewareHandler,
    ) -> Response {
        let mut raw = String::from("GET /resource HTTP/1.1\r\nHost: localhost\r\n");
        for (name, value) in request_headers {
            raw.push_str(&format!("{name}: {value}\r\n"));
        }
        raw.push_str("\r\n");
        let (request, _) = Request::parse(raw.as_bytes()).unwrap();

        let chain = Next::new(vec![from_middleware(Arc::new(middleware)), downstream]);
        chain.run(Context::new(request)).await
    }

    #[tokio::test]
    async fn injects_cache_control() {
        let response = run(
            CacheMiddleware::new(Scope::Public, 86400),
            &[],
            handler(vec![], "body"),
        )
        .await;
        assert_eq!(
            response.headers().get("cache-control"),
            Some("public, max-age=86400")
        );
    }

    #[tokio::test]
    async fn injects_cache_control_with_must_revalidate() {
        let response = run(
            CacheMiddleware::new(Scope::Private, 86400).must_revalidate(true),
            &[],
            handler(vec![], "body"),
        )
        .await;
        assert_eq!(
            response.headers().get("cache-control"),
            Some("private, max-age=86400, must-revalidate")
        );
    }

    #[tokio::test]
    async fn zero_max_age_renders_no_cache() {
        let response = run(
            CacheMiddleware::new(Scope::Private, 0),
            &[],
            handler(vec![], "body"),
        )
        .await;
        assert_eq!(
            response.headers().get("cache-control"),
            Some("private, no-cache")
        );
    }

    #[tokio::test]
    async fn zero_max_age_with_must_revalidate() {
        let response = run(
            CacheMiddleware::new(Scope::Private, 0).must_revalidate(true),
            &[],
            handler(vec![], "body"),
        )
        .await;
        assert_eq!(
            response.headers().get("cache-control"),
            Some("private, no-cache, must-revalidate")
        );
    }

    #[tokio::test]
    async fn existing_cache_control_is_never_overwritten() {
        let response = run(
            CacheMiddleware::default(),
            &[],
            handler(vec![("Cache-Control", "no-cache,no-store")], "body"),
        )
        .await;
        assert_eq!(
            response.headers().get("cache-control"),
            Some("no-cache,no-store")
        );
        assert_eq!(response.headers().get_all("cache-control").count(), 1);
    }

    #[tokio::test]
    async fn etag_hit_replies_304_with_empty_body() {
        let response = run(
            CacheMiddleware::default(),
            &[("If-None-Match", "\"abc\"")],
            handler(vec![("ETag", "\"abc\"")], "payload"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NotModified);
        assert!(response.body_ref().is_empty());
    }

    #[tokio::test]
    async fn etag_hit_in_multi_value_list() {
        let response = run(
            CacheMiddleware::default(),
            &[("If-None-Match", "\"one\" , \"abc\",\"two\"")],
            handler(vec![("ETag", "\"abc\"")], "payload"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NotModified);
    }

    #[tokio::test]
    async fn etag_wildcard_matches_any_tag() {
        let response = run(
            CacheMiddleware::default(),
            &[("If-None-Match", "*")],
            handler(vec![("ETag", "\"whatever\"")], "payload"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NotModified);
    }

    #[tokio::test]
    async fn etag_mismatch_keeps_original_response() {
        let response = run(
            CacheMiddleware::default(),
            &[("If-None-Match", "\"xyz\"")],
            handler(vec![("ETag", "\"abc\"")], "payload"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body_ref(), b"payload");
    }

    #[tokio::test]
    async fn etag_without_condition_passes_through() {
        let response = run(
            CacheMiddleware::default(),
            &[],
            handler(vec![("ETag", "\"abc\"")], "payload"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::Ok);
    }

    #[tokio::test]
    async fn last_modified_equal_replies_304() {
        let response = run(
            CacheMiddleware::default(),
            &[("If-Modified-Since", LAST_MODIFIED)],
            handler(vec![("Last-Modified", LAST_MODIFIED)], "payload"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NotModified);
        assert!(response.body_ref().is_empty());
    }

    #[tokio::test]
    async fn newer_client_copy_replies_304() {
        let response = run(
            CacheMiddleware::default(),
            &[("If-Modified-Since", LATER)],
            handler(vec![("Last-Modified", LAST_MODIFIED)], "payload"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NotModified);
    }

    #[tokio::test]
    async fn stale_client_copy_keeps_200() {
        let response = run(
            CacheMiddleware::default(),
            &[("If-Modified-Since", EARLIER)],
            handler(vec![("Last-Modified", LAST_MODIFIED)], "payload"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body_ref(), b"payload");
    }

    #[tokio::test]
    async fn numeric_last_modified_is_accepted() {
        // 1652184000 == Tue, 10 May 2022 12:00:00 GMT
        let response = run(
            CacheMiddleware::default(),
            &[("If-Modified-Since", LAST_MODIFIED)],
            handler(vec![("Last-Modified", "1652184000")], "payload"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NotModified);
    }

    #[tokio::test]
    async fn malformed_if_modified_since_is_ignored() {
        let response = run(
            CacheMiddleware::default(),
            &[("If-Modified-Since", "definitely not a date")],
            handler(vec![("Last-Modified", LAST_MODIFIED)], "payload"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::Ok);
    }

    #[tokio::test]
    async fn etag_miss_still_consults_last_modified() {
        let response = run(
            CacheMiddleware::default(),
            &[
                ("If-None-Match", "\"other\""),
                ("If-Modified-Since", LAST_MODIFIED),
            ],
            handler(
                vec![("ETag", "\"abc\""), ("Last-Modified", LAST_MODIFIED)],
                "payload",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NotModified);
    }

    #[tokio::test]
    async fn etag_hit_wins_over_stale_client_date() {
        // The client's If-Modified-Since is older than Last-Modified, so the
        // date check alone would keep the 200. A matching tag must still
        // short-circuit to 304 without re-consulting dates.
        let response = run(
            CacheMiddleware::default(),
            &[
                ("If-None-Match", "\"abc\""),
                ("If-Modified-Since", EARLIER),
            ],
            handler(
                vec![("ETag", "\"abc\""), ("Last-Modified", LAST_MODIFIED)],
                "payload",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NotModified);
        assert!(response.body_ref().is_empty());
    }

    #[test]
    fn scope_parsing() {
        assert_eq!("public".parse::<Scope>().unwrap(), Scope::Public);
        assert_eq!("private".parse::<Scope>().unwrap(), Scope::Private);
        assert!(matches!(
            "unknown".parse::<Scope>(),
            Err(CacheError::InvalidScope(_))
        ));
    }

    #[test]
    fn wildcard_and_list_matching() {
        assert!(if_none_match_hit("\"a\"", "\"a\""));
        assert!(if_none_match_hit("\"a\"", "\"b\", \"a\""));
        assert!(if_none_match_hit("\"a\"", "*"));
        assert!(!if_none_match_hit("\"a\"", "\"b\", \"c\""));
    }
}
