//! # cachet
//!
//! HTTP conditional-caching middleware for async Rust pipelines.
//!
//! The crate revolves around [`cache::CacheMiddleware`]: a stateless
//! middleware layer that injects a `Cache-Control` header into outgoing
//! responses and answers conditional requests (`If-None-Match`,
//! `If-Modified-Since`) with `304 Not Modified` when the client's cached
//! copy is still valid. The [`cache::provider`] module offers standalone
//! helpers for setting caching headers explicitly.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use cachet::{Request, Response, StatusCode};
//! use cachet::cache::{CacheMiddleware, Scope};
//! use cachet::context::Context;
//! use cachet::middleware::{MiddlewareHandler, Next, from_middleware};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache = from_middleware(Arc::new(CacheMiddleware::new(Scope::Public, 86400)));
//! let handler: MiddlewareHandler = Arc::new(|_ctx: Context, _next: Next| {
//!     Box::pin(async { Response::new(StatusCode::Ok).body("hello") })
//! });
//!
//! let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
//! let (request, _) = Request::parse(raw).unwrap();
//!
//! let next = Next::new(vec![cache, handler]);
//! let response = next.run(Context::new(request)).await;
//! assert_eq!(response.headers().get("cache-control"), Some("public, max-age=86400"));
//! # }
//! ```

pub mod cache;
pub mod context;
pub mod http;
pub mod middleware;

pub use cache::{CacheError, CacheMiddleware, Scope};
pub use http::{Headers, Method, Request, Response, StatusCode};
