//! # wirecore
//!
//! The protocol core of an HTTP/1.1 web framework: the wire-semantics
//! toolkit every request passes through, and a per-task serving context that
//! gives each concurrently running handler its own "current request" and
//! "current response".
//!
//! ## Quick Start
//!
//! ```rust
//! use wirecore::context::ServingContext;
//! use wirecore::http::accept::AcceptKind;
//! use wirecore::http::{Request, Response, StatusCode};
//! use wirecore::Config;
//!
//! let config = Config::default();
//! let serving: ServingContext = ServingContext::new();
//!
//! let raw = b"GET /report HTTP/1.1\r\nAccept: text/csv;q=0.5, application/json\r\nRange: bytes=0-3\r\n\r\n";
//! let (request, _body_offset) = Request::parse_with(raw, &config).unwrap();
//!
//! let task = serving.task();
//! task.load(request, Response::new(StatusCode::Ok).timeout(config.response_timeout()));
//!
//! let entity = r#"{"rows":[]}"#;
//! let (content_type, ranges) = task
//!     .with_request(|req| {
//!         let accept = req.accept(AcceptKind::Accept);
//!         let content_type = accept.preferred(&["text/csv", "application/json"]);
//!         (content_type, req.ranges(entity.len() as u64, &config))
//!     })
//!     .unwrap();
//! assert_eq!(content_type, Some("application/json"));
//!
//! task.with_response_mut(|resp| {
//!     let served = std::mem::take(resp)
//!         .header("Content-Type", content_type.unwrap_or("text/plain"))
//!         .serve_entity(entity, ranges);
//!     *resp = served;
//! })
//! .unwrap();
//!
//! let status = task.with_response(|resp| resp.status().code()).unwrap();
//! assert_eq!(status, 206);
//! task.clear();
//! ```

pub mod config;
pub mod context;
pub mod http;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use config::{Config, ConfigError};
pub use context::{ContextError, ServingContext, Slot, TaskContext};
pub use http::{HeaderMap, Method, Request, Response, StatusCode, Version};
