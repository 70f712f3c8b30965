//! HTTP/1.1 response builder.
//!
//! Provides a fluent builder API for constructing HTTP responses, serving
//! byte ranges of an entity, tracking the response deadline and serializing
//! the result to a byte buffer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use super::date::HttpDate;
use super::range::{ByteRange, ByteRanges, RangeError};
use super::status::{StatusError, ValidStatus};
use super::{HeaderMap, StatusCode};

/// Default deadline for a response, matching [`Config::default`](crate::config::Config).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

static BOUNDARY_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_boundary() -> String {
    let seq = BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed);
    let nanos = chrono::Utc::now().timestamp_subsec_nanos();
    format!("wirecore-{nanos:08x}{seq:08x}")
}

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use wirecore::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("content-type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Type: application/json\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: ValidStatus,
    headers: HeaderMap,
    body: Bytes,
    keep_alive: bool,
    started: Instant,
    timeout: Duration,
    timed_out: bool,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status: status.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            keep_alive: true,
            started: Instant::now(),
            timeout: DEFAULT_TIMEOUT,
            timed_out: false,
        }
    }

    /// Replaces the status with a validated `"<code> [reason]"` string.
    ///
    /// # Errors
    ///
    /// Returns the [`StatusError`] and leaves the current status untouched.
    pub fn set_status(&mut self, status: &str) -> Result<(), StatusError> {
        self.status = ValidStatus::parse(status)?;
        Ok(())
    }

    /// Sets a response header, replacing any previous value for the name.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets a header in-place. Intended for code that receives a `Response`
    /// from downstream and needs to decorate it without consuming it.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Sets the response body from a string.
    ///
    /// The `Content-Length` header is written automatically by [`into_bytes`](Self::into_bytes).
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Bytes::from(body.into());
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Controls whether the `Connection: keep-alive` or `Connection: close` header is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets how long this response may stay in flight; see [`check_timeout`](Self::check_timeout).
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the validated status of this response.
    pub fn status(&self) -> &ValidStatus {
        &self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the response headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the body bytes.
    pub fn body_ref(&self) -> &Bytes {
        &self.body
    }

    /// Flags the response as timed out once its deadline has passed.
    ///
    /// Returns `true` if the response is (now) timed out. Called
    /// periodically by a timeout monitor over every loaded response.
    pub fn check_timeout(&mut self) -> bool {
        if !self.timed_out && self.started.elapsed() > self.timeout {
            debug!(status = %self.status, timeout = ?self.timeout, "response timed out");
            self.timed_out = true;
        }
        self.timed_out
    }

    /// Returns `true` once [`check_timeout`](Self::check_timeout) has flagged this response.
    pub fn is_timed_out(&self) -> bool {
        self.timed_out
    }

    /// Serves `entity`, or the parts of it selected by `ranges`.
    ///
    /// - [`ByteRanges::Whole`] → the status is kept and the full entity sent.
    /// - One range → `206` with `Content-Range`.
    /// - Several ranges → `206` with a `multipart/byteranges` body; any
    ///   `Content-Type` already set moves into each part.
    /// - [`RangeError::Unsatisfiable`] → `416` with `Content-Range: bytes */<len>`.
    ///
    /// Ranges reaching past the end of `entity` are trimmed to it; if none
    /// overlap it at all the answer is `416`. `Accept-Ranges: bytes` is always
    /// advertised.
    ///
    /// # Examples
    ///
    /// ```
    /// use wirecore::http::{Response, StatusCode};
    /// use wirecore::http::range::parse_ranges;
    ///
    /// let entity = "0123456789";
    /// let ranges = parse_ranges(Some("bytes=3-6"), entity.len() as u64);
    /// let response = Response::new(StatusCode::Ok).serve_entity(entity, ranges);
    ///
    /// assert_eq!(response.status().code(), 206);
    /// assert_eq!(response.headers().get("content-range"), Some("bytes 3-6/10"));
    /// assert_eq!(response.body_ref().as_ref(), b"3456");
    /// ```
    #[must_use]
    pub fn serve_entity(
        mut self,
        entity: impl Into<Bytes>,
        ranges: Result<ByteRanges, RangeError>,
    ) -> Self {
        let entity: Bytes = entity.into();
        let length = entity.len() as u64;
        self.headers.insert("Accept-Ranges", "bytes");

        // Ranges parsed against another length are trimmed to this entity.
        let ranges = match ranges {
            Ok(ByteRanges::Partial(ranges)) => {
                let fitted: Vec<ByteRange> =
                    ranges.iter().filter_map(|range| range.clamp_to(length)).collect();
                if fitted.len() != ranges.len() {
                    debug!(length, requested = ranges.len(), kept = fitted.len(), "ranges trimmed to entity");
                }
                if fitted.is_empty() {
                    Err(RangeError::Unsatisfiable { content_length: length })
                } else {
                    Ok(ByteRanges::Partial(fitted))
                }
            }
            other => other,
        };

        match ranges {
            Err(RangeError::Unsatisfiable { .. }) => {
                self.status = StatusCode::RangeNotSatisfiable.into();
                self.headers.insert("Content-Range", format!("bytes */{length}"));
                self.body = Bytes::new();
            }
            Ok(ByteRanges::Whole) => {
                self.body = entity;
            }
            Ok(ByteRanges::Partial(ranges)) if ranges.len() == 1 => {
                let range = ranges[0];
                self.status = StatusCode::PartialContent.into();
                self.headers.insert("Content-Range", range.content_range(length));
                self.body = range.as_range().map_or_else(Bytes::new, |span| entity.slice(span));
            }
            Ok(ByteRanges::Partial(ranges)) => {
                let boundary = next_boundary();
                let part_type = self.headers.remove("Content-Type");
                let mut body = BytesMut::new();
                for range in &ranges {
                    body.put(format!("--{boundary}\r\n").as_bytes());
                    if let Some(content_type) = &part_type {
                        body.put(format!("Content-Type: {content_type}\r\n").as_bytes());
                    }
                    body.put(format!("Content-Range: {}\r\n\r\n", range.content_range(length)).as_bytes());
                    if let Some(span) = range.as_range() {
                        body.put(&entity[span]);
                    }
                    body.put(&b"\r\n"[..]);
                }
                body.put(format!("--{boundary}--\r\n").as_bytes());

                self.status = StatusCode::PartialContent.into();
                self.headers.insert(
                    "Content-Type",
                    format!("multipart/byteranges; boundary={boundary}"),
                );
                self.body = body.freeze();
            }
        }
        self
    }

    /// Serializes the response into a `BytesMut` buffer using HTTP/1.1 wire format.
    ///
    /// Automatically adds:
    /// - `Date` in RFC 1123 format, unless already set.
    /// - `Content-Type: text/plain; charset=utf-8` if the body is non-empty and no
    ///   `Content-Type` header was set.
    /// - `Content-Length: <n>` (always written).
    /// - `Connection: keep-alive` or `Connection: close`.
    pub fn into_bytes(mut self) -> BytesMut {
        let content_length = self.body.len();

        self.headers.set_default("Date", HttpDate::now().to_string());
        if !self.body.is_empty() {
            self.headers
                .set_default("Content-Type", "text/plain; charset=utf-8");
        }

        let connection = if self.keep_alive {
            "keep-alive"
        } else {
            "close"
        };
        self.headers.insert("Connection", connection);
        self.headers
            .insert("Content-Length", content_length.to_string());

        let estimated_size = 128 + self.headers.len() * 64 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        // Status line
        buf.put(format!("HTTP/1.1 {}\r\n", self.status).as_bytes());

        // Headers
        buf.put(self.headers.to_string().as_bytes());

        // Header/body separator
        buf.put(&b"\r\n"[..]);

        // Body
        if !self.body.is_empty() {
            buf.put(self.body);
        }

        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}
