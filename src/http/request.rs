//! HTTP/1.1 request-line and request-head parsing.
//!
//! [`RequestLine::parse`] handles a bare `METHOD SP target SP HTTP-Version`
//! line. [`Request::parse`] decodes a full request head with [`httparse`] and
//! runs its target through the same normalization.

use bytes::Bytes;
use thiserror::Error;
use tracing::trace;
use url::Url;

use super::accept::{AcceptKind, AcceptList};
use super::query::{ParamMap, ParamValue, parse_query_string, unquote_path};
use super::range::{ByteRanges, RangeError, parse_ranges_with_limit};
use super::{HeaderMap, Method, StatusCode, Version};
use crate::config::Config;

/// A request line that cannot be split into method, target and protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestLineError {
    #[error("malformed request line: {0:?}")]
    Malformed(String),
}

/// Errors that can occur while parsing an HTTP/1.1 request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete — more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error(transparent)]
    RequestLine(#[from] RequestLineError),
}

impl RequestError {
    /// The status the caller should answer with, or `None` when more input
    /// is needed.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Incomplete => None,
            Self::Parse(httparse::Error::TooManyHeaders) => {
                Some(StatusCode::RequestHeaderFieldsTooLarge)
            }
            _ => Some(StatusCode::BadRequest),
        }
    }
}

/// Splits a request target into a decoded path and a raw query string.
///
/// - `*` (as in `OPTIONS *`) is returned untouched.
/// - An absolute URI loses its scheme, authority and fragment.
/// - The path is percent-decoded; `;params` on the last segment survive.
///
/// ```
/// use wirecore::http::request::split_target;
///
/// assert_eq!(split_target("*"), ("*".to_owned(), String::new()));
/// assert_eq!(
///     split_target("http://example.com:8080/a%20b;v=1?x=1#top"),
///     ("/a b;v=1".to_owned(), "x=1".to_owned())
/// );
/// ```
pub fn split_target(target: &str) -> (String, String) {
    if target == "*" {
        return (target.to_owned(), String::new());
    }

    if !target.starts_with('/') {
        if let Ok(url) = Url::parse(target) {
            if url.has_authority() {
                let query = url.query().unwrap_or("").to_owned();
                return (unquote_path(url.path()), query);
            }
        }
    }

    let without_fragment = target.split_once('#').map_or(target, |(head, _)| head);
    let (path, query) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));
    (unquote_path(path), query.to_owned())
}

/// The parts of a request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    /// Decoded path, or `*` for a server-wide request.
    pub path: String,
    /// Raw query string without the leading `?`; empty if absent.
    pub query_string: String,
    /// Protocol token as sent, e.g. `HTTP/1.1`.
    pub protocol: String,
}

impl RequestLine {
    /// Parses `METHOD SP request-target SP HTTP-Version`.
    ///
    /// # Examples
    ///
    /// ```
    /// use wirecore::http::{Method, request::RequestLine};
    ///
    /// let line = RequestLine::parse("GET /this%20path?a=1 HTTP/1.1").unwrap();
    /// assert_eq!(line.method, Method::Get);
    /// assert_eq!(line.path, "/this path");
    /// assert_eq!(line.query_string, "a=1");
    /// assert_eq!(line.protocol, "HTTP/1.1");
    /// ```
    ///
    /// # Errors
    ///
    /// [`RequestLineError::Malformed`] unless the line has exactly three
    /// whitespace-separated parts, a token method and an `HTTP/` protocol.
    pub fn parse(line: &str) -> Result<Self, RequestLineError> {
        let malformed = || RequestLineError::Malformed(line.to_owned());

        let mut parts = line.split_whitespace();
        let (Some(method), Some(target), Some(protocol), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let method: Method = method.parse().map_err(|_| malformed())?;
        if !protocol.starts_with("HTTP/") {
            return Err(malformed());
        }
        let (path, query_string) = split_target(target);

        Ok(Self {
            method,
            path,
            query_string,
            protocol: protocol.to_owned(),
        })
    }

    /// The protocol as a comparable [`Version`].
    pub fn version(&self) -> Version {
        Version::from_http(&self.protocol)
    }
}

/// A parsed HTTP/1.1 request.
///
/// # Examples
///
/// ```
/// use wirecore::http::request::Request;
///
/// let raw = b"GET /hello?name=world HTTP/1.1\r\nhost: localhost\r\n\r\n";
/// let (request, _offset) = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method().as_str(), "GET");
/// assert_eq!(request.path(), "/hello");
/// assert_eq!(request.param("name").and_then(|p| p.as_str()), Some("world"));
/// assert_eq!(request.headers().get("Host"), Some("localhost"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query_string: String,
    protocol: Version,
    headers: HeaderMap,
    params: ParamMap,
    body: Bytes,
}

impl Request {
    /// Builds a request with no headers or body from a parsed request line.
    pub fn new(line: RequestLine) -> Self {
        let protocol = line.version();
        let params = parse_query_string(&line.query_string);
        Self {
            method: line.method,
            path: line.path,
            query_string: line.query_string,
            protocol,
            headers: HeaderMap::new(),
            params,
            body: Bytes::new(),
        }
    }

    /// Parses a raw HTTP/1.1 request using the default [`Config`].
    ///
    /// Returns the parsed `Request` and the byte offset at which the body begins
    /// in `buf` (i.e. immediately after the `\r\n\r\n` header terminator).
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        Self::parse_with(buf, &Config::default())
    }

    /// Parses a raw HTTP/1.1 request, accepting at most `config.max_headers` headers.
    ///
    /// Repeated header lines are folded into one comma-separated value.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`] — more data is needed to complete the request headers.
    /// - [`RequestError::Parse`] — the data is malformed and cannot be parsed.
    /// - [`RequestError::MissingField`] — a required field (method, path, version) is absent.
    /// - [`RequestError::RequestLine`] — the method is not a valid token.
    pub fn parse_with(buf: &[u8], config: &Config) -> Result<(Self, usize), RequestError> {
        let mut headers = vec![httparse::EMPTY_HEADER; config.max_headers];
        let mut raw_req = httparse::Request::new(&mut headers);

        let body_offset = match raw_req.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let raw_method = raw_req
            .method
            .ok_or(RequestError::MissingField { field: "method" })?;
        let method: Method = raw_method
            .parse()
            .map_err(|_| RequestLineError::Malformed(raw_method.to_owned()))?;

        let target = raw_req
            .path
            .ok_or(RequestError::MissingField { field: "path" })?;
        let (path, query_string) = split_target(target);

        let minor = raw_req
            .version
            .ok_or(RequestError::MissingField { field: "version" })?;

        let mut header_map = HeaderMap::with_capacity(raw_req.headers.len());
        for header in raw_req.headers.iter() {
            let Ok(value) = std::str::from_utf8(header.value) else {
                trace!(name = header.name, "non UTF-8 header value dropped");
                continue;
            };
            let folded = match header_map.get(header.name) {
                Some(existing) => format!("{existing}, {value}"),
                None => value.to_owned(),
            };
            header_map.insert(header.name, folded);
        }

        let params = parse_query_string(&query_string);
        let body = Bytes::copy_from_slice(&buf[body_offset..]);
        trace!(%method, %path, headers = header_map.len(), "request head parsed");

        Ok((
            Self {
                method,
                path,
                query_string,
                protocol: Version::from_atoms([1, minor]),
                headers: header_map,
                params,
                body,
            },
            body_offset,
        ))
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the decoded request path (without the query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string (without the leading `?`); empty if none was sent.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Returns the protocol version, e.g. `1.1`.
    pub fn protocol(&self) -> &Version {
        &self.protocol
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the request headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns every decoded query parameter.
    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    /// Returns a decoded query parameter by key.
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Returns the request body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the request body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Returns `true` if the connection should be kept alive after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive. HTTP/1.0 defaults to close unless
    /// `Connection: keep-alive` is explicitly set.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(conn) => conn.eq_ignore_ascii_case("keep-alive"),
            None => self.protocol >= "1.1",
        }
    }

    /// Returns the value of the `Content-Length` header parsed as a `usize`, if present.
    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length")?.trim().parse().ok()
    }

    /// Interprets the `Range` header against an entity of `content_length` bytes.
    pub fn ranges(&self, content_length: u64, config: &Config) -> Result<ByteRanges, RangeError> {
        parse_ranges_with_limit(self.headers.get("range"), content_length, config.max_ranges)
    }

    /// Parses one of the `Accept*` headers; empty when the header is absent.
    pub fn accept(&self, kind: AcceptKind) -> AcceptList {
        AcceptList::parse(self.headers.get(kind.header_name()), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (req, offset) = Request::parse(raw).unwrap();
        assert_eq!(req.method().as_str(), "GET");
        assert_eq!(req.path(), "/");
        assert_eq!(req.protocol().to_http(), "HTTP/1.1");
        assert_eq!(req.headers().get("host"), Some("localhost"));
        assert_eq!(offset, raw.len()); // no body
    }

    #[test]
    fn parse_query_params() {
        let raw = b"GET /search?q=rust&page=2&page=3 HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query_string(), "q=rust&page=2&page=3");
        assert_eq!(req.param("q"), Some(&ParamValue::Text("rust".into())));
        assert_eq!(
            req.param("page"),
            Some(&ParamValue::List(vec!["2".into(), "3".into()]))
        );
    }

    #[test]
    fn incomplete_request() {
        let raw = b"GET / HTTP/1.1\r\nHost:";
        let err = Request::parse(raw).unwrap_err();
        assert!(matches!(err, RequestError::Incomplete));
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn too_many_headers() {
        let config = Config {
            max_headers: 1,
            ..Config::default()
        };
        let raw = b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\n\r\n";
        let err = Request::parse_with(raw, &config).unwrap_err();
        assert_eq!(err.status_code(), Some(StatusCode::RequestHeaderFieldsTooLarge));
    }

    #[test]
    fn repeated_headers_are_folded() {
        let raw = b"GET / HTTP/1.1\r\nAccept: text/html\r\naccept: text/plain;q=0.5\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert_eq!(req.headers().get("Accept"), Some("text/html, text/plain;q=0.5"));
        let order: Vec<_> = req
            .accept(AcceptKind::Accept)
            .iter()
            .map(|v| v.value().to_owned())
            .collect();
        assert_eq!(order, vec!["text/html", "text/plain"]);
    }

    #[test]
    fn keep_alive_follows_protocol_default() {
        let (req, _) = Request::parse(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
        assert!(req.is_keep_alive());
        let (req, _) = Request::parse(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert!(!req.is_keep_alive());
    }

    #[test]
    fn connection_close() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert!(!req.is_keep_alive());
    }

    #[test]
    fn content_length() {
        let raw = b"POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello";
        let (req, body_offset) = Request::parse(raw).unwrap();
        assert_eq!(req.content_length(), Some(5));
        assert_eq!(&raw[body_offset..], b"hello");
        assert_eq!(req.body().as_ref(), b"hello");
    }

    #[test]
    fn range_header_through_request() {
        let raw = b"GET /file HTTP/1.1\r\nrange: bytes=-5\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        let ranges = req.ranges(10, &Config::default()).unwrap();
        assert_eq!(ranges.as_slice().map(<[_]>::len), Some(1));
        assert_eq!(ranges.as_slice().unwrap()[0].start, 5);
    }

    #[test]
    fn request_line_absolute_uri() {
        let line = RequestLine::parse("GET http://www.example.com/a%2Fb/c;x=1?q=1#frag HTTP/1.0").unwrap();
        assert_eq!(line.path, "/a/b/c;x=1");
        assert_eq!(line.query_string, "q=1");
        assert_eq!(line.version(), Version::new("1.0"));
    }

    #[test]
    fn request_line_server_wide_target() {
        let line = RequestLine::parse("OPTIONS * HTTP/1.1").unwrap();
        assert_eq!(line.method, Method::Options);
        assert_eq!(line.path, "*");
        assert_eq!(line.query_string, "");
    }

    #[test]
    fn request_line_drops_fragment() {
        let line = RequestLine::parse("GET /page#section HTTP/1.1").unwrap();
        assert_eq!(line.path, "/page");
        assert_eq!(line.query_string, "");
    }

    #[test]
    fn malformed_request_lines() {
        for line in ["", "GET /", "GET / HTTP/1.1 extra", "GET / FTP/1.0", "G(T / HTTP/1.1"] {
            assert!(
                matches!(RequestLine::parse(line), Err(RequestLineError::Malformed(_))),
                "{line:?}"
            );
        }
    }

    #[test]
    fn request_from_line() {
        let line = RequestLine::parse("GET /map?10,20 HTTP/1.1").unwrap();
        let req = Request::new(line);
        assert_eq!(req.param("x"), Some(&ParamValue::Int(10)));
        assert_eq!(req.param("y"), Some(&ParamValue::Int(20)));
        assert!(req.is_keep_alive());
    }
}
