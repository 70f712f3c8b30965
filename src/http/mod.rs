//! HTTP/1.1 wire semantics.
//!
//! This module provides the protocol primitives shared by request handling:
//! [`Method`], [`StatusCode`], [`HeaderMap`], [`Version`], [`Request`] and
//! [`Response`], plus the stateless header toolkits in [`accept`], [`date`],
//! [`range`], [`status`] and [`query`].

use std::fmt;

pub mod accept;
pub mod date;
pub mod headers;
pub mod query;
pub mod range;
pub mod request;
pub mod response;
pub mod status;
pub mod version;

pub use accept::{AcceptKind, AcceptList, AcceptValue};
pub use date::HttpDate;
pub use headers::HeaderMap;
pub use range::{ByteRange, ByteRanges, RangeError};
pub use request::Request;
pub use response::Response;
pub use status::{StatusError, ValidStatus};
pub use version::Version;

/// An HTTP response status code from the standard registry.
///
/// # Examples
///
/// ```
/// use wirecore::http::StatusCode;
///
/// let status = StatusCode::Ok;
/// assert_eq!(status.as_u16(), 200);
/// assert_eq!(status.canonical_reason(), "OK");
/// assert!(status.is_success());
/// assert_eq!(StatusCode::from_u16(416), Some(StatusCode::RangeNotSatisfiable));
/// assert_eq!(StatusCode::from_u16(299), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    // 1xx Informational
    Continue = 100,
    SwitchingProtocols = 101,

    // 2xx Success
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NonAuthoritativeInformation = 203,
    NoContent = 204,
    ResetContent = 205,
    PartialContent = 206,

    // 3xx Redirection
    MultipleChoices = 300,
    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    NotModified = 304,
    UseProxy = 305,
    TemporaryRedirect = 307,
    PermanentRedirect = 308,

    // 4xx Client Error
    BadRequest = 400,
    Unauthorized = 401,
    PaymentRequired = 402,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    NotAcceptable = 406,
    ProxyAuthenticationRequired = 407,
    RequestTimeout = 408,
    Conflict = 409,
    Gone = 410,
    LengthRequired = 411,
    PreconditionFailed = 412,
    PayloadTooLarge = 413,
    UriTooLong = 414,
    UnsupportedMediaType = 415,
    RangeNotSatisfiable = 416,
    ExpectationFailed = 417,
    UnprocessableEntity = 422,
    TooManyRequests = 429,
    RequestHeaderFieldsTooLarge = 431,

    // 5xx Server Error
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
    GatewayTimeout = 504,
    HttpVersionNotSupported = 505,
}

impl StatusCode {
    /// Looks up a registered status code.
    pub fn from_u16(code: u16) -> Option<Self> {
        Some(match code {
            100 => Self::Continue,
            101 => Self::SwitchingProtocols,
            200 => Self::Ok,
            201 => Self::Created,
            202 => Self::Accepted,
            203 => Self::NonAuthoritativeInformation,
            204 => Self::NoContent,
            205 => Self::ResetContent,
            206 => Self::PartialContent,
            300 => Self::MultipleChoices,
            301 => Self::MovedPermanently,
            302 => Self::Found,
            303 => Self::SeeOther,
            304 => Self::NotModified,
            305 => Self::UseProxy,
            307 => Self::TemporaryRedirect,
            308 => Self::PermanentRedirect,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            402 => Self::PaymentRequired,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            406 => Self::NotAcceptable,
            407 => Self::ProxyAuthenticationRequired,
            408 => Self::RequestTimeout,
            409 => Self::Conflict,
            410 => Self::Gone,
            411 => Self::LengthRequired,
            412 => Self::PreconditionFailed,
            413 => Self::PayloadTooLarge,
            414 => Self::UriTooLong,
            415 => Self::UnsupportedMediaType,
            416 => Self::RangeNotSatisfiable,
            417 => Self::ExpectationFailed,
            422 => Self::UnprocessableEntity,
            429 => Self::TooManyRequests,
            431 => Self::RequestHeaderFieldsTooLarge,
            500 => Self::InternalServerError,
            501 => Self::NotImplemented,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            504 => Self::GatewayTimeout,
            505 => Self::HttpVersionNotSupported,
            _ => return None,
        })
    }

    /// Returns the numeric status code as a `u16`.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the canonical reason phrase for this status code.
    pub fn canonical_reason(self) -> &'static str {
        match self {
            Self::Continue => "Continue",
            Self::SwitchingProtocols => "Switching Protocols",
            Self::Ok => "OK",
            Self::Created => "Created",
            Self::Accepted => "Accepted",
            Self::NonAuthoritativeInformation => "Non-Authoritative Information",
            Self::NoContent => "No Content",
            Self::ResetContent => "Reset Content",
            Self::PartialContent => "Partial Content",
            Self::MultipleChoices => "Multiple Choices",
            Self::MovedPermanently => "Moved Permanently",
            Self::Found => "Found",
            Self::SeeOther => "See Other",
            Self::NotModified => "Not Modified",
            Self::UseProxy => "Use Proxy",
            Self::TemporaryRedirect => "Temporary Redirect",
            Self::PermanentRedirect => "Permanent Redirect",
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Unauthorized",
            Self::PaymentRequired => "Payment Required",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::NotAcceptable => "Not Acceptable",
            Self::ProxyAuthenticationRequired => "Proxy Authentication Required",
            Self::RequestTimeout => "Request Timeout",
            Self::Conflict => "Conflict",
            Self::Gone => "Gone",
            Self::LengthRequired => "Length Required",
            Self::PreconditionFailed => "Precondition Failed",
            Self::PayloadTooLarge => "Payload Too Large",
            Self::UriTooLong => "URI Too Long",
            Self::UnsupportedMediaType => "Unsupported Media Type",
            Self::RangeNotSatisfiable => "Range Not Satisfiable",
            Self::ExpectationFailed => "Expectation Failed",
            Self::UnprocessableEntity => "Unprocessable Entity",
            Self::TooManyRequests => "Too Many Requests",
            Self::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            Self::InternalServerError => "Internal Server Error",
            Self::NotImplemented => "Not Implemented",
            Self::BadGateway => "Bad Gateway",
            Self::ServiceUnavailable => "Service Unavailable",
            Self::GatewayTimeout => "Gateway Timeout",
            Self::HttpVersionNotSupported => "HTTP Version Not Supported",
        }
    }

    /// Returns the longer, human-readable message for this status code.
    pub fn description(self) -> &'static str {
        match self {
            Self::Continue => "Request received, please continue",
            Self::SwitchingProtocols => "Switching to new protocol; obey Upgrade header",
            Self::Ok => "Request fulfilled, document follows",
            Self::Created => "Document created, URL follows",
            Self::Accepted => "Request accepted, processing continues off-line",
            Self::NonAuthoritativeInformation => "Request fulfilled from cache",
            Self::NoContent => "Request fulfilled, nothing follows",
            Self::ResetContent => "Clear input form for further input.",
            Self::PartialContent => "Partial content follows.",
            Self::MultipleChoices => "Object has several resources -- see URI list",
            Self::MovedPermanently => "Object moved permanently -- see URI list",
            Self::Found => "Object moved temporarily -- see URI list",
            Self::SeeOther => "Object moved -- see Method and URL list",
            Self::NotModified => "Document has not changed since given time",
            Self::UseProxy => "You must use proxy specified in Location to access this resource.",
            Self::TemporaryRedirect => "Object moved temporarily -- see URI list",
            Self::PermanentRedirect => "Object moved permanently -- see URI list",
            Self::BadRequest => "Bad request syntax or unsupported method",
            Self::Unauthorized => "No permission -- see authorization schemes",
            Self::PaymentRequired => "No payment -- see charging schemes",
            Self::Forbidden => "Request forbidden -- authorization will not help",
            Self::NotFound => "Nothing matches the given URI",
            Self::MethodNotAllowed => "Specified method is invalid for this resource.",
            Self::NotAcceptable => "URI not available in preferred format.",
            Self::ProxyAuthenticationRequired => "You must authenticate with this proxy before proceeding.",
            Self::RequestTimeout => "Request timed out; try again later.",
            Self::Conflict => "Request conflict.",
            Self::Gone => "URI no longer exists and has been permanently removed.",
            Self::LengthRequired => "Client must specify Content-Length.",
            Self::PreconditionFailed => "Precondition in headers is false.",
            Self::PayloadTooLarge => "Entity is too large.",
            Self::UriTooLong => "URI is too long.",
            Self::UnsupportedMediaType => "Entity body in unsupported format.",
            Self::RangeNotSatisfiable => "Cannot satisfy request range.",
            Self::ExpectationFailed => "Expect condition could not be satisfied.",
            Self::UnprocessableEntity => "Entity is well-formed but semantically invalid.",
            Self::TooManyRequests => "The user has sent too many requests in a given amount of time.",
            Self::RequestHeaderFieldsTooLarge => "Header fields are too large to process.",
            Self::InternalServerError => "Server got itself in trouble",
            Self::NotImplemented => "Server does not support this operation",
            Self::BadGateway => "Invalid responses from another server/proxy.",
            Self::ServiceUnavailable => "The server cannot process the request due to a high load",
            Self::GatewayTimeout => "The gateway server did not receive a timely response",
            Self::HttpVersionNotSupported => "Cannot fulfill request.",
        }
    }

    /// Returns `true` for 2xx codes.
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    /// Returns `true` for 4xx and 5xx codes.
    pub fn is_error(self) -> bool {
        self.as_u16() >= 400
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.canonical_reason())
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> u16 {
        code.as_u16()
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = u16;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_u16(code).ok_or(code)
    }
}

/// The method token of a request line.
///
/// Registered methods are unit variants; any other RFC 9110 token is kept
/// verbatim in [`Method::Extension`]. Method names are case-sensitive.
///
/// ```
/// use wirecore::http::Method;
///
/// assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
/// assert_eq!("PURGE".parse::<Method>().unwrap().as_str(), "PURGE");
/// assert!("BAD METHOD".parse::<Method>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Connect,
    Trace,
    Extension(String),
}

impl Method {
    /// Returns the method as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Connect => "CONNECT",
            Self::Trace => "TRACE",
            Self::Extension(s) => s.as_str(),
        }
    }
}

/// `tchar` from RFC 9110 §5.6.2.
pub(crate) fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// A method string that is not a valid HTTP token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid method token: {0:?}")]
pub struct InvalidMethod(pub String);

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "PATCH" => Self::Patch,
            "CONNECT" => Self::Connect,
            "TRACE" => Self::Trace,
            other if !other.is_empty() && other.bytes().all(is_token_char) => {
                Self::Extension(other.to_owned())
            }
            other => return Err(InvalidMethod(other.to_owned())),
        })
    }
}

impl AsRef<str> for Method {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
