//! Status-line validation.
//!
//! Handlers may express a response status as a bare code (`404`) or a code
//! followed by a custom reason phrase (`"200 Just Fine"`). [`ValidStatus`]
//! checks the code and fills in the registry reason and message.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::StatusCode;

/// Errors raised for an unusable response status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("illegal response status {0:?} (non-numeric)")]
    Format(String),

    #[error("illegal response status {0} (out of range)")]
    Range(String),
}

impl StatusError {
    /// The status the caller should answer with.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BadRequest
    }
}

/// A validated `(code, reason, message)` triple.
///
/// Unregistered codes inside 100–599 are legal and carry an empty reason
/// and message.
///
/// # Examples
///
/// ```
/// use wirecore::http::status::{StatusError, ValidStatus};
///
/// let status: ValidStatus = "200 Just Fine".parse().unwrap();
/// assert_eq!(status.code(), 200);
/// assert_eq!(status.reason(), "Just Fine");
/// assert_eq!(status.message(), "Request fulfilled, document follows");
///
/// assert!(matches!(ValidStatus::from_code(999), Err(StatusError::Range(_))));
/// assert!(matches!("OK".parse::<ValidStatus>(), Err(StatusError::Format(_))));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidStatus {
    code: u16,
    reason: String,
    message: &'static str,
}

impl ValidStatus {
    /// Validates a numeric code and attaches the registry reason.
    ///
    /// # Errors
    ///
    /// [`StatusError::Range`] if `code` is outside 100–599.
    pub fn from_code(code: i64) -> Result<Self, StatusError> {
        let code = u16::try_from(code)
            .ok()
            .filter(|c| (100..=599).contains(c))
            .ok_or_else(|| StatusError::Range(code.to_string()))?;
        let (reason, message) = StatusCode::from_u16(code)
            .map_or(("", ""), |s| (s.canonical_reason(), s.description()));
        Ok(Self {
            code,
            reason: reason.to_owned(),
            message,
        })
    }

    /// Validates a status string: a code, optionally followed by a space and a
    /// reason phrase. An empty string means `200`.
    ///
    /// # Errors
    ///
    /// [`StatusError::Format`] if the leading token is not an integer;
    /// [`StatusError::Range`] if it is outside 100–599.
    pub fn parse(status: &str) -> Result<Self, StatusError> {
        let status = status.trim();
        if status.is_empty() {
            return Ok(Self::default());
        }

        let (code, reason) = match status.split_once(' ') {
            Some((code, reason)) => (code, Some(reason.trim())),
            None => (status, None),
        };

        let digits = code.strip_prefix(['+', '-']).unwrap_or(code);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StatusError::Format(status.to_owned()));
        }
        // Digit runs too long for i64 are still numeric, just out of range.
        let code = code
            .parse::<i64>()
            .map_err(|_| StatusError::Range(code.to_owned()))?;

        let mut valid = Self::from_code(code)?;
        if let Some(reason) = reason.filter(|r| !r.is_empty()) {
            valid.reason = reason.to_owned();
        }
        Ok(valid)
    }

    /// The numeric code.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The reason phrase sent on the status line.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// The registry's explanatory message, or `""` for unregistered codes.
    pub fn message(&self) -> &'static str {
        self.message
    }

    /// The registered [`StatusCode`], if any.
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.code)
    }

    /// Splits into `(code, reason, message)`.
    pub fn into_parts(self) -> (u16, String, &'static str) {
        (self.code, self.reason, self.message)
    }
}

impl Default for ValidStatus {
    fn default() -> Self {
        StatusCode::Ok.into()
    }
}

impl From<StatusCode> for ValidStatus {
    fn from(status: StatusCode) -> Self {
        Self {
            code: status.as_u16(),
            reason: status.canonical_reason().to_owned(),
            message: status.description(),
        }
    }
}

impl FromStr for ValidStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<i64> for ValidStatus {
    type Error = StatusError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

/// Validates an optional status string; `None` means `200`.
pub fn valid_status(status: Option<&str>) -> Result<ValidStatus, StatusError> {
    status.map_or_else(|| Ok(ValidStatus::default()), ValidStatus::parse)
}

impl fmt::Display for ValidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}
