//! `Range: bytes=…` header parsing (RFC 9110 §14.1, RFC 2616 §14.16/§14.35).
//!
//! Three outcomes are kept apart:
//!
//! - [`ByteRanges::Partial`] — at least one satisfiable range; answer 206.
//! - [`ByteRanges::Whole`] — the header is absent or syntactically invalid and
//!   must be treated as if it was never sent; answer 200 with the full entity.
//! - [`RangeError::Unsatisfiable`] — the header is well-formed but every range
//!   starts past the end of the resource; answer 416.

use std::ops::Range;

use thiserror::Error;
use tracing::debug;

use super::StatusCode;

/// A half-open `[start, stop)` byte interval into a resource.
///
/// Always satisfies `start < stop <= content_length` for the length it was
/// parsed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub stop: u64,
}

impl ByteRange {
    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.stop - self.start
    }

    /// Always `false`; a parsed range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        self.stop == self.start
    }

    /// Returns the range as a slice index, suitable for `&body[range]`.
    ///
    /// `None` when an endpoint does not fit in `usize`, which only happens for
    /// resources past 4 GiB on 32-bit targets.
    pub fn as_range(&self) -> Option<Range<usize>> {
        Some(usize::try_from(self.start).ok()?..usize::try_from(self.stop).ok()?)
    }

    /// Trims the range to a resource of `content_length` bytes.
    ///
    /// `None` if nothing of the range lies inside the resource.
    pub fn clamp_to(&self, content_length: u64) -> Option<Self> {
        let stop = self.stop.min(content_length);
        (self.start < stop).then_some(Self { start: self.start, stop })
    }

    /// Formats the `Content-Range` value for this range, e.g. `bytes 3-6/10`.
    pub fn content_range(&self, content_length: u64) -> String {
        format!("bytes {}-{}/{content_length}", self.start, self.stop - 1)
    }
}

impl From<(u64, u64)> for ByteRange {
    fn from((start, stop): (u64, u64)) -> Self {
        Self { start, stop }
    }
}

/// The result of parsing a `Range` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteRanges {
    /// Serve the whole entity; the header was absent or is ignored.
    Whole,
    /// Serve these ranges, in header order.
    Partial(Vec<ByteRange>),
}

impl ByteRanges {
    /// Returns the ranges to serve, or `None` for the whole entity.
    pub fn as_slice(&self) -> Option<&[ByteRange]> {
        match self {
            Self::Whole => None,
            Self::Partial(ranges) => Some(ranges),
        }
    }
}

/// A well-formed `Range` header none of whose ranges fit the resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("no satisfiable byte range for a resource of {content_length} bytes")]
    Unsatisfiable { content_length: u64 },
}

impl RangeError {
    /// The status the caller should answer with (416).
    pub fn status_code(&self) -> StatusCode {
        StatusCode::RangeNotSatisfiable
    }
}

/// Upper bound on the number of specs accepted in one header; see [`parse_ranges_with_limit`].
pub const DEFAULT_MAX_RANGES: usize = 32;

/// Parses a `Range` header value against a resource of `content_length` bytes.
///
/// `None` or an empty header yields [`ByteRanges::Whole`].
///
/// # Examples
///
/// ```
/// use wirecore::http::range::{parse_ranges, ByteRange, ByteRanges, RangeError};
///
/// assert_eq!(
///     parse_ranges(Some("bytes=3-6"), 10),
///     Ok(ByteRanges::Partial(vec![ByteRange { start: 3, stop: 7 }]))
/// );
/// assert_eq!(parse_ranges(Some("bytes=-"), 10), Ok(ByteRanges::Whole));
/// assert_eq!(
///     parse_ranges(Some("bytes=9-20"), 5),
///     Err(RangeError::Unsatisfiable { content_length: 5 })
/// );
/// ```
///
/// # Errors
///
/// [`RangeError::Unsatisfiable`] when every spec starts at or beyond
/// `content_length`.
pub fn parse_ranges(header: Option<&str>, content_length: u64) -> Result<ByteRanges, RangeError> {
    parse_ranges_with_limit(header, content_length, DEFAULT_MAX_RANGES)
}

/// Like [`parse_ranges`], but ignores headers naming more than `max_ranges` specs.
pub fn parse_ranges_with_limit(
    header: Option<&str>,
    content_length: u64,
    max_ranges: usize,
) -> Result<ByteRanges, RangeError> {
    let Some(header) = header.map(str::trim).filter(|h| !h.is_empty()) else {
        return Ok(ByteRanges::Whole);
    };

    let Some((unit, specs)) = header.split_once('=') else {
        debug!(header, "range header without '=' ignored");
        return Ok(ByteRanges::Whole);
    };
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        debug!(unit, "range header with unknown unit ignored");
        return Ok(ByteRanges::Whole);
    }

    let mut ranges = Vec::new();
    for (count, spec) in specs.split(',').enumerate() {
        if count >= max_ranges {
            debug!(max_ranges, "range header names too many ranges; ignored");
            return Ok(ByteRanges::Whole);
        }
        match parse_spec(spec, content_length) {
            Spec::Range(range) => ranges.push(range),
            Spec::Unsatisfiable => continue,
            Spec::Invalid => {
                debug!(spec, "syntactically invalid byte-range-spec; whole header ignored");
                return Ok(ByteRanges::Whole);
            }
        }
    }

    if ranges.is_empty() {
        return Err(RangeError::Unsatisfiable { content_length });
    }
    Ok(ByteRanges::Partial(ranges))
}

enum Spec {
    Range(ByteRange),
    Unsatisfiable,
    Invalid,
}

fn parse_number(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_spec(spec: &str, content_length: u64) -> Spec {
    let Some((start, stop)) = spec.split_once('-') else {
        return Spec::Invalid;
    };
    let (start, stop) = (start.trim(), stop.trim());

    match (start.is_empty(), stop.is_empty()) {
        (true, true) => Spec::Invalid,
        // Suffix: the last N bytes.
        (true, false) => {
            let Some(suffix) = parse_number(stop) else {
                return Spec::Invalid;
            };
            if suffix == 0 || content_length == 0 {
                return Spec::Unsatisfiable;
            }
            Spec::Range(ByteRange {
                start: content_length.saturating_sub(suffix),
                stop: content_length,
            })
        }
        (false, open_ended) => {
            let Some(first) = parse_number(start) else {
                return Spec::Invalid;
            };
            let last = if open_ended {
                content_length.saturating_sub(1)
            } else {
                match parse_number(stop) {
                    Some(last) => last,
                    None => return Spec::Invalid,
                }
            };
            if first >= content_length {
                return Spec::Unsatisfiable;
            }
            if last < first {
                return Spec::Invalid;
            }
            Spec::Range(ByteRange {
                start: first,
                stop: last.saturating_add(1).min(content_length),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(pairs: &[(u64, u64)]) -> Result<ByteRanges, RangeError> {
        Ok(ByteRanges::Partial(pairs.iter().copied().map(ByteRange::from).collect()))
    }

    #[test]
    fn closed_range_becomes_half_open() {
        assert_eq!(parse_ranges(Some("bytes=3-6"), 10), partial(&[(3, 7)]));
        assert_eq!(parse_ranges(Some("bytes=0-0"), 10), partial(&[(0, 1)]));
    }

    #[test]
    fn stop_is_capped_at_content_length() {
        assert_eq!(parse_ranges(Some("bytes=2-20"), 10), partial(&[(2, 10)]));
    }

    #[test]
    fn open_ended_range_runs_to_end() {
        assert_eq!(parse_ranges(Some("bytes=4-"), 10), partial(&[(4, 10)]));
    }

    #[test]
    fn suffix_range_takes_last_bytes() {
        assert_eq!(parse_ranges(Some("bytes=-5"), 10), partial(&[(5, 10)]));
        assert_eq!(parse_ranges(Some("bytes=-50"), 10), partial(&[(0, 10)]));
    }

    #[test]
    fn start_past_end_is_dropped() {
        assert_eq!(parse_ranges(Some("bytes=9-20, 12-15"), 10), partial(&[(9, 10)]));
        assert_eq!(parse_ranges(Some("bytes=0-1,12-15,5-"), 10), partial(&[(0, 2), (5, 10)]));
    }

    #[test]
    fn all_unsatisfiable_is_an_error() {
        let err = parse_ranges(Some("bytes=10-20"), 10).unwrap_err();
        assert_eq!(err, RangeError::Unsatisfiable { content_length: 10 });
        assert_eq!(err.status_code().as_u16(), 416);
        assert!(parse_ranges(Some("bytes=-0"), 10).is_err());
        assert!(parse_ranges(Some("bytes=0-"), 0).is_err());
    }

    #[test]
    fn malformed_specs_ignore_whole_header() {
        for header in ["bytes=-", "bytes=6-3", "bytes=0-1,-", "bytes=a-3", "bytes=3", "pages=1-2", "1-2"] {
            assert_eq!(parse_ranges(Some(header), 10), Ok(ByteRanges::Whole), "{header}");
        }
    }

    #[test]
    fn absent_header_is_whole() {
        assert_eq!(parse_ranges(None, 10), Ok(ByteRanges::Whole));
        assert_eq!(parse_ranges(Some("  "), 10), Ok(ByteRanges::Whole));
    }

    #[test]
    fn too_many_ranges_ignore_whole_header() {
        assert_eq!(parse_ranges_with_limit(Some("bytes=0-1,2-3,4-5"), 10, 2), Ok(ByteRanges::Whole));
        assert_eq!(
            parse_ranges_with_limit(Some("bytes=0-1,2-3"), 10, 2),
            partial(&[(0, 2), (2, 4)])
        );
    }

    #[test]
    fn content_range_value() {
        let range = ByteRange { start: 3, stop: 7 };
        assert_eq!(range.content_range(10), "bytes 3-6/10");
        assert_eq!(range.len(), 4);
        assert_eq!(range.as_range(), Some(3..7));
    }

    #[test]
    fn clamp_to_shorter_resource() {
        let range = ByteRange { start: 5, stop: 51 };
        assert_eq!(range.clamp_to(10), Some(ByteRange { start: 5, stop: 10 }));
        assert_eq!(range.clamp_to(100), Some(range));
        assert_eq!(range.clamp_to(5), None);
    }
}
