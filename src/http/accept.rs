//! `Accept`, `Accept-Charset`, `Accept-Encoding` and `Accept-Language` parsing.
//!
//! Each header is a comma-separated list of candidates, optionally weighted
//! with a `q` parameter (RFC 9110 §12.4.2). Parsing yields an [`AcceptList`]
//! ordered from most to least preferred.

use std::cmp::Ordering;
use std::fmt;

use tracing::trace;

/// Which `Accept*` header a value came from.
///
/// Only the general `Accept` header carries media-type parameters before
/// its `q` value; the narrower headers name a bare token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcceptKind {
    Accept,
    Charset,
    Encoding,
    Language,
}

impl AcceptKind {
    /// The header name this kind is read from.
    pub fn header_name(self) -> &'static str {
        match self {
            Self::Accept => "Accept",
            Self::Charset => "Accept-Charset",
            Self::Encoding => "Accept-Encoding",
            Self::Language => "Accept-Language",
        }
    }

    /// Maps a header name (any case) to its kind.
    pub fn from_header_name(name: &str) -> Option<Self> {
        [Self::Accept, Self::Charset, Self::Encoding, Self::Language]
            .into_iter()
            .find(|kind| kind.header_name().eq_ignore_ascii_case(name))
    }
}

/// One negotiable candidate with its parameters and quality.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptValue {
    value: String,
    params: Vec<(String, String)>,
    quality: f64,
    raw_quality: Option<String>,
    extensions: Vec<(String, String)>,
}

impl AcceptValue {
    /// Creates a value with no parameters and the implicit quality of 1.0.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            params: Vec::new(),
            quality: 1.0,
            raw_quality: None,
            extensions: Vec::new(),
        }
    }

    /// The bare token: a media range, charset, coding or language tag.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The quality, in `[0, 1]`. Defaults to exactly `1.0`.
    pub fn quality(&self) -> f64 {
        self.quality
    }

    /// Parameters written before `q`, such as `level=1` on `text/html;level=1`.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Returns the named parameter. `q` resolves to the quality as written.
    pub fn param(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case("q") {
            return self.raw_quality.as_deref();
        }
        self.params
            .iter()
            .chain(&self.extensions)
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Accept-extensions written after `q`.
    pub fn extensions(&self) -> &[(String, String)] {
        &self.extensions
    }

    /// Priority ordering: higher quality first, then the greater string form.
    pub fn priority_cmp(&self, other: &Self) -> Ordering {
        other
            .quality
            .total_cmp(&self.quality)
            .then_with(|| other.to_string().cmp(&self.to_string()))
    }

    // Higher is more specific; `None` when `offer` is not matched at all.
    fn specificity(&self, offer: &str, kind: AcceptKind) -> Option<u8> {
        let range = self.value.as_str();
        match kind {
            AcceptKind::Accept => {
                if range == "*/*" {
                    return Some(0);
                }
                let (range_type, range_sub) = range.split_once('/')?;
                let (offer_type, offer_sub) = offer.split_once('/')?;
                if !range_type.eq_ignore_ascii_case(offer_type) {
                    return None;
                }
                if range_sub == "*" {
                    Some(1)
                } else if range_sub.eq_ignore_ascii_case(offer_sub) {
                    Some(2)
                } else {
                    None
                }
            }
            AcceptKind::Language => {
                if range == "*" {
                    Some(0)
                } else if range.eq_ignore_ascii_case(offer) {
                    Some(2)
                } else if offer.len() > range.len()
                    && offer.is_char_boundary(range.len())
                    && offer[..range.len()].eq_ignore_ascii_case(range)
                    && offer.as_bytes()[range.len()] == b'-'
                {
                    Some(1)
                } else {
                    None
                }
            }
            AcceptKind::Charset | AcceptKind::Encoding => {
                if range == "*" {
                    Some(0)
                } else if range.eq_ignore_ascii_case(offer) {
                    Some(2)
                } else {
                    None
                }
            }
        }
    }
}

impl fmt::Display for AcceptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)?;
        for (k, v) in &self.params {
            write!(f, ";{k}={v}")?;
        }
        if let Some(q) = &self.raw_quality {
            write!(f, ";q={q}")?;
        }
        for (k, v) in &self.extensions {
            write!(f, ";{k}={v}")?;
        }
        Ok(())
    }
}

/// The candidates of one `Accept*` header in descending priority.
///
/// An empty list means the client stated no preference.
///
/// # Examples
///
/// ```
/// use wirecore::http::accept::{AcceptKind, AcceptList};
///
/// let list = AcceptList::parse(Some("text/html;q=0.5, text/plain;q=0.9"), AcceptKind::Accept);
/// let order: Vec<_> = list.iter().map(|v| v.value()).collect();
/// assert_eq!(order, vec!["text/plain", "text/html"]);
/// assert_eq!(list.preferred(&["text/html", "text/plain"]), Some("text/plain"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptList {
    kind: Option<AcceptKind>,
    values: Vec<AcceptValue>,
}

impl AcceptList {
    /// Parses a header value. `None` or an empty value yields an empty list.
    pub fn parse(header: Option<&str>, kind: AcceptKind) -> Self {
        let mut values: Vec<AcceptValue> = split_unquoted(header.unwrap_or(""), b',')
            .into_iter()
            .filter_map(|entry| parse_entry(entry, kind))
            .collect();
        values.sort_by(AcceptValue::priority_cmp);
        Self {
            kind: Some(kind),
            values,
        }
    }

    /// Returns `true` when the header stated no preference.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of parsed candidates.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterates candidates from most to least preferred.
    pub fn iter(&self) -> std::slice::Iter<'_, AcceptValue> {
        self.values.iter()
    }

    /// The candidates from most to least preferred.
    pub fn values(&self) -> &[AcceptValue] {
        &self.values
    }

    /// The quality the client assigns to `offer`, taken from the most
    /// specific matching candidate. `None` if nothing matches.
    ///
    /// With no stated preference every offer is acceptable at 1.0.
    pub fn quality_of(&self, offer: &str) -> Option<f64> {
        if self.values.is_empty() {
            return Some(1.0);
        }
        let kind = self.kind.unwrap_or(AcceptKind::Accept);
        self.values
            .iter()
            .filter_map(|v| v.specificity(offer, kind).map(|s| (s, v.quality)))
            .max_by_key(|(s, _)| *s)
            .map(|(_, q)| q)
    }

    /// Picks the offer the client prefers most. Ties go to the earlier offer;
    /// offers rated `q=0` are never chosen.
    pub fn preferred<'a>(&self, offers: &[&'a str]) -> Option<&'a str> {
        let mut best: Option<(&'a str, f64)> = None;
        for &offer in offers {
            let Some(q) = self.quality_of(offer).filter(|q| *q > 0.0) else {
                continue;
            };
            if best.is_none_or(|(_, best_q)| q > best_q) {
                best = Some((offer, q));
            }
        }
        best.map(|(offer, _)| offer)
    }
}

impl<'a> IntoIterator for &'a AcceptList {
    type Item = &'a AcceptValue;
    type IntoIter = std::slice::Iter<'a, AcceptValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Shorthand for [`AcceptList::parse`].
pub fn get_accept(header: Option<&str>, kind: AcceptKind) -> AcceptList {
    AcceptList::parse(header, kind)
}

// Byte offsets of every `delim` outside a quoted string. Inside quotes a
// backslash escapes the next byte.
fn unquoted_positions(s: &str, delim: u8) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut quoted = false;
    let mut escaped = false;
    for (i, b) in s.bytes().enumerate() {
        if escaped {
            escaped = false;
        } else if quoted {
            match b {
                b'\\' => escaped = true,
                b'"' => quoted = false,
                _ => {}
            }
        } else if b == b'"' {
            quoted = true;
        } else if b == delim {
            positions.push(i);
        }
    }
    positions
}

// Splits on `delim` wherever it is not inside a quoted string.
fn split_unquoted(s: &str, delim: u8) -> Vec<&str> {
    let cuts = unquoted_positions(s, delim);
    let starts = std::iter::once(0).chain(cuts.iter().map(|cut| cut + 1));
    let ends = cuts.iter().copied().chain(std::iter::once(s.len()));
    starts.zip(ends).map(|(start, end)| &s[start..end]).collect()
}

// Locates the first unquoted `;q=` (spaces allowed around `q`), returning the
// byte offsets of the `;` and of the character after `=`.
fn find_quality(entry: &str) -> Option<(usize, usize)> {
    let bytes = entry.as_bytes();
    for semi in unquoted_positions(entry, b';') {
        let mut i = semi + 1;
        while bytes.get(i) == Some(&b' ') {
            i += 1;
        }
        if !matches!(bytes.get(i), Some(b'q' | b'Q')) {
            continue;
        }
        i += 1;
        while bytes.get(i) == Some(&b' ') {
            i += 1;
        }
        if bytes.get(i) == Some(&b'=') {
            return Some((semi, i + 1));
        }
    }
    None
}

fn parse_params<'a>(atoms: impl Iterator<Item = &'a str>) -> Vec<(String, String)> {
    atoms
        .map(str::trim)
        .filter(|atom| !atom.is_empty())
        .map(|atom| match atom.split_once('=') {
            Some((k, v)) => (k.trim().to_owned(), v.trim().to_owned()),
            None => (atom.to_owned(), String::new()),
        })
        .collect()
}

fn parse_entry(entry: &str, kind: AcceptKind) -> Option<AcceptValue> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }

    let (head, accept_params) = match find_quality(entry) {
        Some((semi, after)) => (&entry[..semi], Some(&entry[after..])),
        None => (entry, None),
    };

    let mut value = match kind {
        AcceptKind::Accept => {
            let mut atoms = split_unquoted(head, b';').into_iter();
            let mut value = AcceptValue::new(atoms.next().unwrap_or("").trim());
            value.params = parse_params(atoms);
            value
        }
        _ => AcceptValue::new(head.trim()),
    };
    if value.value.is_empty() {
        trace!(entry, "accept entry without a value skipped");
        return None;
    }

    if let Some(accept_params) = accept_params {
        // Only the general Accept header carries accept-extensions after q.
        let mut atoms = split_unquoted(accept_params, b';').into_iter();
        let raw = match kind {
            AcceptKind::Accept => atoms.next().unwrap_or("").trim(),
            _ => accept_params.trim(),
        };
        let Ok(quality) = raw.parse::<f64>() else {
            trace!(entry, "accept entry with unparseable qvalue skipped");
            return None;
        };
        if !quality.is_finite() {
            trace!(entry, "accept entry with non-finite qvalue skipped");
            return None;
        }
        value.quality = quality.clamp(0.0, 1.0);
        value.raw_quality = Some(raw.to_owned());
        if kind == AcceptKind::Accept {
            value.extensions = parse_params(atoms);
        }
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(list: &AcceptList) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn orders_by_quality() {
        let list = AcceptList::parse(Some("text/html;q=0.5, text/plain;q=0.9"), AcceptKind::Accept);
        assert_eq!(values(&list), vec!["text/plain;q=0.9", "text/html;q=0.5"]);
    }

    #[test]
    fn missing_quality_is_exactly_one() {
        let list = AcceptList::parse(Some("audio/*; q=0.2, audio/basic"), AcceptKind::Accept);
        assert_eq!(list.values()[0].value(), "audio/basic");
        assert_eq!(list.values()[0].quality(), 1.0);
        assert_eq!(list.values()[0].param("q"), None);
        assert_eq!(list.values()[1].quality(), 0.2);
        assert_eq!(list.values()[1].param("q"), Some("0.2"));
    }

    #[test]
    fn equal_quality_breaks_ties_by_string_form() {
        let list = AcceptList::parse(Some("a/a, c/c, b/b"), AcceptKind::Accept);
        let order: Vec<_> = list.iter().map(AcceptValue::value).collect();
        assert_eq!(order, vec!["c/c", "b/b", "a/a"]);
    }

    #[test]
    fn media_type_params_and_extensions() {
        let list = AcceptList::parse(
            Some("text/html;level=1;charset=utf-8;q=0.7;ext=foo;flag"),
            AcceptKind::Accept,
        );
        let value = &list.values()[0];
        assert_eq!(value.value(), "text/html");
        let params: Vec<(&str, &str)> = value
            .params()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(params, vec![("level", "1"), ("charset", "utf-8")]);
        assert_eq!(value.quality(), 0.7);
        assert_eq!(value.param("ext"), Some("foo"));
        assert_eq!(value.extensions()[1], ("flag".to_owned(), String::new()));
        assert_eq!(value.to_string(), "text/html;level=1;charset=utf-8;q=0.7;ext=foo;flag=");
    }

    #[test]
    fn narrow_headers_keep_bare_tokens() {
        let list = AcceptList::parse(Some("gzip;q=1.0, identity; q=0.5, *;q=0"), AcceptKind::Encoding);
        let order: Vec<_> = list.iter().map(AcceptValue::value).collect();
        assert_eq!(order, vec!["gzip", "identity", "*"]);
        assert!(list.iter().all(|v| v.params().is_empty()));
    }

    #[test]
    fn quoted_params_keep_commas_and_semicolons() {
        let list = AcceptList::parse(
            Some(r#"text/html;foo="a,b;q=1";q=0.5, text/plain;q=0.9, text/csv;x="say \"hi, there\"""#),
            AcceptKind::Accept,
        );
        let order: Vec<_> = list.iter().map(AcceptValue::value).collect();
        assert_eq!(order, vec!["text/csv", "text/plain", "text/html"]);

        let html = &list.values()[2];
        assert_eq!(html.param("foo"), Some(r#""a,b;q=1""#));
        assert_eq!(html.quality(), 0.5);
        assert_eq!(list.values()[0].param("x"), Some(r#""say \"hi, there\"""#));
    }

    #[test]
    fn narrow_headers_have_no_extensions() {
        let list = AcceptList::parse(Some("utf-8;q=0.5, iso-8859-1;q=0.3;level=1"), AcceptKind::Charset);
        assert_eq!(list.len(), 1);
        assert_eq!(list.values()[0].value(), "utf-8");
        assert!(list.values()[0].extensions().is_empty());

        let list = AcceptList::parse(Some("text/html;q=0.3;level=1"), AcceptKind::Accept);
        assert_eq!(list.values()[0].param("level"), Some("1"));
    }

    #[test]
    fn absent_header_states_no_preference() {
        let list = AcceptList::parse(None, AcceptKind::Language);
        assert!(list.is_empty());
        assert_eq!(list.preferred(&["en", "fr"]), Some("en"));
        assert!(AcceptList::parse(Some(" , "), AcceptKind::Accept).is_empty());
    }

    #[test]
    fn unparseable_quality_drops_entry() {
        let list = AcceptList::parse(Some("text/html;q=high, text/plain"), AcceptKind::Accept);
        assert_eq!(list.len(), 1);
        assert_eq!(list.values()[0].value(), "text/plain");
    }

    #[test]
    fn preferred_honors_specificity_and_exclusions() {
        let list = AcceptList::parse(
            Some("text/*;q=0.3, text/html;q=0.7, */*;q=0.5, image/png;q=0"),
            AcceptKind::Accept,
        );
        assert_eq!(list.quality_of("text/plain"), Some(0.3));
        assert_eq!(list.quality_of("text/html"), Some(0.7));
        assert_eq!(list.quality_of("image/png"), Some(0.0));
        assert_eq!(list.preferred(&["image/png", "text/plain", "application/json"]), Some("application/json"));
        assert_eq!(list.preferred(&["image/png"]), None);
    }

    #[test]
    fn language_prefix_matching() {
        let list = AcceptList::parse(Some("da, en-gb;q=0.8, en;q=0.7"), AcceptKind::Language);
        assert_eq!(list.quality_of("en-US"), Some(0.7));
        assert_eq!(list.quality_of("en-GB"), Some(0.8));
        assert_eq!(list.quality_of("de"), None);
        assert_eq!(list.preferred(&["en-US", "da"]), Some("da"));
    }

    #[test]
    fn kind_from_header_name() {
        assert_eq!(AcceptKind::from_header_name("accept-charset"), Some(AcceptKind::Charset));
        assert_eq!(AcceptKind::from_header_name("Content-Type"), None);
    }
}
