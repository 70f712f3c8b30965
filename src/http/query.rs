//! Query-string and path decoding.

use std::collections::BTreeMap;

use serde::Serialize;
use url::form_urlencoded;

/// A decoded query parameter.
///
/// Serializes untagged, so a [`ParamMap`] renders as a plain JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A server-side image-map coordinate.
    Int(i64),
    /// A key that appeared once.
    Text(String),
    /// A key that appeared more than once, in order of appearance.
    List(Vec<String>),
}

impl ParamValue {
    /// Returns the single text value, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Decoded query parameters keyed by name.
pub type ParamMap = BTreeMap<String, ParamValue>;

// `<digits>,<digits>` as sent by a browser clicking a server-side image map.
fn image_map_coords(query: &str) -> Option<(i64, i64)> {
    let (x, y) = query.split_once(',')?;
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !numeric(x) || !numeric(y) {
        return None;
    }
    Some((x.parse().ok()?, y.parse().ok()?))
}

/// Decodes a query string into a [`ParamMap`].
///
/// `"12,34"` becomes `{x: 12, y: 34}`. Anything else is form-decoded: blank
/// values are kept, a key seen once maps to its value and a repeated key to
/// the list of its values.
///
/// # Examples
///
/// ```
/// use wirecore::http::query::{parse_query_string, ParamValue};
///
/// let params = parse_query_string("q=rust+lang&tag=a&tag=b");
/// assert_eq!(params["q"], ParamValue::Text("rust lang".into()));
/// assert_eq!(params["tag"], ParamValue::List(vec!["a".into(), "b".into()]));
///
/// let coords = parse_query_string("12,34");
/// assert_eq!(coords["x"], ParamValue::Int(12));
/// ```
pub fn parse_query_string(query: &str) -> ParamMap {
    if let Some((x, y)) = image_map_coords(query) {
        return ParamMap::from([
            ("x".to_owned(), ParamValue::Int(x)),
            ("y".to_owned(), ParamValue::Int(y)),
        ]);
    }

    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        grouped
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                ParamValue::Text(values.remove(0))
            } else {
                ParamValue::List(values)
            };
            (key, value)
        })
        .collect()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Percent-decodes a request path.
///
/// Malformed escapes are kept literally and `+` is not a space here.
/// Invalid UTF-8 in the decoded bytes is replaced with U+FFFD.
///
/// ```
/// use wirecore::http::query::unquote_path;
///
/// assert_eq!(unquote_path("/this%20path"), "/this path");
/// assert_eq!(unquote_path("/100%/a+b"), "/100%/a+b");
/// ```
pub fn unquote_path(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = bytes.get(i + 1).copied().and_then(hex_value);
            let lo = bytes.get(i + 2).copied().and_then(hex_value);
            if let (Some(hi), Some(lo)) = (hi, lo) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn image_map_coordinates() {
        let params = parse_query_string("120,45");
        assert_eq!(serde_json::to_value(&params).unwrap(), json!({"x": 120, "y": 45}));
    }

    #[test]
    fn not_quite_coordinates_fall_back_to_form_decoding() {
        let params = parse_query_string("12,34abc");
        assert_eq!(params["12,34abc"], ParamValue::Text(String::new()));
    }

    #[test]
    fn single_values_collapse_and_repeats_stay_lists() {
        let params = parse_query_string("name=world&blank=&flag&id=1&id=2&id=3");
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"name": "world", "blank": "", "flag": "", "id": ["1", "2", "3"]})
        );
    }

    #[test]
    fn percent_and_plus_decoding() {
        let params = parse_query_string("q=a%26b+c&caf%C3%A9=1");
        assert_eq!(params["q"].as_str(), Some("a&b c"));
        assert_eq!(params["café"].as_str(), Some("1"));
    }

    #[test]
    fn empty_query() {
        assert!(parse_query_string("").is_empty());
    }

    #[test]
    fn unquote_keeps_malformed_escapes() {
        assert_eq!(unquote_path("/a%2"), "/a%2");
        assert_eq!(unquote_path("/a%zz"), "/a%zz");
        assert_eq!(unquote_path("/caf%C3%A9"), "/café");
    }
}
