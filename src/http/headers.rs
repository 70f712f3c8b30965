//! HTTP header map with case-insensitive, title-cased names.
//!
//! Every name is normalized to title case (`content-type` → `Content-Type`)
//! before it is stored or compared, so each header appears at most once and
//! every lookup is case-insensitive per [RFC 9110 §5.1].

use std::fmt;

/// Normalizes a header name to title case.
///
/// The first letter of every alphabetic run is upper-cased and the rest are
/// lower-cased; any non-letter (`-`, digits) starts a new run.
///
/// ```
/// use wirecore::http::headers::normalize_name;
///
/// assert_eq!(normalize_name("content-TYPE"), "Content-Type");
/// assert_eq!(normalize_name("x-forwarded-for"), "X-Forwarded-For");
/// ```
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// A case-insensitive HTTP header map holding one value per name.
///
/// Names are title-cased on every read, write, delete and containment
/// check. Insertion order is preserved; writing an existing name replaces
/// its value in place.
///
/// # Examples
///
/// ```
/// use wirecore::http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("content-type", "text/html; charset=utf-8");
///
/// assert_eq!(headers.get("Content-Type"), Some("text/html; charset=utf-8"));
/// assert!(headers.contains("CONTENT-TYPE"));
/// assert_eq!(headers.iter().next(), Some(("Content-Type", "text/html; charset=utf-8")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    inner: Vec<(String, String)>,
}

impl HeaderMap {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a header map with pre-allocated capacity for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Vec::with_capacity(capacity),
        }
    }

    /// Creates a map holding every name in `names`, each set to `value`.
    pub fn from_keys<I, K>(names: I, value: &str) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut map = Self::new();
        for name in names {
            map.insert(name.as_ref(), value);
        }
        map
    }

    fn position(&self, name: &str) -> Option<usize> {
        let key = normalize_name(name);
        self.inner.iter().position(|(k, _)| *k == key)
    }

    /// Sets a header, replacing any existing value stored under the same name.
    ///
    /// Returns the previous value, if there was one.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        let key = normalize_name(name.as_ref());
        let value = value.into();
        match self.inner.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.inner.push((key, value));
                None
            }
        }
    }

    /// Returns the value for the given header name, or `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.inner[i].1.as_str())
    }

    /// Returns the value for `name`, or `default` when the header is absent.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Returns the stored value for `name`, inserting `default` first if absent.
    pub fn set_default(&mut self, name: &str, default: impl Into<String>) -> &str {
        let index = match self.position(name) {
            Some(i) => i,
            None => {
                self.inner.push((normalize_name(name), default.into()));
                self.inner.len() - 1
            }
        };
        &self.inner[index].1
    }

    /// Removes a header, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.position(name)?;
        Some(self.inner.remove(index).1)
    }

    /// Removes a header, returning its value or `default` when absent.
    pub fn pop(&mut self, name: &str, default: impl Into<String>) -> String {
        self.remove(name).unwrap_or_else(|| default.into())
    }

    /// Returns `true` if the map holds a value for the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Copies every entry from `other` into this map, overwriting duplicates.
    pub fn update(&mut self, other: &HeaderMap) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    /// Returns the number of distinct header names.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Removes every header.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Returns an iterator over all `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the normalized header names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(|(k, _)| k.as_str())
    }
}

impl<K, V> Extend<(K, V)> for HeaderMap
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderMap
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl fmt::Display for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.inner {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}
