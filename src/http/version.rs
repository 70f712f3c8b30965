//! Atom-by-atom version ordering.
//!
//! A [`Version`] such as `"2.1 beta 3"` is split on every non-word character
//! into atoms (`["2", "1", "beta", "3"]`). Two versions compare atom-by-atom:
//! all-digit atoms numerically, anything else lexically. When one version runs
//! out of atoms first, the longer one is greater, so `"4.8 alpha" > "4.8"`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A single token of a version string.
///
/// Atoms are kept as the text they were parsed from; whether an atom is
/// numeric is decided at comparison time.
#[derive(Debug, Clone)]
pub struct Atom(String);

impl Atom {
    /// Returns the atom text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the atom is a non-empty run of ASCII digits.
    pub fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }

    // Empty atoms sort first, numeric atoms next, other text last. Inside a
    // class: numeric by value, text lexically. This keeps the order total
    // when a digit-led word ("1a") meets a number.
    fn rank(&self) -> u8 {
        if self.0.is_empty() {
            0
        } else if self.is_numeric() {
            1
        } else {
            2
        }
    }
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.rank(), other.rank()) {
            (1, 1) => cmp_digits(&self.0, &other.0),
            (a, b) if a == b => self.0.cmp(&other.0),
            (a, b) => a.cmp(&b),
        }
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Atom {}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable, comparable version made of [`Atom`]s.
///
/// # Examples
///
/// ```
/// use wirecore::http::Version;
///
/// assert!(Version::new("2.12") > Version::new("2.4"));
/// assert!(Version::new("3.0 beta") > Version::new("3.0 alpha"));
/// assert!(Version::new("4.8 alpha") > Version::new("4.8"));
/// assert_eq!(Version::from_http("HTTP/1.1").to_http(), "HTTP/1.1");
/// ```
#[derive(Debug, Clone)]
pub struct Version {
    atoms: Vec<Atom>,
}

impl Version {
    /// Builds a version by splitting `s` on every non-word character.
    ///
    /// Adjacent separators produce empty atoms, which sort below any other.
    pub fn new(s: &str) -> Self {
        let atoms = s
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .map(|a| Atom(a.to_owned()))
            .collect();
        Self { atoms }
    }

    /// Builds a version from an explicit sequence of atoms.
    pub fn from_atoms<I, T>(atoms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Self {
            atoms: atoms.into_iter().map(|a| Atom(a.to_string())).collect(),
        }
    }

    /// Builds a version from an `HTTP/x.y` protocol token.
    pub fn from_http(token: &str) -> Self {
        Self::new(token.get(5..).unwrap_or(""))
    }

    /// Renders the first two atoms as an `HTTP/x.y` protocol token.
    ///
    /// Missing atoms render as `0`.
    pub fn to_http(&self) -> String {
        let part = |i: usize| self.atoms.get(i).map_or("0", Atom::as_str);
        format!("HTTP/{}.{}", part(0), part(1))
    }

    /// Returns the atoms in order.
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lexicographic over atoms; a strict prefix sorts first.
        self.atoms.iter().cmp(other.atoms.iter())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        *self == Version::new(other)
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        *self == Version::new(other)
    }
}

impl PartialOrd<&str> for Version {
    fn partial_cmp(&self, other: &&str) -> Option<Ordering> {
        Some(self.cmp(&Version::new(other)))
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl FromStr for Version {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, atom) in self.atoms.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(atom.as_str())?;
        }
        Ok(())
    }
}
