//! Hierarchical identifiers.
//!
//! An [`Identifier`] is a dotted path of name parts, e.g. `Ethernet.Frame`
//! or `TLV.Tag`. Comparison, hashing and ordering are case-insensitive:
//! `Ethernet.Frame` and `ETHERNET.FRAME` denote the same entity. Printing
//! preserves the parts as written.
//!
//! # Example
//!
//! ```
//! use wirespec_base::Identifier;
//!
//! let a = Identifier::new("Ethernet.Frame").unwrap();
//! let b = Identifier::new("ETHERNET.frame").unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a.name(), "Frame");
//! assert_eq!(a.to_string(), "Ethernet.Frame");
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::location::Location;

/// Separator between identifier parts.
pub const SEPARATOR: char = '.';

/// A malformed identifier.
///
/// Raised when a part is empty, when the textual form starts or ends with
/// the separator, or when two separators are adjacent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidIdentifier {
    /// Human-readable description of the defect.
    pub message: String,
}

impl InvalidIdentifier {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for InvalidIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid identifier: {}", self.message)
    }
}

impl std::error::Error for InvalidIdentifier {}

/// A dotted, case-insensitive hierarchical name.
///
/// The optional [`Location`] records where the identifier was written; it
/// never participates in equality, hashing or ordering.
#[derive(Debug, Clone)]
pub struct Identifier {
    parts: Vec<String>,
    /// Source position of the identifier, if known.
    pub location: Option<Location>,
}

impl Identifier {
    /// Parses a dotted string into an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdentifier`] for an empty string, an empty part,
    /// a leading or trailing separator, or adjacent separators.
    pub fn new(text: impl AsRef<str>) -> Result<Self, InvalidIdentifier> {
        let text = text.as_ref();
        if text.is_empty() {
            return Err(InvalidIdentifier::new("empty identifier"));
        }
        if text.starts_with(SEPARATOR) || text.ends_with(SEPARATOR) {
            return Err(InvalidIdentifier::new(format!(
                "\"{text}\" starts or ends with separator"
            )));
        }
        let parts: Vec<String> = text.split(SEPARATOR).map(str::to_owned).collect();
        Self::from_parts(parts)
    }

    /// Builds an identifier from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdentifier`] when `parts` is empty or contains an
    /// empty or separator-bearing part.
    pub fn from_parts(parts: Vec<String>) -> Result<Self, InvalidIdentifier> {
        if parts.is_empty() {
            return Err(InvalidIdentifier::new("empty identifier"));
        }
        for part in &parts {
            if part.is_empty() {
                return Err(InvalidIdentifier::new("empty part"));
            }
            if part.contains(SEPARATOR) {
                return Err(InvalidIdentifier::new(format!(
                    "separator in part \"{part}\""
                )));
            }
        }
        Ok(Self {
            parts,
            location: None,
        })
    }

    /// Attaches a source location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// The parts of the identifier, in order.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The last part, i.e. the unqualified name.
    pub fn name(&self) -> &str {
        self.parts.last().expect("identifier has at least one part")
    }

    /// All parts except the last, i.e. the enclosing namespace.
    pub fn parent(&self) -> Option<Identifier> {
        if self.parts.len() < 2 {
            return None;
        }
        Some(Self {
            parts: self.parts[..self.parts.len() - 1].to_vec(),
            location: None,
        })
    }

    /// Concatenates two identifiers into a longer path.
    #[must_use]
    pub fn join(&self, other: &Identifier) -> Identifier {
        let mut parts = self.parts.clone();
        parts.extend(other.parts.iter().cloned());
        Identifier {
            parts,
            location: self.location.clone(),
        }
    }

    /// The case-folded form used for comparison and hashing.
    fn canonical(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.to_lowercase())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.parts.len() == other.parts.len()
            && self
                .parts
                .iter()
                .zip(&other.parts)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical().cmp(&other.canonical())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

impl FromStr for Identifier {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_single_part() {
        let id = Identifier::new("Frame").unwrap();
        assert_eq!(id.parts(), ["Frame"]);
        assert_eq!(id.name(), "Frame");
        assert!(id.parent().is_none());
    }

    #[test]
    fn identifier_dotted_path() {
        let id = Identifier::new("Ethernet.Frame.Tag").unwrap();
        assert_eq!(id.parts().len(), 3);
        assert_eq!(id.name(), "Tag");
        assert_eq!(id.parent().unwrap().to_string(), "Ethernet.Frame");
    }

    #[test]
    fn identifier_case_insensitive_equality() {
        let a = Identifier::new("Ethernet.Frame").unwrap();
        let b = Identifier::new("ethernet.FRAME").unwrap();
        assert_eq!(a, b);

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn identifier_ordering_is_case_folded() {
        let a = Identifier::new("alpha").unwrap();
        let b = Identifier::new("Beta").unwrap();
        assert!(a < b);
    }

    #[test]
    fn identifier_rejects_empty() {
        assert!(Identifier::new("").is_err());
    }

    #[test]
    fn identifier_rejects_leading_separator() {
        assert!(Identifier::new(".Frame").is_err());
    }

    #[test]
    fn identifier_rejects_trailing_separator() {
        assert!(Identifier::new("Frame.").is_err());
    }

    #[test]
    fn identifier_rejects_adjacent_separators() {
        assert!(Identifier::new("Ethernet..Frame").is_err());
    }

    #[test]
    fn identifier_join_concatenates() {
        let a = Identifier::new("Ethernet").unwrap();
        let b = Identifier::new("Frame").unwrap();
        assert_eq!(a.join(&b).to_string(), "Ethernet.Frame");
    }

    #[test]
    fn identifier_display_preserves_case() {
        let id = Identifier::new("EtherNet.Frame").unwrap();
        assert_eq!(id.to_string(), "EtherNet.Frame");
    }
}
