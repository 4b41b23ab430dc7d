//! Accumulating diagnostics.
//!
//! Validators do not abort on the first defect. They append entries to a
//! [`Diagnostics`] bag and call [`Diagnostics::propagate`] at phase
//! boundaries (per type, per session, per package). `propagate` fails only
//! when the bag contains at least one [`Severity::Error`]; infos and
//! warnings accumulate silently.
//!
//! Entries keep their insertion order, so reporter output is deterministic.
//!
//! # Example
//!
//! ```
//! use wirespec_base::{Diagnostics, Location, Severity, Subsystem};
//!
//! let mut bag = Diagnostics::new();
//! bag.append(
//!     "unreachable states S2",
//!     Subsystem::Session,
//!     Severity::Error,
//!     Some(Location::new("machine.spec", 12, 3)),
//! );
//! let failure = bag.propagate().unwrap_err();
//! assert_eq!(
//!     failure.to_string(),
//!     "machine.spec:12:3: session: error: unreachable states S2"
//! );
//! ```

use std::fmt;

use serde::Serialize;

use crate::location::Location;

/// How serious a diagnostic entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational note.
    Info,
    /// Suspicious but not fatal.
    Warning,
    /// Validation failure.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Which part of the toolchain produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    /// Concrete-syntax parsing.
    Parser,
    /// Message model validation.
    Model,
    /// Session state machine validation.
    Session,
    /// Message graph analysis.
    Graph,
    /// Internal invariant violations.
    Internal,
    /// Core infrastructure.
    Core,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Parser => write!(f, "parser"),
            Subsystem::Model => write!(f, "model"),
            Subsystem::Session => write!(f, "session"),
            Subsystem::Graph => write!(f, "graph"),
            Subsystem::Internal => write!(f, "internal"),
            Subsystem::Core => write!(f, "core"),
        }
    }
}

/// A single diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Human-readable description.
    pub message: String,
    /// Producing subsystem.
    pub subsystem: Subsystem,
    /// Severity of the entry.
    pub severity: Severity,
    /// Source position, when known.
    pub location: Option<Location>,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(
                f,
                "{}: {}: {}: {}",
                location, self.subsystem, self.severity, self.message
            ),
            None => write!(f, "{}: {}: {}", self.subsystem, self.severity, self.message),
        }
    }
}

/// An ordered bag of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    entries: Vec<Entry>,
}

impl Diagnostics {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single entry.
    pub fn append(
        &mut self,
        message: impl Into<String>,
        subsystem: Subsystem,
        severity: Severity,
        location: Option<Location>,
    ) {
        self.entries.push(Entry {
            message: message.into(),
            subsystem,
            severity,
            location,
        });
    }

    /// Appends all entries of `other`, preserving their order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// Fails with a copy of the bag iff any [`Severity::Error`] entry is
    /// present. Infos and warnings never trigger propagation.
    pub fn propagate(&self) -> Result<(), Diagnostics> {
        if self.has_errors() {
            Err(self.clone())
        } else {
            Ok(())
        }
    }

    /// Whether the bag contains an error entry.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.severity == Severity::Error)
    }

    /// The entries in insertion order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

/// Produces a failed result holding a single-entry bag.
///
/// Shorthand for constructors that cannot continue after one defect.
pub fn fail<T>(
    message: impl Into<String>,
    subsystem: Subsystem,
    severity: Severity,
    location: Option<Location>,
) -> Result<T, Diagnostics> {
    let mut bag = Diagnostics::new();
    bag.append(message, subsystem, severity, location);
    Err(bag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bag_propagates() {
        assert!(Diagnostics::new().propagate().is_ok());
    }

    #[test]
    fn warnings_do_not_propagate() {
        let mut bag = Diagnostics::new();
        bag.append("odd layout", Subsystem::Graph, Severity::Warning, None);
        bag.append("note", Subsystem::Model, Severity::Info, None);
        assert!(bag.propagate().is_ok());
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn errors_propagate() {
        let mut bag = Diagnostics::new();
        bag.append("cyclic", Subsystem::Model, Severity::Error, None);
        let err = bag.propagate().unwrap_err();
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn extend_preserves_order() {
        let mut first = Diagnostics::new();
        first.append("a", Subsystem::Model, Severity::Warning, None);
        let mut second = Diagnostics::new();
        second.append("b", Subsystem::Session, Severity::Error, None);
        first.extend(second);
        let messages: Vec<_> = first.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["a", "b"]);
    }

    #[test]
    fn display_without_location() {
        let mut bag = Diagnostics::new();
        bag.append("boom", Subsystem::Internal, Severity::Error, None);
        assert_eq!(bag.to_string(), "internal: error: boom");
    }

    #[test]
    fn display_with_location() {
        let mut bag = Diagnostics::new();
        bag.append(
            "undeclared variable \"X\"",
            Subsystem::Model,
            Severity::Error,
            Some(Location::new("f.spec", 3, 9)),
        );
        assert_eq!(
            bag.to_string(),
            "f.spec:3:9: model: error: undeclared variable \"X\""
        );
    }

    #[test]
    fn fail_produces_single_entry() {
        let result: Result<(), Diagnostics> =
            fail("bad", Subsystem::Core, Severity::Error, None);
        assert_eq!(result.unwrap_err().len(), 1);
    }
}
