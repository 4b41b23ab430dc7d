//! # wirespec-base
//!
//! Structural atoms for the wirespec ecosystem.
//!
//! This crate provides the foundational types used throughout wirespec:
//!
//! - [`Identifier`] — Hierarchical, case-insensitive dotted names
//! - [`Location`] — Source positions for diagnostics
//! - [`Diagnostics`] — Accumulating error/warning bag with severities
//!
//! # Design Principles
//!
//! This crate has **no knowledge of expressions, types or messages**. It
//! provides only generic infrastructure that higher-level crates build upon.
//!
//! # Example
//!
//! ```
//! use wirespec_base::{Diagnostics, Identifier, Location, Severity, Subsystem};
//!
//! let name = Identifier::new("Ethernet.Frame").unwrap();
//! assert_eq!(name.name(), "Frame");
//!
//! let mut bag = Diagnostics::new();
//! bag.append("frame too short", Subsystem::Model, Severity::Error, None);
//! assert!(bag.propagate().is_err());
//! ```

pub mod diag;
pub mod ident;
pub mod location;

pub use diag::{fail, Diagnostics, Entry, Severity, Subsystem};
pub use ident::{Identifier, InvalidIdentifier};
pub use location::Location;
