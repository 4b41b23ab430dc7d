//! The type algebra of message fields.
//!
//! Size is a partial function: modular and range integers have a fixed bit
//! width, arrays and messages do not. Type constructors validate their
//! parameters eagerly, so an ill-formed type never enters a model.

use std::fmt;

use wirespec_algebra::Expr;
use wirespec_base::{fail, Diagnostics, Identifier, Location, Severity, Subsystem};

use crate::graph::MessageGraph;

/// A field or message type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// An unsigned integer modulo a power of two.
    ModularInteger {
        identifier: Identifier,
        modulus: u64,
        bits: u32,
    },
    /// An integer restricted to `first ..= last`, stored in `bits` bits.
    RangeInteger {
        identifier: Identifier,
        first: i64,
        last: i64,
        bits: u32,
    },
    /// A variable-length sequence of elements.
    Array {
        identifier: Identifier,
        element: Identifier,
    },
    /// A message layout, given by its field graph.
    Message {
        identifier: Identifier,
        graph: MessageGraph,
        aspects: Vec<(Identifier, Vec<Expr>)>,
    },
    /// A message derived from a base message.
    Derivation {
        identifier: Identifier,
        base: Identifier,
    },
    /// An SDU attached to a PDU field under a condition.
    Refinement {
        identifier: Identifier,
        pdu: Identifier,
        field: Identifier,
        sdu: Identifier,
        condition: Expr,
    },
}

impl Type {
    /// A modular integer type.
    ///
    /// # Errors
    ///
    /// The modulus must be a non-zero power of two.
    pub fn modular(identifier: Identifier, modulus: u64) -> Result<Type, Diagnostics> {
        if modulus == 0 || !modulus.is_power_of_two() {
            return fail(
                format!("invalid type {identifier}: {modulus} is not a power of two"),
                Subsystem::Model,
                Severity::Error,
                identifier.location.clone(),
            );
        }
        let bits = modulus.trailing_zeros();
        Ok(Type::ModularInteger {
            identifier,
            modulus,
            bits,
        })
    }

    /// A range integer type.
    ///
    /// # Errors
    ///
    /// Requires `0 <= first <= last` and a bit width large enough for
    /// `last`.
    pub fn range(identifier: Identifier, first: i64, last: i64, bits: u32) -> Result<Type, Diagnostics> {
        if first < 0 {
            return fail(
                format!("invalid type {identifier}: negative first"),
                Subsystem::Model,
                Severity::Error,
                identifier.location.clone(),
            );
        }
        if first > last {
            return fail(
                format!("invalid type {identifier}: negative range"),
                Subsystem::Model,
                Severity::Error,
                identifier.location.clone(),
            );
        }
        let required = 64 - (last as u64).leading_zeros();
        if required > bits {
            return fail(
                format!("invalid type {identifier}: size too small for given range"),
                Subsystem::Model,
                Severity::Error,
                identifier.location.clone(),
            );
        }
        Ok(Type::RangeInteger {
            identifier,
            first,
            last,
            bits,
        })
    }

    /// An array type over `element`.
    pub fn array(identifier: Identifier, element: Identifier) -> Type {
        Type::Array {
            identifier,
            element,
        }
    }

    /// A message type over a field graph.
    pub fn message(identifier: Identifier, graph: MessageGraph) -> Type {
        Type::Message {
            identifier,
            graph,
            aspects: Vec::new(),
        }
    }

    /// The declared name of the type.
    pub fn identifier(&self) -> &Identifier {
        match self {
            Type::ModularInteger { identifier, .. }
            | Type::RangeInteger { identifier, .. }
            | Type::Array { identifier, .. }
            | Type::Message { identifier, .. }
            | Type::Derivation { identifier, .. }
            | Type::Refinement { identifier, .. } => identifier,
        }
    }

    /// The source position of the type's name.
    pub fn location(&self) -> Option<&Location> {
        self.identifier().location.as_ref()
    }

    /// The fixed size in bits, where defined.
    ///
    /// # Errors
    ///
    /// Arrays, messages, derivations and refinements have no fixed size.
    pub fn size(&self) -> Result<Expr, Diagnostics> {
        match self {
            Type::ModularInteger { bits, .. } | Type::RangeInteger { bits, .. } => {
                Ok(Expr::number(i64::from(*bits)))
            }
            Type::Array { identifier, .. } => fail(
                format!("array type \"{identifier}\" has no fixed size"),
                Subsystem::Model,
                Severity::Error,
                identifier.location.clone(),
            ),
            _ => fail(
                format!("type \"{}\" has no fixed size", self.identifier()),
                Subsystem::Model,
                Severity::Error,
                self.identifier().location.clone(),
            ),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    #[test]
    fn modular_size_is_log2_of_modulus() {
        let ty = Type::modular(id("U8"), 256).unwrap();
        assert_eq!(ty.size().unwrap(), Expr::number(8));
        let ty = Type::modular(id("U16"), 65536).unwrap();
        assert_eq!(ty.size().unwrap(), Expr::number(16));
    }

    #[test]
    fn modular_rejects_non_power_of_two() {
        let error = Type::modular(id("X"), 100).unwrap_err();
        assert_eq!(
            error.entries()[0].message,
            "invalid type X: 100 is not a power of two"
        );
    }

    #[test]
    fn modular_rejects_zero() {
        assert!(Type::modular(id("X"), 0).is_err());
    }

    #[test]
    fn range_size_is_declared_width() {
        let ty = Type::range(id("R"), 0, 255, 8).unwrap();
        assert_eq!(ty.size().unwrap(), Expr::number(8));
    }

    #[test]
    fn range_rejects_too_small_width() {
        let error = Type::range(id("R"), 0, 300, 8).unwrap_err();
        assert_eq!(
            error.entries()[0].message,
            "invalid type R: size too small for given range"
        );
    }

    #[test]
    fn range_rejects_negative_first() {
        let error = Type::range(id("R"), -1, 10, 8).unwrap_err();
        assert!(error.entries()[0].message.contains("negative first"));
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        let error = Type::range(id("R"), 10, 5, 8).unwrap_err();
        assert!(error.entries()[0].message.contains("negative range"));
    }

    #[test]
    fn array_has_no_fixed_size() {
        let ty = Type::array(id("Bytes"), id("U8"));
        assert!(ty.size().is_err());
    }

    #[test]
    fn boundary_widths() {
        // 255 fits exactly in 8 bits, 256 does not.
        assert!(Type::range(id("R"), 0, 255, 8).is_ok());
        assert!(Type::range(id("R"), 0, 256, 8).is_err());
        assert!(Type::range(id("R"), 0, 256, 9).is_ok());
        // A zero-width range is representable in any width.
        assert!(Type::range(id("R"), 0, 0, 1).is_ok());
    }
}
