//! # wirespec-algebra
//!
//! The symbolic expression algebra of wirespec.
//!
//! A specification describes packet layouts and state machines through
//! arithmetic, logical and attribute terms. This crate provides the closed
//! expression tree [`Expr`], its deterministic simplifier, substitution and
//! negation, and the kinded declaration environment used for scope checking.
//!
//! # Quick Start
//!
//! ```
//! use wirespec_algebra::Expr;
//! use wirespec_base::Identifier;
//!
//! // X + 2 - X simplifies to 2
//! let x = Identifier::new("X").unwrap();
//! let expr = Expr::add(vec![
//!     Expr::variable(x.clone()),
//!     Expr::number(2),
//!     Expr::variable(x).negated().unwrap(),
//! ]);
//! assert_eq!(expr.simplified(), Expr::number(2));
//! ```
//!
//! # Modules
//!
//! - [`expr`] - The expression tree and its operations
//! - [`simplify`] - Normal-form rewriting rules
//! - [`decl`] - Declarations, scopes and validation

pub mod decl;
pub mod expr;
pub mod simplify;

pub use decl::{Declaration, DeclarationKind, DeclarationTable, Parameter};
pub use expr::{
    AlgebraError, AssocOp, AttrExprKind, AttrKind, BinaryOp, Expr, ExprKind, Mapping, Precedence,
    Quantifier, RelOp, Variable,
};
