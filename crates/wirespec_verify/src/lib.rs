//! # wirespec-verify
//!
//! Z3-based proof discharge for wirespec.
//!
//! The message-model evaluator and the graph analyser accumulate path
//! conditions as [`Expr`](wirespec_algebra::Expr) trees. This crate
//! translates those trees into the solver's linear integer arithmetic and
//! asks for satisfiability.
//!
//! ## Quick Start
//!
//! ```ignore
//! use wirespec_algebra::Expr;
//! use wirespec_base::Identifier;
//! use wirespec_verify::{Proof, ProofResult};
//!
//! let x = Identifier::new("X").unwrap();
//! let goal = Expr::greater(Expr::variable(x.clone()), Expr::number(5));
//! let fact = Expr::equal(Expr::variable(x), Expr::number(10));
//! let proof = Proof::new(goal, vec![fact]);
//! assert_eq!(proof.result(), ProofResult::Sat);
//! ```
//!
//! ## Encoding Strategy
//!
//! | Term shape | Solver encoding |
//! |------------|-----------------|
//! | Arithmetic | `Int` terms |
//! | Logical, relations | `Bool` terms |
//! | `If`/`Case` | Nested if-then-else, right-associative |
//! | `Valid_Checksum` | `true` |
//! | Selections, slices, calls, aggregates, quantifiers, `in` | Opaque constants keyed by canonical string form |
//!
//! Opaque constants carry no semantics beyond equality by identity: two
//! occurrences with the same string form denote the same constant.
//!
//! ## Determinism
//!
//! Every proof instantiates a fresh solver context; no state is shared
//! between proofs.

pub mod solver;

pub use solver::{Proof, ProofResult};
