//! # wirespec-session
//!
//! Session state machines and their validator.
//!
//! A session describes the communicating behaviour around a message format:
//! states, transitions guarded by conditions, and actions over declared
//! variables and channels. Validation checks the state graph (existence,
//! duplicates, reachability, detachment) and the scoping of every condition,
//! action and declaration, accumulating all defects before reporting.
//!
//! ```
//! use wirespec_base::Identifier;
//! use wirespec_session::{Session, State, Transition};
//!
//! let id = |s: &str| Identifier::new(s).unwrap();
//! let session = Session::new(
//!     id("Handshake"),
//!     id("Start"),
//!     id("Done"),
//!     vec![
//!         State::new(id("Start")).with_transitions(vec![Transition::new(id("Done"))]),
//!         State::new(id("Done")),
//!     ],
//! );
//! assert!(session.check().is_ok());
//! ```

pub mod session;
pub mod statement;

pub use session::{Session, State, Transition};
pub use statement::Statement;
