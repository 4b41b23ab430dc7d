//! Shared builders for the end-to-end tests.
#![allow(dead_code)]

use wirespec_algebra::Expr;
use wirespec_base::Identifier;
use wirespec_model::types::Type;

pub fn id(name: &str) -> Identifier {
    Identifier::new(name).unwrap()
}

pub fn var(name: &str) -> Expr {
    Expr::variable(id(name))
}

pub fn byte() -> Type {
    Type::modular(id("U8"), 256).unwrap()
}
