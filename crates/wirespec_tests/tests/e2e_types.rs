//! E2E: type construction and sizes.
//!
//! Modular and range integers carry a fixed bit width; ill-formed
//! parameters are rejected at construction with the exact diagnostic text
//! reporters rely on.

mod common;

use common::id;
use wirespec_algebra::Expr;
use wirespec_model::types::Type;

#[test]
fn modular_integer_u8() {
    let ty = Type::modular(id("U8"), 256).unwrap();
    assert_eq!(ty.size().unwrap(), Expr::number(8));
}

#[test]
fn modular_integer_invalid_modulus() {
    let error = Type::modular(id("X"), 100).unwrap_err();
    assert_eq!(
        error.entries()[0].message,
        "invalid type X: 100 is not a power of two"
    );
    assert_eq!(error.to_string(), "model: error: invalid type X: 100 is not a power of two");
}

#[test]
fn range_integer_byte() {
    let ty = Type::range(id("R"), 0, 255, 8).unwrap();
    assert_eq!(ty.size().unwrap(), Expr::number(8));
}

#[test]
fn range_integer_too_narrow() {
    let error = Type::range(id("R"), 0, 300, 8).unwrap_err();
    assert!(error.entries()[0]
        .message
        .contains("size too small for given range"));
}

#[test]
fn modular_sizes_across_widths() {
    for (modulus, bits) in [(2_u64, 1_i64), (16, 4), (256, 8), (65536, 16), (1 << 32, 32)] {
        let ty = Type::modular(id("T"), modulus).unwrap();
        assert_eq!(ty.size().unwrap(), Expr::number(bits));
    }
}

#[test]
fn array_size_is_undefined() {
    let ty = Type::array(id("Payload"), id("U8"));
    let error = ty.size().unwrap_err();
    assert!(error.entries()[0].message.contains("no fixed size"));
}
