//! E2E: simplifier laws.
//!
//! The universal properties of the rewriter: idempotence, semantic
//! preservation under the solver, negation involution, and substitution
//! identity/composition. The corpus covers every operator family the
//! simplifier rewrites.

mod common;

use common::{id, var};
use wirespec_algebra::{Expr, Mapping};
use wirespec_verify::{Proof, ProofResult};

/// Expression shapes exercising every rewrite rule.
fn corpus() -> Vec<Expr> {
    vec![
        Expr::add(vec![var("X"), Expr::number(2), var("X").negated().unwrap()]),
        Expr::add(vec![
            var("X"),
            Expr::add(vec![var("Y"), Expr::number(1)]),
            Expr::number(-1),
        ]),
        Expr::mul(vec![var("X"), Expr::number(1), Expr::number(4)]),
        Expr::sub(var("X"), var("Y")),
        Expr::sub(Expr::number(10), Expr::number(4)),
        Expr::div(Expr::number(9), Expr::number(3)),
        Expr::div(Expr::number(7), Expr::number(2)),
        Expr::pow(Expr::number(2), Expr::number(10)),
        Expr::modulo(Expr::number(17), Expr::number(5)),
        Expr::not(Expr::less(var("X"), Expr::number(10))),
        Expr::not(Expr::boolean(false)),
        Expr::and(vec![var("P"), Expr::boolean(true), var("Q")]),
        Expr::or(vec![var("P"), Expr::boolean(false)]),
        Expr::and(vec![var("P"), Expr::boolean(false)]),
        Expr::equal(Expr::number(5), Expr::number(5)),
        Expr::less(Expr::number(5), Expr::number(3)),
        Expr::less_equal(var("X"), var("X")),
        Expr::greater(
            Expr::add(vec![var("X"), Expr::number(0)]),
            Expr::mul(vec![var("Y"), Expr::number(1)]),
        ),
        Expr::if_expr(vec![(Expr::boolean(true), var("X"))], None),
        Expr::if_expr(
            vec![(Expr::less(var("X"), Expr::number(5)), Expr::number(1))],
            Some(Expr::number(2)),
        ),
    ]
}

#[test]
fn s7_add_cancellation() {
    let expr = Expr::add(vec![
        var("X"),
        Expr::number(2),
        var("X").negated().unwrap(),
    ]);
    assert_eq!(expr.simplified(), Expr::number(2));
}

#[test]
fn s8_relations_on_literals() {
    assert_eq!(
        Expr::equal(Expr::number(5), Expr::number(5)).simplified(),
        Expr::boolean(true)
    );
    assert_eq!(
        Expr::less(Expr::number(5), Expr::number(3)).simplified(),
        Expr::boolean(false)
    );
}

#[test]
fn simplification_is_idempotent() {
    for expr in corpus() {
        let once = expr.simplified();
        let twice = once.simplified();
        assert_eq!(once, twice, "simplify not idempotent for {expr}");
    }
}

#[test]
fn simplification_preserves_solver_semantics() {
    // For boolean terms: original and simplified form imply each other.
    // A counter-model to the equivalence would make the negation of the
    // biconditional satisfiable.
    let boolean_corpus = vec![
        Expr::not(Expr::less(var("X"), Expr::number(10))),
        Expr::and(vec![var("P"), Expr::boolean(true), var("Q")]),
        Expr::or(vec![
            Expr::less(var("X"), Expr::number(5)),
            Expr::boolean(false),
        ]),
        Expr::equal(Expr::number(5), Expr::number(5)),
    ];
    for expr in boolean_corpus {
        let simplified = expr.simplified();
        let differs = Expr::or(vec![
            Expr::and(vec![expr.clone(), Expr::not(simplified.clone())]),
            Expr::and(vec![Expr::not(expr.clone()), simplified.clone()]),
        ]);
        assert_eq!(
            Proof::new(differs, vec![]).result(),
            ProofResult::Unsat,
            "simplification changed the meaning of {expr}"
        );
    }

    // For arithmetic terms: a model where the values differ must not exist.
    let arithmetic_corpus = vec![
        Expr::add(vec![var("X"), Expr::number(2), var("X").negated().unwrap()]),
        Expr::sub(var("X"), var("Y")),
        Expr::mul(vec![var("X"), Expr::number(1)]),
        Expr::add(vec![var("X"), Expr::add(vec![var("Y"), Expr::number(1)])]),
    ];
    for expr in arithmetic_corpus {
        let simplified = expr.simplified();
        let differs = Expr::not_equal(expr.clone(), simplified);
        assert_eq!(
            Proof::new(differs, vec![]).result(),
            ProofResult::Unsat,
            "simplification changed the value of {expr}"
        );
    }
}

#[test]
fn negation_is_an_involution() {
    let negatable = vec![
        Expr::number(42),
        var("X"),
        Expr::less(var("X"), Expr::number(10)),
        Expr::and(vec![
            Expr::greater(var("X"), Expr::number(0)),
            Expr::less(var("X"), Expr::number(8)),
        ]),
        Expr::add(vec![var("X"), Expr::number(3)]),
        Expr::first(id("Tag")),
    ];
    for expr in negatable {
        let back = expr.negated().unwrap().negated().unwrap();
        assert_eq!(
            back.simplified(),
            expr.simplified(),
            "double negation changed {expr}"
        );
    }
}

#[test]
fn empty_substitution_is_the_identity() {
    let mapping = Mapping::new();
    for expr in corpus() {
        assert_eq!(expr.substituted(None, Some(&mapping)).unwrap(), expr);
    }
}

#[test]
fn substitutions_compose() {
    // X -> Y, then Y -> 3 equals the direct composite on this term.
    let mut first = Mapping::new();
    first.insert(var("X"), var("Y"));
    let mut second = Mapping::new();
    second.insert(var("Y"), Expr::number(3));

    let expr = Expr::add(vec![var("X"), var("Y")]);
    let stepwise = expr
        .substituted(None, Some(&first))
        .unwrap()
        .substituted(None, Some(&second))
        .unwrap();

    let mut composite = Mapping::new();
    composite.insert(var("X"), Expr::number(3));
    composite.insert(var("Y"), Expr::number(3));
    let direct = expr.substituted(None, Some(&composite)).unwrap();

    assert_eq!(stepwise, direct);
    assert_eq!(stepwise.simplified(), Expr::number(6));
}

#[test]
fn function_substitution_reaches_every_name() {
    let expr = Expr::and(vec![
        Expr::less(Expr::first(id("A")), Expr::last(id("A"))),
        Expr::greater(var("N"), Expr::number(0)),
    ]);
    let renamed = expr
        .substituted(
            Some(&|e: &Expr| {
                if *e == var("N") {
                    Some(var("M"))
                } else {
                    None
                }
            }),
            None,
        )
        .unwrap();
    assert_eq!(renamed.to_string(), "A'First < A'Last and M > 0");
}
