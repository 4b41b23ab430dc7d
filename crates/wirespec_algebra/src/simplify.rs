//! Deterministic normal-form rewriting.
//!
//! [`Expr::simplified`] applies a fixed rule set until no rule applies:
//! constant folding, associative flattening, neutral-element elimination,
//! absorption, inverse cancellation in sums, subtraction normalisation,
//! negation pushdown on relations, reflexive-relation elimination, and the
//! collapses of degenerate `if`/`case`/`where` forms.
//!
//! The rewriter is confluent modulo term order and idempotent:
//! `simplify(simplify(e)) == simplify(e)`.

use crate::expr::{AssocOp, BinaryOp, Expr, ExprKind, Mapping};

/// Python-style modulo: the result carries the sign of the divisor.
fn modulo(left: i64, right: i64) -> i64 {
    ((left % right) + right) % right
}

impl Expr {
    /// The simplified normal form of the term.
    ///
    /// Always returns a new tree; the receiver is unchanged.
    pub fn simplified(&self) -> Expr {
        let location = self.location.clone();
        match &self.kind {
            ExprKind::Assoc { op, terms } => simplify_assoc(*op, terms, location),
            ExprKind::Binary { op, left, right } => {
                simplify_binary(*op, left.simplified(), right.simplified(), location)
            }
            ExprKind::Not(inner) => simplify_not(inner, location),
            ExprKind::Relation { op, left, right } => {
                let left = left.simplified();
                let right = right.simplified();
                if op.is_reflexive() && left == right {
                    return Expr::boolean(true);
                }
                if let (
                    ExprKind::Number { value: l, .. },
                    ExprKind::Number { value: r, .. },
                ) = (&left.kind, &right.kind)
                {
                    if let Some(decision) = op.decide(*l, *r) {
                        return Expr::boolean(decision);
                    }
                }
                Expr {
                    kind: ExprKind::Relation {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    location,
                }
            }
            ExprKind::If {
                branches,
                else_branch,
            } => {
                let branches: Vec<(Expr, Expr)> = branches
                    .iter()
                    .map(|(c, e)| (c.simplified(), e.simplified()))
                    .collect();
                if branches.len() == 1 && matches!(branches[0].0.kind, ExprKind::True) {
                    return branches.into_iter().next().expect("one branch").1;
                }
                Expr {
                    kind: ExprKind::If {
                        branches,
                        else_branch: else_branch.as_ref().map(|e| Box::new(e.simplified())),
                    },
                    location,
                }
            }
            ExprKind::Case { scrutinee, arms } => {
                if arms.len() == 1 {
                    if let ExprKind::Variable(v) = &arms[0].0.kind {
                        if v.identifier.to_string().eq_ignore_ascii_case("others") {
                            return arms[0].1.simplified();
                        }
                    }
                }
                Expr {
                    kind: ExprKind::Case {
                        scrutinee: Box::new(scrutinee.simplified()),
                        arms: arms
                            .iter()
                            .map(|(c, e)| (c.simplified(), e.simplified()))
                            .collect(),
                    },
                    location,
                }
            }
            ExprKind::Binding { expr, bindings } => {
                let mut mapping = Mapping::new();
                for (name, value) in bindings {
                    mapping.insert(Expr::variable(name.clone()), value.simplified());
                }
                match expr.substituted(None, Some(&mapping)) {
                    Ok(bound) => bound.simplified(),
                    // A binding whose substitution is not expressible is kept.
                    Err(_) => Expr {
                        kind: ExprKind::Binding {
                            expr: Box::new(expr.simplified()),
                            bindings: bindings
                                .iter()
                                .map(|(n, e)| (n.clone(), e.simplified()))
                                .collect(),
                        },
                        location,
                    },
                }
            }
            ExprKind::Attribute {
                kind,
                prefix,
                negative,
            } => Expr {
                kind: ExprKind::Attribute {
                    kind: *kind,
                    prefix: Box::new(prefix.simplified()),
                    negative: *negative,
                },
                location,
            },
            ExprKind::AttributeExpr {
                kind,
                prefix,
                argument,
                negative,
            } => Expr {
                kind: ExprKind::AttributeExpr {
                    kind: *kind,
                    prefix: Box::new(prefix.simplified()),
                    argument: Box::new(argument.simplified()),
                    negative: *negative,
                },
                location,
            },
            ExprKind::Slice {
                prefix,
                first,
                last,
            } => Expr {
                kind: ExprKind::Slice {
                    prefix: Box::new(prefix.simplified()),
                    first: Box::new(first.simplified()),
                    last: Box::new(last.simplified()),
                },
                location,
            },
            ExprKind::Aggregate(elements) => Expr {
                kind: ExprKind::Aggregate(elements.iter().map(Expr::simplified).collect()),
                location,
            },
            ExprKind::NamedAggregate(elements) => Expr {
                kind: ExprKind::NamedAggregate(
                    elements
                        .iter()
                        .map(|(n, e)| (n.clone(), e.simplified()))
                        .collect(),
                ),
                location,
            },
            ExprKind::Quantified {
                quantifier,
                parameter,
                iterable,
                predicate,
            } => Expr {
                kind: ExprKind::Quantified {
                    quantifier: *quantifier,
                    parameter: parameter.clone(),
                    iterable: Box::new(iterable.simplified()),
                    predicate: Box::new(predicate.simplified()),
                },
                location,
            },
            ExprKind::ValueRange { lower, upper } => Expr {
                kind: ExprKind::ValueRange {
                    lower: Box::new(lower.simplified()),
                    upper: Box::new(upper.simplified()),
                },
                location,
            },
            ExprKind::Conversion { name, argument } => Expr {
                kind: ExprKind::Conversion {
                    name: name.clone(),
                    argument: Box::new(argument.simplified()),
                },
                location,
            },
            ExprKind::Comprehension {
                iterator,
                array,
                selector,
                condition,
            } => Expr {
                kind: ExprKind::Comprehension {
                    iterator: iterator.clone(),
                    array: Box::new(array.simplified()),
                    selector: Box::new(selector.simplified()),
                    condition: Box::new(condition.simplified()),
                },
                location,
            },
            ExprKind::MessageAggregate { name, fields } => Expr {
                kind: ExprKind::MessageAggregate {
                    name: name.clone(),
                    fields: fields
                        .iter()
                        .map(|(n, e)| (n.clone(), e.simplified()))
                        .collect(),
                },
                location,
            },
            // Literals and plain names are already in normal form.
            _ => self.clone(),
        }
    }
}

/// Folds constants, flattens nested nodes of the same kind, drops the
/// neutral element and collapses singletons. Sums additionally cancel
/// inverse term pairs; conjunctions and disjunctions absorb their
/// dominating constant.
fn simplify_assoc(op: AssocOp, terms: &[Expr], location: Option<wirespec_base::Location>) -> Expr {
    let mut work: Vec<Expr> = terms.to_vec();
    let mut kept: Vec<Expr> = Vec::new();
    let mut total = op.neutral();
    let mut index = 0;
    while index < work.len() {
        let term = work[index].simplified();
        index += 1;
        match term.kind {
            ExprKind::Number { value, .. } => total = op.apply(total, value),
            ExprKind::True => total = op.apply(total, 1),
            ExprKind::False => total = op.apply(total, 0),
            ExprKind::Assoc {
                op: inner_op,
                terms: inner_terms,
            } if inner_op == op => work.extend(inner_terms),
            _ => kept.push(term),
        }
    }

    if kept.is_empty() {
        return if op.is_boolean() {
            Expr::boolean(total != 0)
        } else {
            Expr::number(total)
        };
    }
    if total != op.neutral() {
        kept.push(if op.is_boolean() {
            Expr::boolean(total != 0)
        } else {
            Expr::number(total)
        });
    }

    // Absorption.
    if matches!(op, AssocOp::And | AssocOp::AndThen)
        && kept.iter().any(|t| matches!(t.kind, ExprKind::False))
    {
        return Expr::boolean(false);
    }
    if matches!(op, AssocOp::Or | AssocOp::OrElse)
        && kept.iter().any(|t| matches!(t.kind, ExprKind::True))
    {
        return Expr::boolean(true);
    }

    if op == AssocOp::Add {
        kept = cancel_inverses(kept);
        if kept.is_empty() {
            return Expr::number(0);
        }
    }

    if kept.len() == 1 {
        return kept.into_iter().next().expect("one term");
    }
    Expr {
        kind: ExprKind::Assoc { op, terms: kept },
        location,
    }
}

/// Removes `t`/`-t` pairs from a sum, scanning right to left.
fn cancel_inverses(terms: Vec<Expr>) -> Vec<Expr> {
    let mut kept: Vec<Expr> = Vec::new();
    for term in terms.into_iter().rev() {
        let complement = term
            .negated()
            .ok()
            .and_then(|neg| kept.iter().position(|other| *other == neg));
        match complement {
            Some(found) => {
                kept.remove(found);
            }
            None => kept.insert(0, term),
        }
    }
    kept
}

fn simplify_binary(
    op: BinaryOp,
    left: Expr,
    right: Expr,
    location: Option<wirespec_base::Location>,
) -> Expr {
    if let (ExprKind::Number { value: l, .. }, ExprKind::Number { value: r, .. }) =
        (&left.kind, &right.kind)
    {
        let (l, r) = (*l, *r);
        match op {
            BinaryOp::Sub => return Expr::number(l.wrapping_sub(r)),
            BinaryOp::Div => {
                if r != 0 && l % r == 0 {
                    return Expr::number(l / r);
                }
            }
            BinaryOp::Pow => {
                if (0..=u32::MAX as i64).contains(&r) {
                    if let Some(value) = l.checked_pow(r as u32) {
                        return Expr::number(value);
                    }
                }
            }
            BinaryOp::Mod => {
                if r != 0 {
                    return Expr::number(modulo(l, r));
                }
            }
        }
    }
    if op == BinaryOp::Sub {
        if let Ok(negated_right) = right.negated() {
            return Expr::add(vec![left, negated_right]).simplified();
        }
    }
    Expr {
        kind: ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        location,
    }
}

/// Pushes negation through relations, folds boolean constants, and
/// otherwise simplifies the operand.
fn simplify_not(inner: &Expr, location: Option<wirespec_base::Location>) -> Expr {
    let inner = inner.simplified();
    if let ExprKind::Relation { op, left, right } = &inner.kind {
        if op.is_comparison() {
            return Expr {
                kind: ExprKind::Relation {
                    op: op.inverse(),
                    left: left.clone(),
                    right: right.clone(),
                },
                location,
            }
            .simplified();
        }
    }
    match inner.kind {
        ExprKind::True => Expr::boolean(false),
        ExprKind::False => Expr::boolean(true),
        _ => Expr {
            kind: ExprKind::Not(Box::new(inner)),
            location,
        },
    }
}
