//! Z3 solver wrapper.
//!
//! A [`Proof`] asserts a goal together with a set of facts and asks the
//! solver for satisfiability. When the assertion set is unsatisfiable,
//! [`Proof::error`] re-runs the check with labelled assertions and returns
//! the participating facts (the unsat core) with their source locations for
//! diagnostics.
//!
//! Each proof creates its own [`z3::Context`] with a 10-second timeout, so
//! proofs are independent and could be scheduled in parallel by a caller.

use std::collections::HashMap;

use z3::ast::{Ast, Bool, Int};
use z3::{Config, Context, SatResult, Solver};

use wirespec_algebra::{AssocOp, AttrKind, Expr, ExprKind, RelOp};
use wirespec_base::Location;

/// Outcome of a satisfiability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofResult {
    /// The assertion set has a model.
    Sat,
    /// The assertion set is contradictory.
    Unsat,
    /// The solver gave up (timeout or undecidable fragment).
    Unknown,
}

/// A discharged proof obligation.
///
/// The result is computed eagerly on construction; the goal and facts are
/// retained so an unsat core can be extracted afterwards.
pub struct Proof {
    goal: Expr,
    facts: Vec<Expr>,
    result: ProofResult,
}

impl Proof {
    /// Checks the satisfiability of `goal ∧ facts`.
    pub fn new(goal: Expr, facts: Vec<Expr>) -> Self {
        let mut cfg = Config::new();
        cfg.set_param_value("timeout", "10000");
        let ctx = Context::new(&cfg);
        let solver = Solver::new(&ctx);
        let encoder = Encoder::new(&ctx);

        solver.assert(&encoder.boolean(&goal));
        for fact in &facts {
            solver.assert(&encoder.boolean(fact));
        }

        let result = match solver.check() {
            SatResult::Sat => ProofResult::Sat,
            SatResult::Unsat => ProofResult::Unsat,
            SatResult::Unknown => ProofResult::Unknown,
        };
        Self {
            goal,
            facts,
            result,
        }
    }

    /// The satisfiability verdict.
    pub fn result(&self) -> ProofResult {
        self.result
    }

    /// The unsat core: the facts (and the goal) participating in the
    /// contradiction, whitespace-normalised, with their source locations.
    ///
    /// Only meaningful when [`Proof::result`] is [`ProofResult::Unsat`];
    /// otherwise the returned list is empty. Entries are ordered by their
    /// assertion label (`H0`, `H1`, ..., `goal`), so output is
    /// deterministic.
    pub fn error(&self) -> Vec<(String, Option<Location>)> {
        if self.result != ProofResult::Unsat {
            return Vec::new();
        }
        let mut cfg = Config::new();
        cfg.set_param_value("timeout", "10000");
        let ctx = Context::new(&cfg);
        let solver = Solver::new(&ctx);
        let encoder = Encoder::new(&ctx);

        let mut labelled: HashMap<String, &Expr> = HashMap::new();
        for (index, fact) in self.facts.iter().enumerate() {
            let label = format!("H{index}");
            let tracker = Bool::new_const(&ctx, label.as_str());
            solver.assert_and_track(&encoder.boolean(fact), &tracker);
            labelled.insert(label, fact);
        }
        let goal_tracker = Bool::new_const(&ctx, "goal");
        solver.assert_and_track(&encoder.boolean(&self.goal), &goal_tracker);
        labelled.insert("goal".to_string(), &self.goal);

        let result = solver.check();
        debug_assert!(matches!(result, SatResult::Unsat));

        let mut labels: Vec<String> = solver
            .get_unsat_core()
            .iter()
            .map(|tracker| tracker.to_string())
            .collect();
        labels.sort();
        labels
            .into_iter()
            .filter_map(|label| labelled.get(label.as_str()))
            .map(|expr| (normalized(expr), expr.location.clone()))
            .collect()
    }
}

/// Collapses runs of whitespace for single-line diagnostics.
fn normalized(expr: &Expr) -> String {
    expr.to_string()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Translates expression trees into Z3 terms.
struct Encoder<'ctx> {
    ctx: &'ctx Context,
}

impl<'ctx> Encoder<'ctx> {
    fn new(ctx: &'ctx Context) -> Self {
        Self { ctx }
    }

    /// Whether a term denotes a truth value in the solver's logic.
    fn is_boolean(expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::True | ExprKind::False | ExprKind::Not(_) | ExprKind::Relation { .. } => true,
            ExprKind::Assoc { op, .. } => op.is_boolean(),
            ExprKind::Attribute { kind, .. } => kind.is_boolean(),
            ExprKind::Quantified { .. } => true,
            ExprKind::If { branches, .. } => branches
                .first()
                .map(|(_, value)| Self::is_boolean(value))
                .unwrap_or(false),
            ExprKind::Case { arms, .. } => arms
                .first()
                .map(|(_, value)| Self::is_boolean(value))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// An opaque boolean constant keyed by the term's string form.
    fn opaque_bool(&self, expr: &Expr) -> Bool<'ctx> {
        Bool::new_const(self.ctx, expr.to_string().as_str())
    }

    /// An opaque integer constant keyed by the term's string form.
    fn opaque_int(&self, expr: &Expr) -> Int<'ctx> {
        Int::new_const(self.ctx, expr.to_string().as_str())
    }

    fn boolean(&self, expr: &Expr) -> Bool<'ctx> {
        match &expr.kind {
            ExprKind::True => Bool::from_bool(self.ctx, true),
            ExprKind::False => Bool::from_bool(self.ctx, false),
            ExprKind::Not(inner) => self.boolean(inner).not(),
            ExprKind::Assoc { op, terms } if op.is_boolean() => {
                let encoded: Vec<Bool<'ctx>> = terms.iter().map(|t| self.boolean(t)).collect();
                let refs: Vec<&Bool<'ctx>> = encoded.iter().collect();
                match op {
                    AssocOp::And | AssocOp::AndThen => Bool::and(self.ctx, &refs),
                    _ => Bool::or(self.ctx, &refs),
                }
            }
            ExprKind::Relation { op, left, right } => match op {
                RelOp::Less => self.integer(left).lt(&self.integer(right)),
                RelOp::LessEqual => self.integer(left).le(&self.integer(right)),
                RelOp::Greater => self.integer(left).gt(&self.integer(right)),
                RelOp::GreaterEqual => self.integer(left).ge(&self.integer(right)),
                RelOp::Equal | RelOp::NotEqual => {
                    let equality = if Self::is_boolean(left) || Self::is_boolean(right) {
                        self.boolean(left)._eq(&self.boolean(right))
                    } else {
                        self.integer(left)._eq(&self.integer(right))
                    };
                    if *op == RelOp::NotEqual {
                        equality.not()
                    } else {
                        equality
                    }
                }
                RelOp::In | RelOp::NotIn => self.opaque_bool(expr),
            },
            ExprKind::Attribute { kind, .. } if *kind == AttrKind::ValidChecksum => {
                Bool::from_bool(self.ctx, true)
            }
            ExprKind::Attribute { kind, .. } if kind.is_boolean() => self.opaque_bool(expr),
            ExprKind::If {
                branches,
                else_branch,
            } => self.ite_bool(branches, else_branch.as_deref()),
            ExprKind::Case { scrutinee, arms } => self.case_bool(scrutinee, arms),
            ExprKind::Variable(v) if !v.negative => {
                Bool::new_const(self.ctx, expr.to_string().as_str())
            }
            _ => self.opaque_bool(expr),
        }
    }

    fn ite_bool(&self, branches: &[(Expr, Expr)], else_branch: Option<&Expr>) -> Bool<'ctx> {
        match branches.split_first() {
            Some(((condition, value), rest)) => {
                let tail = self.ite_bool(rest, else_branch);
                self.boolean(condition).ite(&self.boolean(value), &tail)
            }
            None => match else_branch {
                Some(value) => self.boolean(value),
                None => Bool::from_bool(self.ctx, false),
            },
        }
    }

    fn case_bool(&self, scrutinee: &Expr, arms: &[(Expr, Expr)]) -> Bool<'ctx> {
        match arms.split_first() {
            Some(((label, value), rest)) => {
                let matches = self.integer(scrutinee)._eq(&self.integer(label));
                matches.ite(&self.boolean(value), &self.case_bool(scrutinee, rest))
            }
            None => Bool::from_bool(self.ctx, false),
        }
    }

    fn integer(&self, expr: &Expr) -> Int<'ctx> {
        match &expr.kind {
            ExprKind::Number { value, .. } => Int::from_i64(self.ctx, *value),
            ExprKind::True => Int::from_i64(self.ctx, 1),
            ExprKind::False => Int::from_i64(self.ctx, 0),
            ExprKind::Assoc { op, terms } => match op {
                AssocOp::Add => terms
                    .iter()
                    .map(|t| self.integer(t))
                    .reduce(|a, b| a + b)
                    .unwrap_or_else(|| Int::from_i64(self.ctx, 0)),
                AssocOp::Mul => terms
                    .iter()
                    .map(|t| self.integer(t))
                    .reduce(|a, b| a * b)
                    .unwrap_or_else(|| Int::from_i64(self.ctx, 1)),
                _ => self.opaque_int(expr),
            },
            ExprKind::Binary { op, left, right } => match op {
                wirespec_algebra::BinaryOp::Sub => self.integer(left) - self.integer(right),
                wirespec_algebra::BinaryOp::Div => self.integer(left) / self.integer(right),
                // Constant powers and moduli fold in the simplifier; the
                // residual symbolic cases are opaque.
                _ => self.opaque_int(expr),
            },
            ExprKind::If {
                branches,
                else_branch,
            } => self.ite_int(branches, else_branch.as_deref()),
            ExprKind::Case { scrutinee, arms } => self.case_int(scrutinee, arms),
            _ => {
                if expr.is_negative() {
                    let positive = expr.with_negative(false);
                    return self.integer(&positive) * Int::from_i64(self.ctx, -1);
                }
                self.opaque_int(expr)
            }
        }
    }

    fn ite_int(&self, branches: &[(Expr, Expr)], else_branch: Option<&Expr>) -> Int<'ctx> {
        match branches.split_first() {
            Some(((condition, value), rest)) => {
                let tail = self.ite_int(rest, else_branch);
                self.boolean(condition).ite(&self.integer(value), &tail)
            }
            None => match else_branch {
                Some(value) => self.integer(value),
                None => Int::from_i64(self.ctx, 0),
            },
        }
    }

    fn case_int(&self, scrutinee: &Expr, arms: &[(Expr, Expr)]) -> Int<'ctx> {
        match arms.split_first() {
            Some(((label, value), rest)) => {
                let matches = self.integer(scrutinee)._eq(&self.integer(label));
                matches.ite(&self.integer(value), &self.case_int(scrutinee, rest))
            }
            None => Int::from_i64(self.ctx, 0),
        }
    }
}
