//! The model evaluator.
//!
//! [`evaluate`] walks a message graph from a root edge, computing for every
//! reachable field the facts `field'First` and `field'Last` and the path
//! condition under which the field is present. Distinct paths to the same
//! field accumulate as distinct variants.
//!
//! At every node the evaluator also discharges graph invariants through the
//! SMT bridge:
//!
//! * two outgoing edges whose conditions can hold together under the path
//!   condition are ambiguous (error);
//! * outgoing conditions that do not cover the path condition are
//!   incomplete (warning);
//! * `field'First >= 0` and a non-negative field length must be consistent
//!   with the path condition (error with unsat core, or warning when the
//!   solver is inconclusive).
//!
//! Cycles and conflicting field types abort the walk.

use wirespec_algebra::Expr;
use wirespec_base::{Diagnostics, Identifier, Severity, Subsystem};
use wirespec_verify::{Proof, ProofResult};

use crate::graph::{Edge, MessageGraph, Node, NodeIndex};
use crate::types::Type;

/// Per-path bindings of `First`/`Last` attributes to expressions.
///
/// Entries keep insertion order, so facts print and serialise
/// deterministically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facts {
    entries: Vec<(Expr, Expr)>,
}

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to `value`, replacing any previous binding.
    pub fn insert(&mut self, key: Expr, value: Expr) {
        if let Some(existing) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &Expr) -> Option<&Expr> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Rewrites `expr` by substituting every bound name.
    pub fn apply(&self, expr: &Expr) -> Expr {
        let lookup = |e: &Expr| self.get(e).cloned();
        match expr.substituted(Some(&lookup), None) {
            Ok(rewritten) => rewritten,
            Err(_) => expr.clone(),
        }
    }

    /// The bindings as equality facts for the solver.
    pub fn equalities(&self) -> Vec<Expr> {
        self.entries
            .iter()
            .map(|(k, v)| Expr::equal(k.clone(), v.clone()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Expr, Expr)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A materialised field: one entry per distinct path reaching it.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Identifier,
    pub ty: Type,
    pub variants: Vec<(Expr, Facts)>,
}

/// `all ∧ in ∧ (c₁ ∨ ... ∨ cₙ)`; the last clause is `True` without
/// outgoing conditions.
fn combine_conditions(all: &Expr, in_condition: &Expr, out_conditions: &[Expr]) -> Expr {
    let outgoing = if out_conditions.is_empty() {
        Expr::boolean(true)
    } else {
        Expr::or(out_conditions.to_vec())
    };
    Expr::and(vec![
        Expr::and(vec![all.clone(), in_condition.clone()]),
        outgoing,
    ])
}

/// An edge with its defaults resolved.
struct Walk {
    target: NodeIndex,
    condition: Expr,
    first: Expr,
    length: Expr,
}

/// Evaluates the graph reachable through `root`.
///
/// On success returns the materialised fields together with the
/// non-fatal diagnostics (warnings, infos) collected along the way.
///
/// # Errors
///
/// A non-empty bag when the walk found cycles, conflicting types,
/// array fields without a length, ambiguous edges or failed proof
/// obligations.
pub fn evaluate(graph: &MessageGraph, root: &Edge) -> Result<(Vec<Field>, Diagnostics), Diagnostics> {
    let mut evaluator = Evaluator {
        graph,
        diagnostics: Diagnostics::new(),
    };
    if graph.is_final(root.target) {
        return Ok((Vec::new(), evaluator.diagnostics));
    }
    let first = root
        .first
        .clone()
        .unwrap_or_else(|| Expr::number(0));
    let length = match &root.length {
        Some(length) => length.clone(),
        None => match evaluator.default_length(root) {
            Some(length) => length,
            None => return Err(evaluator.diagnostics),
        },
    };
    let walk = Walk {
        target: root.target,
        condition: root.condition.clone(),
        first,
        length,
    };
    match evaluator.walk(Facts::new(), Expr::boolean(true), walk, Vec::new()) {
        Ok(fields) => {
            if evaluator.diagnostics.has_errors() {
                Err(evaluator.diagnostics)
            } else {
                Ok((fields, evaluator.diagnostics))
            }
        }
        Err(fatal) => {
            evaluator.diagnostics.extend(fatal);
            Err(evaluator.diagnostics)
        }
    }
}

struct Evaluator<'a> {
    graph: &'a MessageGraph,
    diagnostics: Diagnostics,
}

impl Evaluator<'_> {
    /// The default length of an edge: its target type's size. Array-typed
    /// targets have none and require an explicit length.
    fn default_length(&mut self, edge: &Edge) -> Option<Expr> {
        let target = self.graph.node(edge.target);
        let ty = target.ty.as_ref()?;
        if matches!(ty, Type::Array { .. }) {
            self.diagnostics.append(
                format!(
                    "undefined length on edge to array-typed field \"{}\"",
                    target.name
                ),
                Subsystem::Model,
                Severity::Error,
                edge.location.clone(),
            );
            return None;
        }
        match ty.size() {
            Ok(size) => Some(size),
            Err(bag) => {
                self.diagnostics.extend(bag);
                None
            }
        }
    }

    fn walk(
        &mut self,
        mut facts: Facts,
        path: Expr,
        in_edge: Walk,
        visited: Vec<(NodeIndex, usize)>,
    ) -> Result<Vec<Field>, Diagnostics> {
        let node = self.graph.node(in_edge.target);
        let name = node.name.clone();
        let ty = match node.ty.clone() {
            Some(ty) => ty,
            None => return Ok(Vec::new()),
        };

        let first_attr = Expr::first(name.clone());
        let last_attr = Expr::last(name.clone());
        let first_value = facts.apply(&in_edge.first).simplified();
        facts.insert(first_attr, first_value);
        let last_value = facts
            .apply(&Expr::add(vec![
                in_edge.first.clone(),
                in_edge.length.clone(),
                Expr::number(-1),
            ]))
            .simplified();
        facts.insert(last_attr, last_value);

        if node.edges.is_empty() {
            self.diagnostics.append(
                format!("no outgoing edge at field \"{name}\""),
                Subsystem::Graph,
                Severity::Error,
                None,
            );
        }

        let out_conditions: Vec<Expr> = node.edges.iter().map(|e| e.condition.clone()).collect();
        let condition = combine_conditions(&path, &in_edge.condition, &out_conditions).simplified();
        let inner_path = combine_conditions(&path, &in_edge.condition, &[]).simplified();

        self.check_edge_conditions(&name, node, &inner_path);
        self.check_obligations(&name, &condition, &facts);

        let mut fields = vec![Field {
            name: name.clone(),
            ty,
            variants: vec![(condition, facts.clone())],
        }];

        for (edge_index, out_edge) in node.edges.iter().enumerate() {
            if self.graph.is_final(out_edge.target) {
                continue;
            }
            let key = (in_edge.target, edge_index);
            if visited.contains(&key) {
                let target_name = &self.graph.node(out_edge.target).name;
                let mut fatal = Diagnostics::new();
                fatal.append(
                    format!("cyclic graph in edge from \"{name}\" to \"{target_name}\""),
                    Subsystem::Model,
                    Severity::Error,
                    out_edge.location.clone(),
                );
                return Err(fatal);
            }
            let mut visited = visited.clone();
            visited.push(key);

            let first = out_edge.first.clone().unwrap_or_else(|| {
                Expr::add(vec![in_edge.first.clone(), in_edge.length.clone()])
            });
            let length = match &out_edge.length {
                Some(length) => length.clone(),
                None => match self.default_length(out_edge) {
                    Some(length) => length,
                    None => continue,
                },
            };
            let next = Walk {
                target: out_edge.target,
                condition: out_edge.condition.clone(),
                first,
                length,
            };
            let new_fields = self.walk(facts.clone(), inner_path.clone(), next, visited)?;
            merge_fields(&mut fields, new_fields)?;
        }
        Ok(fields)
    }

    /// Pairwise overlap (ambiguity) and coverage (completeness) of the
    /// outgoing edge conditions under the accumulated path condition.
    fn check_edge_conditions(&mut self, name: &Identifier, node: &Node, path: &Expr) {
        for (i, left) in node.edges.iter().enumerate() {
            for right in &node.edges[i + 1..] {
                let overlap = Expr::and(vec![
                    path.clone(),
                    left.condition.clone(),
                    right.condition.clone(),
                ])
                .simplified();
                if Proof::new(overlap, vec![]).result() == ProofResult::Sat {
                    self.diagnostics.append(
                        format!(
                            "ambiguous edges at field \"{name}\": \"{}\" and \"{}\" can hold together",
                            left.condition, right.condition
                        ),
                        Subsystem::Graph,
                        Severity::Error,
                        right.location.clone().or_else(|| left.location.clone()),
                    );
                }
            }
        }

        if node.edges.is_empty() {
            return;
        }
        let disjunction = Expr::or(
            node.edges
                .iter()
                .map(|e| e.condition.clone())
                .collect(),
        );
        // Logical complement, not name negation: the encoder translates
        // `not` over any boolean term.
        let uncovered = Expr::and(vec![path.clone(), Expr::not(disjunction)]).simplified();
        match Proof::new(uncovered, vec![]).result() {
            ProofResult::Unsat => {}
            ProofResult::Sat => self.diagnostics.append(
                format!("incomplete edge conditions at field \"{name}\""),
                Subsystem::Graph,
                Severity::Warning,
                node.edges[0].location.clone(),
            ),
            ProofResult::Unknown => self.diagnostics.append(
                format!("completeness of edge conditions at field \"{name}\" could not be proven"),
                Subsystem::Graph,
                Severity::Warning,
                node.edges[0].location.clone(),
            ),
        }
    }

    /// `field'First >= 0` and a non-negative length must be consistent
    /// with the path condition and the accumulated facts.
    fn check_obligations(&mut self, name: &Identifier, condition: &Expr, facts: &Facts) {
        let mut proof_facts = facts.equalities();
        proof_facts.push(condition.clone());

        let first_attr = Expr::first(name.clone());
        let negative_first = first_attr.with_negative(true);
        let goals = [
            Expr::greater_equal(first_attr, Expr::number(0)),
            // length >= 0, expressed as Last - First + 1 >= 0
            Expr::greater_equal(
                Expr::add(vec![
                    Expr::last(name.clone()),
                    negative_first,
                    Expr::number(1),
                ]),
                Expr::number(0),
            ),
        ];
        for goal in goals {
            let proof = Proof::new(goal.clone(), proof_facts.clone());
            match proof.result() {
                ProofResult::Sat => {}
                ProofResult::Unsat => {
                    self.diagnostics.append(
                        format!("proof failed for field \"{name}\": {goal}"),
                        Subsystem::Model,
                        Severity::Error,
                        None,
                    );
                    for (text, location) in proof.error() {
                        self.diagnostics.append(
                            text,
                            Subsystem::Model,
                            Severity::Info,
                            location,
                        );
                    }
                }
                ProofResult::Unknown => self.diagnostics.append(
                    format!("proof inconclusive for field \"{name}\": {goal}"),
                    Subsystem::Model,
                    Severity::Warning,
                    None,
                ),
            }
        }
    }
}

/// Merges fields of a subtree into the accumulated list, combining
/// variants per field name.
///
/// # Errors
///
/// When two paths declare the same field name with different types.
fn merge_fields(fields: &mut Vec<Field>, new_fields: Vec<Field>) -> Result<(), Diagnostics> {
    for new_field in new_fields {
        match fields.iter_mut().find(|f| f.name == new_field.name) {
            Some(existing) => {
                if existing.ty != new_field.ty {
                    let mut fatal = Diagnostics::new();
                    fatal.append(
                        format!(
                            "duplicate field \"{}\" with conflicting types (\"{}\" /= \"{}\")",
                            new_field.name,
                            existing.ty,
                            new_field.ty
                        ),
                        Subsystem::Model,
                        Severity::Error,
                        new_field.name.location.clone(),
                    );
                    return Err(fatal);
                }
                existing.variants.extend(new_field.variants);
            }
            None => fields.push(new_field),
        }
    }
    Ok(())
}
