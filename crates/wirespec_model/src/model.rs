//! Package-level validation.
//!
//! [`check`] drives the whole pipeline over a parsed [`Specification`]:
//! every message type is evaluated into fields, refinements and derivations
//! are resolved against the package, every session is validated, and the
//! end identifier is matched against the package name. Diagnostics
//! aggregate across all entities; an entity whose own phase failed does not
//! contribute a result, but later entities are still checked.

use serde::Serialize;

use wirespec_algebra::Expr;
use wirespec_base::{Diagnostics, Identifier, Severity, Subsystem};

use crate::ast::Specification;
use crate::eval::{evaluate, Field};
use crate::graph::{Edge, MessageGraph};
use crate::types::Type;

/// The result of a successful validation: fields per message type plus the
/// non-fatal diagnostics collected on the way.
#[derive(Debug)]
pub struct ValidatedModel {
    pub fields: Vec<(Identifier, Vec<Field>)>,
    pub diagnostics: Diagnostics,
}

/// A flat, serialisable view of one materialised field.
#[derive(Debug, Serialize)]
pub struct FieldSummary {
    pub message: String,
    pub field: String,
    pub r#type: String,
    pub variants: Vec<VariantSummary>,
}

/// One `(condition, facts)` variant in printable form.
#[derive(Debug, Serialize)]
pub struct VariantSummary {
    pub condition: String,
    pub facts: Vec<(String, String)>,
}

impl ValidatedModel {
    /// The fields flattened into printable summaries for reporters.
    pub fn summaries(&self) -> Vec<FieldSummary> {
        self.fields
            .iter()
            .flat_map(|(message, fields)| {
                fields.iter().map(move |field| FieldSummary {
                    message: message.to_string(),
                    field: field.name.to_string(),
                    r#type: field.ty.to_string(),
                    variants: field
                        .variants
                        .iter()
                        .map(|(condition, facts)| VariantSummary {
                            condition: condition.to_string(),
                            facts: facts
                                .iter()
                                .map(|(k, v)| (k.to_string(), v.to_string()))
                                .collect(),
                        })
                        .collect(),
                })
            })
            .collect()
    }
}

/// Validates a parsed specification.
///
/// # Errors
///
/// The aggregated diagnostics when any entity failed validation.
pub fn check(specification: &Specification) -> Result<ValidatedModel, Diagnostics> {
    let mut diagnostics = Diagnostics::new();
    let package = &specification.package;

    if package.end_identifier != package.identifier {
        diagnostics.append(
            format!(
                "inconsistent package identifier \"{}\" (expected \"{}\")",
                package.end_identifier, package.identifier
            ),
            Subsystem::Parser,
            Severity::Error,
            package.end_identifier.location.clone(),
        );
    }

    let mut fields = Vec::new();
    for ty in &package.types {
        match ty {
            Type::Message {
                identifier, graph, ..
            } => match graph.initial() {
                // A message without fields is the null message.
                None => fields.push((identifier.clone(), Vec::new())),
                Some(initial) => {
                    let root = Edge::to(initial).with_first(Expr::number(0));
                    match evaluate(graph, &root) {
                        Ok((message_fields, warnings)) => {
                            diagnostics.extend(warnings);
                            fields.push((identifier.clone(), message_fields));
                        }
                        Err(bag) => diagnostics.extend(bag),
                    }
                }
            },
            Type::Refinement {
                identifier,
                pdu,
                field,
                sdu,
                ..
            } => {
                let pdu_graph = package_message(package, pdu);
                let sdu_exists = package_message(package, sdu).is_some();
                check_refinement(pdu_graph, identifier, pdu, field, sdu, sdu_exists, &mut diagnostics);
            }
            Type::Derivation { identifier, base } => {
                if !package.types.iter().any(|t| t.identifier() == base) {
                    diagnostics.append(
                        format!("undeclared base type \"{base}\" in derivation \"{identifier}\""),
                        Subsystem::Model,
                        Severity::Error,
                        identifier.location.clone(),
                    );
                }
            }
            _ => {}
        }
    }

    for session in &package.sessions {
        diagnostics.extend(session.validate());
    }

    if diagnostics.has_errors() {
        Err(diagnostics)
    } else {
        Ok(ValidatedModel {
            fields,
            diagnostics,
        })
    }
}

fn package_message<'a>(
    package: &'a crate::ast::Package,
    name: &Identifier,
) -> Option<&'a MessageGraph> {
    package.types.iter().find_map(|t| match t {
        Type::Message {
            identifier, graph, ..
        } if identifier == name => Some(graph),
        _ => None,
    })
}

fn check_refinement(
    pdu_graph: Option<&MessageGraph>,
    identifier: &Identifier,
    pdu: &Identifier,
    field: &Identifier,
    sdu: &Identifier,
    sdu_exists: bool,
    diagnostics: &mut Diagnostics,
) {
    match pdu_graph {
        None => diagnostics.append(
            format!("undeclared message \"{pdu}\" in refinement \"{identifier}\""),
            Subsystem::Model,
            Severity::Error,
            identifier.location.clone(),
        ),
        Some(graph) => {
            if !graph.nodes().any(|(_, node)| node.name == *field) {
                diagnostics.append(
                    format!("invalid field \"{field}\" in refinement \"{identifier}\""),
                    Subsystem::Model,
                    Severity::Error,
                    identifier.location.clone(),
                );
            }
        }
    }
    if !sdu_exists {
        diagnostics.append(
            format!("undeclared message \"{sdu}\" in refinement \"{identifier}\""),
            Subsystem::Model,
            Severity::Error,
            identifier.location.clone(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Package;
    use wirespec_session::{Session, State, Transition};

    fn id(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    fn byte() -> Type {
        Type::modular(id("U8"), 256).unwrap()
    }

    fn tlv_message(name: &str) -> Type {
        let mut graph = MessageGraph::new();
        let tag = graph.add_node(id("Tag"), byte());
        let value = graph.add_node(id("Value"), byte());
        graph.add_edge(tag, Edge::to(value));
        graph.add_edge(value, Edge::to(MessageGraph::FINAL));
        Type::message(id(name), graph)
    }

    #[test]
    fn valid_package_produces_fields() {
        let package = Package::new(id("Protocol")).with_types(vec![tlv_message("Frame")]);
        let model = check(&Specification::new(package)).unwrap();
        assert_eq!(model.fields.len(), 1);
        assert_eq!(model.fields[0].1.len(), 2);
    }

    #[test]
    fn end_identifier_mismatch_is_an_error() {
        let package = Package::new(id("Protocol")).with_end_identifier(id("Protokoll"));
        let error = check(&Specification::new(package)).unwrap_err();
        assert!(error.entries()[0]
            .message
            .contains("inconsistent package identifier"));
        assert_eq!(error.entries()[0].subsystem, Subsystem::Parser);
    }

    #[test]
    fn refinement_against_unknown_message_is_an_error() {
        let package = Package::new(id("P")).with_types(vec![Type::Refinement {
            identifier: id("R"),
            pdu: id("Missing"),
            field: id("Payload"),
            sdu: id("AlsoMissing"),
            condition: Expr::boolean(true),
        }]);
        let error = check(&Specification::new(package)).unwrap_err();
        assert!(error.len() >= 2);
    }

    #[test]
    fn refinement_field_must_exist_in_pdu() {
        let package = Package::new(id("P")).with_types(vec![
            tlv_message("Outer"),
            tlv_message("Inner"),
            Type::Refinement {
                identifier: id("R"),
                pdu: id("Outer"),
                field: id("Nonexistent"),
                sdu: id("Inner"),
                condition: Expr::boolean(true),
            },
        ]);
        let error = check(&Specification::new(package)).unwrap_err();
        assert!(error.entries()[0]
            .message
            .contains("invalid field \"Nonexistent\""));
    }

    #[test]
    fn valid_refinement_passes() {
        let package = Package::new(id("P")).with_types(vec![
            tlv_message("Outer"),
            tlv_message("Inner"),
            Type::Refinement {
                identifier: id("R"),
                pdu: id("Outer"),
                field: id("Value"),
                sdu: id("Inner"),
                condition: Expr::boolean(true),
            },
        ]);
        assert!(check(&Specification::new(package)).is_ok());
    }

    #[test]
    fn derivation_requires_declared_base() {
        let package = Package::new(id("P")).with_types(vec![Type::Derivation {
            identifier: id("D"),
            base: id("Missing"),
        }]);
        let error = check(&Specification::new(package)).unwrap_err();
        assert!(error.entries()[0].message.contains("undeclared base type"));
    }

    #[test]
    fn session_diagnostics_are_aggregated() {
        let session = Session::new(
            id("M"),
            id("Start"),
            id("Done"),
            vec![
                State::new(id("Start")).with_transitions(vec![Transition::new(id("Done"))]),
                State::new(id("Done")),
                State::new(id("Orphan")),
            ],
        );
        let package = Package::new(id("P")).with_sessions(vec![session]);
        let error = check(&Specification::new(package)).unwrap_err();
        assert!(error
            .entries()
            .iter()
            .any(|e| e.message.contains("unreachable states Orphan")));
    }

    #[test]
    fn summaries_are_serialisable() {
        let package = Package::new(id("Protocol")).with_types(vec![tlv_message("Frame")]);
        let model = check(&Specification::new(package)).unwrap();
        let summaries = model.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].message, "Frame");
        assert_eq!(summaries[0].field, "Tag");
    }
}
