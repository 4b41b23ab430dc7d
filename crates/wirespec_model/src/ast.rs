//! The hand-off surface between the external parser and the model.
//!
//! The parser assembles a [`Specification`]: a context clause and a package
//! owning types and sessions. Message layouts arrive as an ordered list of
//! [`Component`]s with their [`Then`] clauses and are lowered into a
//! [`MessageGraph`](crate::graph::MessageGraph) by [`lower_components`].

use std::collections::BTreeMap;

use wirespec_algebra::Expr;
use wirespec_base::{Diagnostics, Identifier, Location, Severity, Subsystem};
use wirespec_session::Session;

use crate::graph::{Edge, MessageGraph, NodeIndex};
use crate::types::Type;

/// An edge description as written in a component list: `then name`.
#[derive(Debug, Clone)]
pub struct Then {
    /// Target field; `None` denotes the end of the message.
    pub name: Option<Identifier>,
    pub first: Option<Expr>,
    pub length: Option<Expr>,
    pub condition: Expr,
    pub location: Option<Location>,
}

impl Then {
    pub fn new(name: Option<Identifier>) -> Self {
        Self {
            name,
            first: None,
            length: None,
            condition: Expr::boolean(true),
            location: None,
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Expr) -> Self {
        self.condition = condition;
        self
    }

    #[must_use]
    pub fn with_first(mut self, first: Expr) -> Self {
        self.first = Some(first);
        self
    }

    #[must_use]
    pub fn with_length(mut self, length: Expr) -> Self {
        self.length = Some(length);
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// A message component: a named, typed field and its `then` clauses.
#[derive(Debug, Clone)]
pub struct Component {
    pub name: Identifier,
    pub type_name: Identifier,
    pub thens: Vec<Then>,
}

impl Component {
    pub fn new(name: Identifier, type_name: Identifier) -> Self {
        Self {
            name,
            type_name,
            thens: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_thens(mut self, thens: Vec<Then>) -> Self {
        self.thens = thens;
        self
    }
}

/// Lowers a parsed component list into a message graph.
///
/// Components appear in declaration order; the first one is the message
/// root. A component without `then` clauses falls through to the next
/// component in the list, the last one to the end of the message. A `Then`
/// without a target also denotes the end of the message.
///
/// # Errors
///
/// A non-empty bag when a component's type is not declared, a `then`
/// clause targets an unknown field, or a field name is declared twice.
pub fn lower_components(
    components: &[Component],
    types: &BTreeMap<Identifier, Type>,
) -> Result<MessageGraph, Diagnostics> {
    let mut error = Diagnostics::new();
    let mut graph = MessageGraph::new();
    let mut index_of: BTreeMap<Identifier, NodeIndex> = BTreeMap::new();

    for component in components {
        if index_of.contains_key(&component.name) {
            error.append(
                format!("duplicate field \"{}\"", component.name),
                Subsystem::Model,
                Severity::Error,
                component.name.location.clone(),
            );
            continue;
        }
        match types.get(&component.type_name) {
            Some(ty) => {
                let index = graph.add_node(component.name.clone(), ty.clone());
                index_of.insert(component.name.clone(), index);
            }
            None => error.append(
                format!(
                    "undeclared type \"{}\" for field \"{}\"",
                    component.type_name, component.name
                ),
                Subsystem::Model,
                Severity::Error,
                component.name.location.clone(),
            ),
        }
    }

    for (position, component) in components.iter().enumerate() {
        let Some(source) = index_of.get(&component.name).copied() else {
            continue;
        };
        if component.thens.is_empty() {
            let target = components
                .get(position + 1)
                .and_then(|next| index_of.get(&next.name))
                .copied()
                .unwrap_or(MessageGraph::FINAL);
            graph.add_edge(source, Edge::to(target));
            continue;
        }
        for then in &component.thens {
            let target = match &then.name {
                None => MessageGraph::FINAL,
                Some(name) => match index_of.get(name) {
                    Some(index) => *index,
                    None => {
                        error.append(
                            format!(
                                "undefined field \"{name}\" in then clause of \"{}\"",
                                component.name
                            ),
                            Subsystem::Model,
                            Severity::Error,
                            then.location.clone(),
                        );
                        continue;
                    }
                },
            };
            let mut edge = Edge::to(target).with_condition(then.condition.clone());
            if let Some(first) = &then.first {
                edge = edge.with_first(first.clone());
            }
            if let Some(length) = &then.length {
                edge = edge.with_length(length.clone());
            }
            if let Some(location) = &then.location {
                edge = edge.with_location(location.clone());
            }
            graph.add_edge(source, edge);
        }
    }

    error.propagate()?;
    Ok(graph)
}

/// The `with` clause of a specification.
#[derive(Debug, Clone, Default)]
pub struct ContextClause {
    pub items: Vec<Identifier>,
}

/// A package: the unit of validation.
#[derive(Debug, Clone)]
pub struct Package {
    pub identifier: Identifier,
    pub types: Vec<Type>,
    pub sessions: Vec<Session>,
    pub end_identifier: Identifier,
}

impl Package {
    pub fn new(identifier: Identifier) -> Self {
        let end_identifier = identifier.clone();
        Self {
            identifier,
            types: Vec::new(),
            sessions: Vec::new(),
            end_identifier,
        }
    }

    #[must_use]
    pub fn with_types(mut self, types: Vec<Type>) -> Self {
        self.types = types;
        self
    }

    #[must_use]
    pub fn with_sessions(mut self, sessions: Vec<Session>) -> Self {
        self.sessions = sessions;
        self
    }

    #[must_use]
    pub fn with_end_identifier(mut self, end_identifier: Identifier) -> Self {
        self.end_identifier = end_identifier;
        self
    }
}

/// A parsed specification: context clause plus package.
#[derive(Debug, Clone)]
pub struct Specification {
    pub context: ContextClause,
    pub package: Package,
}

impl Specification {
    pub fn new(package: Package) -> Self {
        Self {
            context: ContextClause::default(),
            package,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: ContextClause) -> Self {
        self.context = context;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::evaluate;
    use wirespec_algebra::AttrKind;

    fn id(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    fn byte_types() -> BTreeMap<Identifier, Type> {
        let mut types = BTreeMap::new();
        types.insert(id("U8"), Type::modular(id("U8"), 256).unwrap());
        types.insert(id("Bytes"), Type::array(id("Bytes"), id("U8")));
        types
    }

    #[test]
    fn components_without_thens_fall_through_in_order() {
        let components = vec![
            Component::new(id("Tag"), id("U8")),
            Component::new(id("Value"), id("U8")),
        ];
        let graph = lower_components(&components, &byte_types()).unwrap();
        assert_eq!(graph.len(), 2);

        let root = Edge::to(graph.initial().unwrap()).with_first(Expr::number(0));
        let (fields, _) = evaluate(&graph, &root).unwrap();
        assert_eq!(fields.len(), 2);
        let value = fields.iter().find(|f| f.name == id("Value")).unwrap();
        let (_, facts) = &value.variants[0];
        assert_eq!(
            facts.get(&Expr::attribute(AttrKind::First, Expr::variable(id("Value")))),
            Some(&Expr::number(8))
        );
    }

    #[test]
    fn then_clauses_carry_condition_and_length() {
        let has_payload = Expr::greater(Expr::variable(id("Length")), Expr::number(0));
        let no_payload = Expr::equal(Expr::variable(id("Length")), Expr::number(0));
        let components = vec![
            Component::new(id("Length"), id("U8")).with_thens(vec![
                Then::new(Some(id("Payload")))
                    .with_condition(has_payload.clone())
                    .with_length(Expr::mul(vec![
                        Expr::variable(id("Length")),
                        Expr::number(8),
                    ])),
                Then::new(None).with_condition(no_payload),
            ]),
            Component::new(id("Payload"), id("Bytes"))
                .with_thens(vec![Then::new(None)]),
        ];
        let graph = lower_components(&components, &byte_types()).unwrap();

        let root = Edge::to(graph.initial().unwrap()).with_first(Expr::number(0));
        let (fields, _) = evaluate(&graph, &root).unwrap();
        let payload = fields.iter().find(|f| f.name == id("Payload")).unwrap();
        let (condition, _) = &payload.variants[0];
        assert_eq!(condition, &has_payload);
    }

    #[test]
    fn last_component_falls_through_to_the_end() {
        let components = vec![Component::new(id("Only"), id("U8"))];
        let graph = lower_components(&components, &byte_types()).unwrap();
        let initial = graph.initial().unwrap();
        assert_eq!(graph.node(initial).edges[0].target, MessageGraph::FINAL);
    }

    #[test]
    fn undeclared_component_type_is_an_error() {
        let components = vec![Component::new(id("Tag"), id("Missing"))];
        let error = lower_components(&components, &byte_types()).unwrap_err();
        assert!(error.entries()[0]
            .message
            .contains("undeclared type \"Missing\" for field \"Tag\""));
    }

    #[test]
    fn undefined_then_target_is_an_error() {
        let components = vec![Component::new(id("Tag"), id("U8"))
            .with_thens(vec![Then::new(Some(id("Nowhere")))])];
        let error = lower_components(&components, &byte_types()).unwrap_err();
        assert!(error.entries()[0]
            .message
            .contains("undefined field \"Nowhere\" in then clause of \"Tag\""));
    }

    #[test]
    fn duplicate_component_name_is_an_error() {
        let components = vec![
            Component::new(id("Tag"), id("U8")),
            Component::new(id("TAG"), id("U8")),
        ];
        let error = lower_components(&components, &byte_types()).unwrap_err();
        assert!(error.entries()[0].message.contains("duplicate field"));
    }

    #[test]
    fn lowering_accumulates_all_defects() {
        let components = vec![
            Component::new(id("Tag"), id("Missing")),
            Component::new(id("Value"), id("U8"))
                .with_thens(vec![Then::new(Some(id("Nowhere")))]),
        ];
        let error = lower_components(&components, &byte_types()).unwrap_err();
        assert_eq!(error.len(), 2);
    }
}
