//! E2E: message graph evaluation.
//!
//! Whole-message scenarios: field facts over multi-byte layouts, variant
//! accumulation across branches, cycle rejection, and termination on
//! acyclic graphs.

mod common;

use common::{byte, id, var};
use wirespec_algebra::{AttrKind, Expr};
use wirespec_model::graph::{Edge, MessageGraph};
use wirespec_model::model::check;
use wirespec_model::types::Type;
use wirespec_model::{evaluate, Package, Specification};

fn word() -> Type {
    Type::modular(id("U16"), 65536).unwrap()
}

#[test]
fn s5_cyclic_message_graph() {
    let mut graph = MessageGraph::new();
    let a = graph.add_node(id("A"), byte());
    let b = graph.add_node(id("B"), byte());
    graph.add_edge(a, Edge::to(b));
    graph.add_edge(b, Edge::to(a));

    let root = Edge::to(a).with_first(Expr::number(0));
    let error = evaluate(&graph, &root).unwrap_err();
    assert!(error.entries().iter().any(|e| e.message.contains("cyclic")));
}

#[test]
fn ethernet_style_header_offsets() {
    // Destination (16 bit), Source (16 bit), Length (8 bit), all fixed.
    let mut graph = MessageGraph::new();
    let destination = graph.add_node(id("Destination"), word());
    let source = graph.add_node(id("Source"), word());
    let length = graph.add_node(id("Length"), byte());
    graph.add_edge(destination, Edge::to(source));
    graph.add_edge(source, Edge::to(length));
    graph.add_edge(length, Edge::to(MessageGraph::FINAL));

    let root = Edge::to(destination).with_first(Expr::number(0));
    let (fields, _) = evaluate(&graph, &root).unwrap();
    assert_eq!(fields.len(), 3);

    let first = |name: &str| {
        fields
            .iter()
            .find(|f| f.name == id(name))
            .unwrap()
            .variants[0]
            .1
            .get(&Expr::attribute(AttrKind::First, var(name)))
            .cloned()
            .unwrap()
    };
    assert_eq!(first("Destination"), Expr::number(0));
    assert_eq!(first("Source"), Expr::number(16));
    assert_eq!(first("Length"), Expr::number(32));
}

#[test]
fn length_dependent_payload_facts_stay_symbolic() {
    // Length (8 bit), then Payload of Length * 8 bits.
    let mut graph = MessageGraph::new();
    let length = graph.add_node(id("Length"), byte());
    let payload = graph.add_node(id("Payload"), Type::array(id("Bytes"), id("U8")));
    graph.add_edge(
        length,
        Edge::to(payload)
            .with_length(Expr::mul(vec![var("Length"), Expr::number(8)])),
    );
    graph.add_edge(payload, Edge::to(MessageGraph::FINAL));

    let root = Edge::to(length).with_first(Expr::number(0));
    let (fields, _) = evaluate(&graph, &root).unwrap();
    let payload_field = fields.iter().find(|f| f.name == id("Payload")).unwrap();
    let (_, facts) = &payload_field.variants[0];
    assert_eq!(
        facts
            .get(&Expr::attribute(AttrKind::First, var("Payload")))
            .unwrap(),
        &Expr::number(8)
    );
    assert_eq!(
        facts
            .get(&Expr::attribute(AttrKind::Last, var("Payload")))
            .unwrap()
            .to_string(),
        "Length * 8 + 7"
    );
}

#[test]
fn acyclic_branching_terminates_with_one_variant_per_path() {
    // A diamond with an extra hop on one side: 2 paths to the tail.
    let mut graph = MessageGraph::new();
    let tag = graph.add_node(id("Tag"), byte());
    let short = graph.add_node(id("Short"), byte());
    let long_hi = graph.add_node(id("LongHigh"), byte());
    let long_lo = graph.add_node(id("LongLow"), byte());
    let tail = graph.add_node(id("Tail"), byte());

    let is_short = Expr::less(var("Tag"), Expr::number(128));
    let is_long = Expr::greater_equal(var("Tag"), Expr::number(128));
    graph.add_edge(tag, Edge::to(short).with_condition(is_short));
    graph.add_edge(tag, Edge::to(long_hi).with_condition(is_long));
    graph.add_edge(long_hi, Edge::to(long_lo));
    graph.add_edge(short, Edge::to(tail));
    graph.add_edge(long_lo, Edge::to(tail));
    graph.add_edge(tail, Edge::to(MessageGraph::FINAL));

    let root = Edge::to(tag).with_first(Expr::number(0));
    let (fields, _) = evaluate(&graph, &root).unwrap();

    let tail_field = fields.iter().find(|f| f.name == id("Tail")).unwrap();
    assert_eq!(tail_field.variants.len(), 2);

    // The two variants place the tail at different offsets.
    let firsts: Vec<String> = tail_field
        .variants
        .iter()
        .map(|(_, facts)| {
            facts
                .get(&Expr::attribute(AttrKind::First, var("Tail")))
                .unwrap()
                .to_string()
        })
        .collect();
    assert!(firsts.contains(&"16".to_string()));
    assert!(firsts.contains(&"24".to_string()));
}

#[test]
fn variant_conditions_are_simplified_path_conditions() {
    let mut graph = MessageGraph::new();
    let tag = graph.add_node(id("Tag"), byte());
    let value = graph.add_node(id("Value"), byte());
    let guard = Expr::equal(var("Tag"), Expr::number(1));
    graph.add_edge(tag, Edge::to(value).with_condition(guard.clone()));
    graph.add_edge(value, Edge::to(MessageGraph::FINAL));

    let root = Edge::to(tag).with_first(Expr::number(0));
    let (fields, warnings) = evaluate(&graph, &root).unwrap();
    let value_field = fields.iter().find(|f| f.name == id("Value")).unwrap();
    let (condition, _) = &value_field.variants[0];
    assert_eq!(condition, &guard);

    // A single guarded edge does not cover Tag /= 1.
    assert!(warnings
        .entries()
        .iter()
        .any(|e| e.message.contains("incomplete edge conditions")));
}

#[test]
fn parser_components_lower_into_an_evaluable_graph() {
    // The shape an external parser hands over: ordered components with
    // then clauses, lowered and evaluated like a hand-built graph.
    use std::collections::BTreeMap;
    use wirespec_model::{lower_components, Component, Then};

    let mut types = BTreeMap::new();
    types.insert(id("U8"), byte());
    types.insert(id("U16"), word());

    let components = vec![
        Component::new(id("Kind"), id("U8")),
        Component::new(id("Checksum"), id("U16"))
            .with_thens(vec![Then::new(None)]),
    ];
    let graph = lower_components(&components, &types).unwrap();

    let root = Edge::to(graph.initial().unwrap()).with_first(Expr::number(0));
    let (fields, _) = evaluate(&graph, &root).unwrap();
    assert_eq!(fields.len(), 2);
    let checksum = fields.iter().find(|f| f.name == id("Checksum")).unwrap();
    let (_, facts) = &checksum.variants[0];
    assert_eq!(
        facts.get(&Expr::attribute(AttrKind::First, var("Checksum"))),
        Some(&Expr::number(8))
    );
    assert_eq!(
        facts.get(&Expr::attribute(AttrKind::Last, var("Checksum"))),
        Some(&Expr::number(23))
    );
}

#[test]
fn whole_package_check_collects_fields_and_warnings() {
    let mut graph = MessageGraph::new();
    let tag = graph.add_node(id("Tag"), byte());
    let value = graph.add_node(id("Value"), byte());
    graph.add_edge(tag, Edge::to(value));
    graph.add_edge(value, Edge::to(MessageGraph::FINAL));

    let package = Package::new(id("Protocol"))
        .with_types(vec![Type::message(id("Frame"), graph)]);
    let model = check(&Specification::new(package)).unwrap();
    assert_eq!(model.fields.len(), 1);
    let (message, fields) = &model.fields[0];
    assert_eq!(*message, id("Frame"));
    assert_eq!(fields.len(), 2);

    let summaries = model.summaries();
    let rendered = serde_json::to_string(&summaries).unwrap();
    assert!(rendered.contains("\"message\":\"Frame\""));
    assert!(rendered.contains("Tag'First"));
}
