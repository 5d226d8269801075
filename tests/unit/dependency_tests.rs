/*!
 * Dependency ordering tests on larger graph shapes.
 */

use std::sync::Arc;

use scitrans::dependency::{
    assign_dependencies, break_cycles, translation_order, DependencyAnalyzer,
};
use scitrans::document::DependencyEdge;
use scitrans::providers::mock::{ScriptedBackend, ScriptedResponse};

use crate::common::parse;

fn edge(from: &str, to: &str) -> DependencyEdge {
    DependencyEdge {
        from: from.to_string(),
        to: to.to_string(),
    }
}

fn document_with(sections: usize) -> scitrans::document::Document {
    let mut content = String::new();
    for i in 0..sections {
        content.push_str(&format!("\\section{{S{i}}}\nBody {i}.\n\n"));
    }
    parse(&content)
}

#[test]
fn test_diamond_graph_orders_correctly() {
    // sec_3 reads sec_1 and sec_2, which both read sec_0
    let document = document_with(4);
    let edges = vec![
        edge("sec_3", "sec_1"),
        edge("sec_3", "sec_2"),
        edge("sec_1", "sec_0"),
        edge("sec_2", "sec_0"),
    ];
    let order = translation_order(&document, &edges);
    assert_eq!(order, vec!["sec_0", "sec_1", "sec_2", "sec_3"]);
}

#[test]
fn test_order_is_deterministic_across_runs() {
    let document = document_with(6);
    let edges = vec![edge("sec_0", "sec_5"), edge("sec_2", "sec_4")];
    let first = translation_order(&document, &edges);
    for _ in 0..10 {
        assert_eq!(translation_order(&document, &edges), first);
    }
}

#[test]
fn test_every_section_appears_exactly_once() {
    let document = document_with(5);
    let edges = vec![edge("sec_4", "sec_0"), edge("sec_3", "sec_4")];
    let order = translation_order(&document, &edges);
    let mut sorted = order.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 5);
}

#[test]
fn test_overlapping_cycles_still_produce_a_dag() {
    let document = document_with(4);
    let edges = vec![
        edge("sec_0", "sec_1"),
        edge("sec_1", "sec_2"),
        edge("sec_2", "sec_1"), // closes 1<->2
        edge("sec_2", "sec_3"),
        edge("sec_3", "sec_0"), // closes 0->1->2->3->0
    ];
    let kept = break_cycles(edges, &document);
    // Exactly the two cycle-closing edges are gone
    assert_eq!(kept.len(), 3);
    // And the order is total
    let order = translation_order(&document, &kept);
    assert_eq!(order.len(), 4);
}

#[test]
fn test_assign_dependencies_fills_sections() {
    let mut document = document_with(3);
    let edges = vec![edge("sec_2", "sec_0"), edge("sec_2", "sec_1")];
    assign_dependencies(&mut document, &edges);
    assert!(document.sections[0].dependencies.is_empty());
    assert_eq!(document.sections[2].dependencies.len(), 2);
    assert!(document.sections[2].dependencies.contains("sec_0"));
}

#[tokio::test]
async fn test_single_section_document_skips_the_backend() {
    let document = document_with(1);
    let backend = ScriptedBackend::failing();
    let analyzer = DependencyAnalyzer::new(Arc::new(backend.clone()), 2);
    let edges = analyzer.analyze(&document).await;
    assert!(edges.is_empty());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_backend_errors_degrade_to_document_order() {
    let document = document_with(3);
    let backend = ScriptedBackend::failing();
    let analyzer = DependencyAnalyzer::new(Arc::new(backend.clone()), 1);
    let edges = analyzer.analyze(&document).await;
    assert!(edges.is_empty());
    assert_eq!(backend.calls(), 2); // retries + 1

    let order = translation_order(&document, &edges);
    assert_eq!(order, vec!["sec_0", "sec_1", "sec_2"]);
}

#[tokio::test]
async fn test_edges_to_unknown_sections_are_filtered() {
    let document = document_with(2);
    let response = r#"{"dependencies": {"sec_1": ["sec_0", "sec_99"]}}"#;
    let backend = ScriptedBackend::new(vec![ScriptedResponse::Text(response.to_string())]);
    let analyzer = DependencyAnalyzer::new(Arc::new(backend), 0);
    let edges = analyzer.analyze(&document).await;
    assert_eq!(edges, vec![edge("sec_1", "sec_0")]);
}
