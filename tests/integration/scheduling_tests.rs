/*!
 * Orchestrator scheduling tests: ordering preconditions, cancellation, and
 * retry budgets over parsed documents.
 */

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use scitrans::app_config::Config;
use scitrans::dependency::{assign_dependencies, translation_order};
use scitrans::document::DependencyEdge;
use scitrans::errors::TranslationError;
use scitrans::providers::mock::{ScriptedBackend, ScriptedResponse};
use scitrans::translation::{Orchestrator, TranslationEngine, TranslationState};
use scitrans::validation::FormulaValidator;

use crate::common::{parse, test_config};

fn orchestrator(backend: ScriptedBackend, config: &Config) -> Orchestrator {
    let engine = TranslationEngine::new(Arc::new(backend), config);
    Orchestrator::new(engine, FormulaValidator::default(), config)
}

fn chain_document() -> scitrans::document::Document {
    let mut document = parse(
        "\\section{Base}\nDefinitions $D$.\n\n\\section{Middle}\nLemmas $L$.\n\n\\section{Top}\nTheorem $T$.\n",
    );
    let edges = vec![
        DependencyEdge {
            from: "sec_1".to_string(),
            to: "sec_0".to_string(),
        },
        DependencyEdge {
            from: "sec_2".to_string(),
            to: "sec_1".to_string(),
        },
    ];
    assign_dependencies(&mut document, &edges);
    document
}

#[tokio::test]
async fn test_chain_translates_in_dependency_order() {
    let config = test_config();
    let document = chain_document();
    let edges = vec![
        DependencyEdge {
            from: "sec_1".to_string(),
            to: "sec_0".to_string(),
        },
        DependencyEdge {
            from: "sec_2".to_string(),
            to: "sec_1".to_string(),
        },
    ];
    let order = translation_order(&document, &edges);
    assert_eq!(order, vec!["sec_0", "sec_1", "sec_2"]);

    let backend = ScriptedBackend::echoing();
    let state = orchestrator(backend.clone(), &config)
        .run(&document, &order, &BTreeMap::new())
        .await
        .unwrap();

    assert!(state.failed_sections().is_empty());
    let requests = backend.recorded_requests();
    assert!(requests[0].user.contains("Definitions $D$."));
    assert!(requests[1].user.contains("Lemmas $L$."));
    assert!(requests[2].user.contains("Theorem $T$."));
    // Each link of the chain sees its predecessor's translation
    assert!(requests[1].user.contains("[sec_0]:"));
    assert!(requests[2].user.contains("[sec_1]:"));
}

#[tokio::test]
async fn test_section_cannot_start_before_its_dependency() {
    let config = test_config();
    let document = chain_document();
    let orchestrator = orchestrator(ScriptedBackend::echoing(), &config);

    let mut state = TranslationState::default();
    let err = orchestrator
        .translate_one(&document, "sec_2", &BTreeMap::new(), &mut state)
        .await
        .unwrap_err();

    assert!(matches!(err, TranslationError::DependencyPending { .. }));
    assert_eq!(state.attempts_for("sec_2"), 0);
}

#[tokio::test]
async fn test_completed_work_survives_cancellation() {
    let config = test_config();
    let document = chain_document();
    let order = vec!["sec_0".to_string(), "sec_1".to_string(), "sec_2".to_string()];

    let orchestrator = orchestrator(ScriptedBackend::echoing(), &config);
    let mut state = TranslationState::default();
    orchestrator
        .translate_one(&document, "sec_0", &BTreeMap::new(), &mut state)
        .await
        .unwrap();
    assert!(state.is_translated("sec_0"));

    // A cancelled full run still carries every section through
    orchestrator.cancellation_flag().store(true, Ordering::SeqCst);
    let state = orchestrator
        .run(&document, &order, &BTreeMap::new())
        .await
        .unwrap();
    assert_eq!(state.failed_sections().len(), 3);
    assert_eq!(state.result("sec_0").unwrap().text, "Definitions $D$.");
}

#[tokio::test]
async fn test_attempt_log_caps_at_budget() {
    let mut config = test_config();
    config.translation.max_retries = 1;
    let document = parse("\\section{S}\nKeep $q$ here.\n");

    // Both attempts lose the formula, then the paragraph is marked
    let backend = ScriptedBackend::new(vec![
        ScriptedResponse::Text("First loss.".to_string()),
        ScriptedResponse::Text("Second loss.".to_string()),
    ]);
    let state = orchestrator(backend.clone(), &config)
        .run(&document, &["sec_0".to_string()], &BTreeMap::new())
        .await
        .unwrap();

    assert_eq!(backend.calls(), 2);
    assert_eq!(state.attempts_for("sec_0"), 2);
    assert_eq!(state.marked_paragraphs().len(), 1);
}
