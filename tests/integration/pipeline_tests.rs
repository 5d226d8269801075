/*!
 * End-to-end pipeline scenarios over the full controller with scripted
 * collaborators.
 */

use scitrans::document::{RunStatus, SectionStatus};
use scitrans::providers::mock::ScriptedResponse;

use crate::common::{
    controller_with, create_temp_dir, create_test_file, empty_terms_response, init_test_logging,
    scripted, test_config,
};

/// Clean run: a single-section paper whose translation echoes every formula
/// back. No markings, no failures, exit code 0.
#[tokio::test]
async fn test_clean_run_succeeds_with_exact_formulas() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let base = dir.path().to_path_buf();
    let source = create_test_file(
        &base,
        "paper.tex",
        "\\documentclass{article}\n\\begin{document}\n\\section{Relativity}\nMass-energy: $E=mc^2$ everywhere.\n\\end{document}\n",
    )
    .unwrap();
    let output = base.join("paper.en.tex");

    // One terminology call, then the translation echoes the section
    let backend = scripted(vec![empty_terms_response(), ScriptedResponse::Echo]);
    let outcome = controller_with(test_config(), backend.clone())
        .run(&source, &output, None)
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.status.exit_code(), 0);
    assert_eq!(outcome.marked_count(), 0);
    assert!(outcome.failed_sections.is_empty());
    assert_eq!(backend.calls(), 2);

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("\\documentclass{article}"));
    assert!(written.contains("\\section{Relativity}"));
    assert!(written.contains("$E=mc^2$"));
    assert!(written.contains("\\end{document}"));
}

/// Persistent mismatch: every attempt drops the display formula. After
/// max_retries + 1 attempts the paragraph is marked, the run completes
/// with exit code 1, and the marking carries the diff.
#[tokio::test]
async fn test_persistent_formula_loss_completes_with_markings() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let base = dir.path().to_path_buf();
    let source = create_test_file(
        &base,
        "paper.tex",
        "\\section{Integrals}\nThe key identity:\n$$\\int_0^1 x\\,dx = \\tfrac{1}{2}$$\nholds.\n",
    )
    .unwrap();
    let output = base.join("out.tex");

    let mut config = test_config();
    config.translation.max_retries = 2;

    let backend = scripted(vec![
        empty_terms_response(),
        ScriptedResponse::Text("Identity dropped, first try.".to_string()),
        ScriptedResponse::Text("Identity dropped, second try.".to_string()),
        ScriptedResponse::Text("Identity dropped, third try.".to_string()),
    ]);
    let outcome = controller_with(config, backend.clone())
        .run(&source, &output, None)
        .await
        .unwrap();

    // Exactly max_retries + 1 translation attempts after the terminology call
    assert_eq!(backend.calls(), 4);
    assert_eq!(outcome.status, RunStatus::CompletedWithMarkings);
    assert_eq!(outcome.status.exit_code(), 1);
    assert_eq!(outcome.marked_count(), 1);
    assert_eq!(outcome.sections[0].1, SectionStatus::Marked(1));

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("\\color{red}"));
    assert!(written.contains("\\footnote{"));
}

/// Dependency-aware run: the backend declares sec_1 dependent on sec_0 and
/// proposes one term; the second translation request must carry both the
/// dictionary and the dependency context.
#[tokio::test]
async fn test_dictionary_and_context_reach_dependent_sections() {
    let dir = create_temp_dir().unwrap();
    let base = dir.path().to_path_buf();
    let source = create_test_file(
        &base,
        "paper.tex",
        "\\section{Definitions}\nA manifold $M$ is defined.\n\n\\section{Results}\nThe manifold $M$ is compact.\n",
    )
    .unwrap();
    let output = base.join("out.tex");

    let backend = scripted(vec![
        ScriptedResponse::Text(
            r#"{"dependencies": {"sec_1": ["sec_0"], "sec_0": []}}"#.to_string(),
        ),
        ScriptedResponse::Text(
            r#"{"terms": [{"source": "многообразие", "target": "manifold", "context": "geometry"}]}"#
                .to_string(),
        ),
        ScriptedResponse::Echo,
        ScriptedResponse::Echo,
    ]);

    let outcome = controller_with(test_config(), backend.clone())
        .run(&source, &output, None)
        .await
        .unwrap();
    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.dictionary.len(), 1);

    let requests = backend.recorded_requests();
    assert_eq!(requests.len(), 4);
    // Third and fourth requests are the translations, in dependency order
    assert!(requests[2].user.contains("A manifold $M$ is defined."));
    assert!(requests[3].user.contains("The manifold $M$ is compact."));
    assert!(requests[3].user.contains("- многообразие → manifold"));
    assert!(requests[3].user.contains("[sec_0]:"));
}

/// A failed section falls back to its source text while the rest of the
/// document still translates; the run completes with exit code 1.
#[tokio::test]
async fn test_failed_section_keeps_source_text_in_output() {
    let dir = create_temp_dir().unwrap();
    let base = dir.path().to_path_buf();
    let source = create_test_file(
        &base,
        "paper.tex",
        "\\section{Broken}\nUntranslatable text.\n\n\\section{Fine}\nWorking text.\n",
    )
    .unwrap();
    let output = base.join("out.tex");

    let mut config = test_config();
    config.translation.max_retries = 0;

    let backend = scripted(vec![
        ScriptedResponse::Text(r#"{"dependencies": {}}"#.to_string()),
        empty_terms_response(),
        ScriptedResponse::Fail("provider exploded".to_string()),
        ScriptedResponse::Echo,
    ]);
    let outcome = controller_with(config, backend)
        .run(&source, &output, None)
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::CompletedWithMarkings);
    assert_eq!(outcome.failed_sections, vec!["sec_0".to_string()]);
    assert_eq!(outcome.sections[1].1, SectionStatus::Translated);

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("Untranslatable text."));
    assert!(written.contains("Working text."));
}

/// The outcome JSON lands next to the output and captures the run metadata.
#[tokio::test]
async fn test_outcome_json_records_run_metadata() {
    let dir = create_temp_dir().unwrap();
    let base = dir.path().to_path_buf();
    let source = create_test_file(&base, "paper.tex", "Plain paragraph with $x$.\n").unwrap();
    let output = base.join("out.tex");

    let backend = scripted(vec![empty_terms_response(), ScriptedResponse::Echo]);
    let outcome = controller_with(test_config(), backend)
        .run(&source, &output, None)
        .await
        .unwrap();

    let rendered = std::fs::read_to_string(base.join("out.outcome.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(parsed["status"], "success");
    assert_eq!(parsed["run_id"], outcome.run_id.as_str());
    assert_eq!(parsed["source_hash"].as_str().unwrap().len(), 64);
    assert!(parsed["elapsed_secs"].as_f64().unwrap() >= 0.0);
}
