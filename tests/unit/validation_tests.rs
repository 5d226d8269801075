/*!
 * Formula validation tests on environment-heavy content and the marking
 * format.
 */

use scitrans::app_config::FormulaCompareMode;
use scitrans::document::{extract_formulas, ValidationStatus};
use scitrans::validation::{mark_paragraph, FormulaValidator};

use crate::common::parse;

fn validate(source: &str, translated: &str, mode: FormulaCompareMode) -> ValidationStatus {
    let document = parse(&format!("\\section{{S}}\n{source}\n"));
    let validator = FormulaValidator::new(mode);
    let results = validator.validate_section(&document.sections[0], &[translated.to_string()]);
    results[0].status
}

#[test]
fn test_environment_formula_must_survive_translation() {
    let source = "As shown:\n\\begin{equation}\n\\nabla \\cdot E = \\rho\n\\end{equation}";
    let good = "Как показано:\n\\begin{equation}\n\\nabla \\cdot E = \\rho\n\\end{equation}";
    let bad = "Как показано:\n\\begin{equation}\n\\nabla \\cdot E = 0\n\\end{equation}";

    assert_eq!(
        validate(source, good, FormulaCompareMode::Lenient),
        ValidationStatus::Ok
    );
    assert_eq!(
        validate(source, bad, FormulaCompareMode::Lenient),
        ValidationStatus::Mismatch
    );
}

#[test]
fn test_lenient_mode_tolerates_reflowed_environments() {
    let source = "\\begin{align}\na &= b \\\\\nc &= d\n\\end{align}";
    let reflowed = "\\begin{align}\na &= b \\\\ c &= d\n\\end{align}";
    assert_eq!(
        validate(source, reflowed, FormulaCompareMode::Lenient),
        ValidationStatus::Ok
    );
    assert_eq!(
        validate(source, reflowed, FormulaCompareMode::Strict),
        ValidationStatus::Mismatch
    );
}

#[test]
fn test_moving_a_display_formula_between_paragraphs_is_caught() {
    let document = parse("\\section{S}\nFirst $$a$$ here.\n\nSecond plain.\n");
    let validator = FormulaValidator::default();
    let translated = vec!["First here.".to_string(), "Second $$a$$ plain.".to_string()];

    let results = validator.validate_section(&document.sections[0], &translated);
    assert_eq!(results[0].status, ValidationStatus::Mismatch);
    assert_eq!(results[1].status, ValidationStatus::Mismatch);
}

#[test]
fn test_diff_names_the_missing_formula() {
    let document = parse("\\section{S}\nBoth $x_n$ and $y_n$ converge.\n");
    let validator = FormulaValidator::default();
    let results = validator.validate_section(
        &document.sections[0],
        &["Only $x_n$ converges.".to_string()],
    );

    let diff = results[0].diff.as_ref().unwrap();
    assert_eq!(diff.missing_inline, vec!["y_n".to_string()]);
    assert!(diff.extra_inline.is_empty());
}

#[test]
fn test_marked_paragraph_is_still_extractable() {
    // Marking must not corrupt the remaining formulas
    let document = parse("\\section{S}\nKeep $x$ and $y$.\n");
    let validator = FormulaValidator::default();
    let results =
        validator.validate_section(&document.sections[0], &["Kept only $x$.".to_string()]);
    let diff = results[0].diff.as_ref().unwrap();

    let marked = mark_paragraph("Kept only $x$.", diff, "red");
    let spans = extract_formulas(&marked).unwrap();
    assert!(spans.iter().any(|s| s.notation == "x"));
    assert!(marked.contains("\\footnote{Missing inline formulas: \\$y\\$}"));
}
