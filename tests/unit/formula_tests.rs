/*!
 * Formula extraction tests over realistic LaTeX constructs.
 */

use scitrans::document::{extract_formulas, FormulaKind};

fn kinds(text: &str) -> Vec<(FormulaKind, String)> {
    extract_formulas(text)
        .unwrap()
        .into_iter()
        .map(|s| (s.kind, s.notation))
        .collect()
}

#[test]
fn test_display_environments_are_recognized() {
    let spans = kinds(
        "Consider\n\\begin{equation}\nE = mc^2\n\\end{equation}\nand\n\\begin{align}\na &= b \\\\\nc &= d\n\\end{align}\ndone.",
    );
    assert_eq!(spans.len(), 2);
    assert!(spans.iter().all(|(k, _)| *k == FormulaKind::Display));
    assert!(spans[0].1.contains("E = mc^2"));
    assert!(spans[1].1.contains("a &= b"));
}

#[test]
fn test_starred_environment_matches() {
    let spans = kinds("\\begin{equation*}\nx > 0\n\\end{equation*}");
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].0, FormulaKind::Display);
}

#[test]
fn test_bracket_display_and_inline_coexist() {
    let spans = kinds("Inline $f(x)$ then \\[ g(y) = 0 \\] closes it.");
    assert_eq!(spans.len(), 2);
    let inline: Vec<_> = spans.iter().filter(|(k, _)| *k == FormulaKind::Inline).collect();
    assert_eq!(inline.len(), 1);
    assert_eq!(inline[0].1, "f(x)");
}

#[test]
fn test_dollars_inside_display_are_not_inline_spans() {
    // The $$..$$ region is masked before inline extraction
    let spans = kinds("$$a + b$$ and $c$");
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].0, FormulaKind::Display);
    assert_eq!(spans[1].0, FormulaKind::Inline);
    assert_eq!(spans[1].1, "c");
}

#[test]
fn test_escaped_dollar_is_plain_text() {
    let spans = kinds("The price is \\$5 and the variable is $x$.");
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].1, "x");
}

#[test]
fn test_spans_are_ordered_by_source_position() {
    let spans = extract_formulas("$a$ then $$b$$ then $c$").unwrap();
    let positions: Vec<usize> = spans.iter().map(|s| s.position).collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted);
}

#[test]
fn test_extraction_is_pure() {
    let text = "Mix $x_i$ with $$\\sum_i x_i$$ twice.";
    let first = extract_formulas(text).unwrap();
    let second = extract_formulas(text).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unterminated_environment_is_an_error() {
    let result = extract_formulas("\\begin{equation}\nnever closed");
    assert!(result.is_err());
}
