/*!
 * Structural parser tests: include flattening, envelope handling, and
 * section splitting on realistic document shapes.
 */

use scitrans::document::StructuralParser;
use scitrans::errors::StructuralError;

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_includes_resolve_from_subdirectories() {
    let dir = create_temp_dir().unwrap();
    std::fs::create_dir(dir.path().join("chapters")).unwrap();
    create_test_file(
        &dir.path().join("chapters"),
        "one.tex",
        "\\section{One}\nChapter text.",
    )
    .unwrap();
    let main = create_test_file(
        &dir.path().to_path_buf(),
        "main.tex",
        "\\begin{document}\n\\input{chapters/one}\n\\end{document}",
    )
    .unwrap();

    let document = StructuralParser::default().parse_document(&main).unwrap();
    assert_eq!(document.sections.len(), 1);
    assert_eq!(document.sections[0].title, "One");
}

#[test]
fn test_section_ids_follow_document_order() {
    let dir = create_temp_dir().unwrap();
    let main = create_test_file(
        &dir.path().to_path_buf(),
        "main.tex",
        "\\section{A}\nx\n\n\\subsection{A.1}\ny\n\n\\section{B}\nz\n",
    )
    .unwrap();

    let document = StructuralParser::default().parse_document(&main).unwrap();
    let ids: Vec<&str> = document.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["sec_0", "sec_1", "sec_2"]);
    assert_eq!(document.sections[1].level, 2);
}

#[test]
fn test_paragraphs_carry_their_formula_spans() {
    let dir = create_temp_dir().unwrap();
    let main = create_test_file(
        &dir.path().to_path_buf(),
        "main.tex",
        "\\section{Math}\nInline $a+b$ and display:\n$$\\int_0^1 f(x)\\,dx$$\n\nSecond paragraph, no math.\n",
    )
    .unwrap();

    let document = StructuralParser::default().parse_document(&main).unwrap();
    let section = &document.sections[0];
    assert_eq!(section.paragraphs.len(), 2);
    assert_eq!(section.paragraphs[0].formulas.len(), 2);
    assert!(section.paragraphs[1].formulas.is_empty());
}

#[test]
fn test_three_file_cycle_reports_the_full_path() {
    let dir = create_temp_dir().unwrap();
    let base = dir.path().to_path_buf();
    create_test_file(&base, "a.tex", "\\input{b}").unwrap();
    create_test_file(&base, "b.tex", "\\input{c}").unwrap();
    create_test_file(&base, "c.tex", "\\input{a}").unwrap();
    let main = create_test_file(&base, "main.tex", "\\input{a}").unwrap();

    let err = StructuralParser::default().parse_document(&main).unwrap_err();
    match err {
        StructuralError::IncludeCycle { cycle } => {
            assert!(cycle.contains("b.tex"));
            assert!(cycle.contains("c.tex"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_trailing_comments_are_stripped_from_paragraph_text() {
    let parser = StructuralParser::default();
    let dir = create_temp_dir().unwrap();
    let main = create_test_file(
        &dir.path().to_path_buf(),
        "main.tex",
        "\\section{A}\nkept text % dropped note\n",
    )
    .unwrap();

    let document = parser.parse_document(&main).unwrap();
    let paragraph = &document.sections[0].paragraphs[0];
    assert!(paragraph.text.contains("kept text"));
    assert!(!paragraph.text.contains("dropped note"));
}

#[test]
fn test_parse_error_location_points_at_the_dangling_dollar() {
    let parser = StructuralParser::default();
    let err = parser
        .parse_content("\\section{Bad}\nfine line\nbroken $ here", "test.tex")
        .unwrap_err();
    match err {
        StructuralError::UnbalancedDelimiter { line, column } => {
            assert_eq!(line, 2);
            assert!(column > 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}
