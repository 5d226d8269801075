/*!
 * Structural parser for LaTeX-style documents.
 *
 * Resolves nested `\input`/`\include` directives into one logical stream,
 * splits it into a section tree by heading markers, and splits each section
 * into paragraphs carrying their formula spans. The parsed `Document` is
 * immutable; everything downstream works on it by reference.
 */

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::errors::StructuralError;

use super::formula::{extract_formulas, split_paragraphs};
use super::model::{Document, Paragraph, Section};

/// `\input{file}` / `\include{file}` directive
static INCLUDE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(?:input|include)\{([^}]+)\}").unwrap());

/// `\section{...}` family of heading markers
static SECTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(section|subsection|subsubsection)\{([^}]+)\}").unwrap());

/// Parser for the document structure
#[derive(Debug, Clone)]
pub struct StructuralParser {
    /// Whether `%` comments survive flattening
    preserve_comments: bool,
}

impl Default for StructuralParser {
    fn default() -> Self {
        Self::new(false)
    }
}

impl StructuralParser {
    /// Create a parser
    pub fn new(preserve_comments: bool) -> Self {
        Self { preserve_comments }
    }

    /// Flatten a document rooted at `main_file` by resolving inclusion
    /// directives. Flattening an already-flat document returns it unchanged
    /// (modulo comment stripping when configured).
    pub fn flatten_document<P: AsRef<Path>>(&self, main_file: P) -> Result<String, StructuralError> {
        let main_path = main_file.as_ref();
        let base_dir = main_path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        let content = std::fs::read_to_string(main_path)?;

        let mut stack = vec![normalize_path(main_path)];
        self.flatten_content(&content, &base_dir, &mut stack)
    }

    /// Flatten raw content against a base directory
    fn flatten_content(
        &self,
        content: &str,
        base_dir: &Path,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String, StructuralError> {
        let content = if self.preserve_comments {
            content.to_string()
        } else {
            strip_comments(content)
        };

        let mut result = String::with_capacity(content.len());
        let mut cursor = 0;

        for captures in INCLUDE_PATTERN.captures_iter(&content) {
            let whole = captures.get(0).expect("match has a whole group");
            let mut filename = captures
                .get(1)
                .expect("include captures a filename")
                .as_str()
                .to_string();
            if !filename.ends_with(".tex") {
                filename.push_str(".tex");
            }

            result.push_str(&content[cursor..whole.start()]);
            cursor = whole.end();

            let file_path = base_dir.join(&filename);
            let normalized = normalize_path(&file_path);

            if stack.contains(&normalized) {
                let mut names: Vec<String> = stack
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                names.push(normalized.display().to_string());
                return Err(StructuralError::IncludeCycle {
                    cycle: names.join(" -> "),
                });
            }

            if !file_path.exists() {
                warn!("Included file not found, leaving directive in place: {:?}", file_path);
                result.push_str(whole.as_str());
                continue;
            }

            let included = std::fs::read_to_string(&file_path)?;
            stack.push(normalized);
            let flattened = self.flatten_content(&included, base_dir, stack)?;
            stack.pop();
            result.push_str(&flattened);
        }

        result.push_str(&content[cursor..]);
        Ok(result)
    }

    /// Parse a document rooted at `main_file` into its structured form
    pub fn parse_document<P: AsRef<Path>>(&self, main_file: P) -> Result<Document, StructuralError> {
        let content = self.flatten_document(main_file.as_ref())?;
        self.parse_content(&content, &main_file.as_ref().display().to_string())
    }

    /// Parse already-flattened content
    pub fn parse_content(&self, content: &str, source_path: &str) -> Result<Document, StructuralError> {
        let (preamble, body, postamble, has_envelope) = split_envelope(content);
        let sections = self.parse_sections(body)?;

        Ok(Document {
            source_path: source_path.to_string(),
            preamble: preamble.to_string(),
            postamble: postamble.to_string(),
            has_envelope,
            sections,
        })
    }

    /// Split body content into sections at heading markers
    fn parse_sections(&self, body: &str) -> Result<Vec<Section>, StructuralError> {
        let matches: Vec<_> = SECTION_PATTERN.captures_iter(body).collect();

        if matches.is_empty() {
            // No headings: the whole body is one synthetic section
            return Ok(vec![self.build_section("main", "Main Content", 0, body.trim())?]);
        }

        let mut sections = Vec::with_capacity(matches.len());
        for (i, captures) in matches.iter().enumerate() {
            let whole = captures.get(0).expect("match has a whole group");
            let level = match captures.get(1).expect("heading level captured").as_str() {
                "section" => 1,
                "subsection" => 2,
                _ => 3,
            };
            let title = captures.get(2).expect("heading title captured").as_str();

            let start = whole.end();
            let end = matches
                .get(i + 1)
                .map(|next| next.get(0).expect("match has a whole group").start())
                .unwrap_or(body.len());
            let content = body[start..end].trim();

            let id = format!("sec_{}", sections.len());
            sections.push(self.build_section(&id, title, level, content)?);
        }

        Ok(sections)
    }

    /// Assemble a section with its paragraphs and formula spans
    fn build_section(
        &self,
        id: &str,
        title: &str,
        level: usize,
        content: &str,
    ) -> Result<Section, StructuralError> {
        let mut paragraphs = Vec::new();
        for (index, text) in split_paragraphs(content).into_iter().enumerate() {
            let formulas = extract_formulas(&text)?;
            paragraphs.push(Paragraph { index, text, formulas });
        }

        Ok(Section {
            id: id.to_string(),
            title: title.to_string(),
            level,
            content: content.to_string(),
            paragraphs,
            dependencies: Default::default(),
        })
    }
}

/// Split content into (preamble, body, postamble, envelope-present) around
/// the document environment
fn split_envelope(content: &str) -> (&str, &str, &str, bool) {
    const BEGIN: &str = "\\begin{document}";
    const END: &str = "\\end{document}";

    match content.find(BEGIN) {
        Some(begin) => {
            let body_start = begin + BEGIN.len();
            match content[body_start..].find(END) {
                Some(end_rel) => {
                    let end = body_start + end_rel;
                    (
                        &content[..begin],
                        &content[body_start..end],
                        &content[end + END.len()..],
                        true,
                    )
                }
                None => (&content[..begin], &content[body_start..], "", true),
            }
        }
        None => ("", content, "", false),
    }
}

/// Remove `%` comments, preserving escaped `\%`
fn strip_comments(content: &str) -> String {
    let mut lines = Vec::new();
    for line in content.split('\n') {
        let bytes = line.as_bytes();
        let mut cut = line.len();
        for (i, byte) in bytes.iter().enumerate() {
            if *byte == b'%' && (i == 0 || bytes[i - 1] != b'\\') {
                cut = i;
                break;
            }
        }
        lines.push(&line[..cut]);
    }
    lines.join("\n")
}

/// Canonicalize when possible, falling back to the lexical path
fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
