/*!
 * Prompt templates for section translation.
 *
 * The request instructs the backend to leave formula spans verbatim and to
 * apply the terminology dictionary. Strictness escalates across retries:
 * the first retry repeats the standard reminder, later ones demand
 * self-verification before returning.
 */

use crate::terminology::Dictionary;

/// System prompt template; placeholders are the language display names
const SYSTEM_TEMPLATE: &str = r#"You are a professional scientific translator from {source_language} to {target_language}.

Your key responsibilities:
1. NEVER modify LaTeX formulas (in $...$, $$...$$, \[...\], equation, align, and similar environments)
2. Translate text naturally and idiomatically
3. Restructure sentences as needed for natural {target_language}
4. Use the provided terminology dictionary consistently
5. Maintain LaTeX structure and commands
6. Keep the paragraph structure: output exactly as many paragraphs as the source, separated by blank lines"#;

/// Escalation level for formula-preservation instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Standard "do not alter formulas" reminder
    Standard,
    /// Maximal-strictness instruction demanding self-verification
    Strict,
}

impl Strictness {
    /// Strictness for a given retry attempt (1-based)
    pub fn for_attempt(attempt: usize) -> Self {
        if attempt <= 1 {
            Self::Standard
        } else {
            Self::Strict
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Self::Standard => "",
            Self::Strict => {
                "\nCRITICAL: FORMULA PRESERVATION\n\
                 All formulas MUST remain IDENTICAL to the source, character for character.\n\
                 Before returning, re-read your output and verify EVERY formula against the source TWICE.\n\
                 This is a retry: the previous attempt altered, dropped, or reordered formulas.\n"
            }
        }
    }
}

/// Builder for a per-section translation request
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    source_language: String,
    target_language: String,
    dictionary_lines: String,
    context: String,
    strictness: Strictness,
}

impl TranslationPromptBuilder {
    /// Create a builder for a language pair (display names, not tags)
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            dictionary_lines: String::new(),
            context: String::new(),
            strictness: Strictness::Standard,
        }
    }

    /// Inject the terminology dictionary
    pub fn with_dictionary(mut self, dictionary: &Dictionary) -> Self {
        self.dictionary_lines = dictionary
            .iter()
            .map(|(source, target)| format!("- {source} → {target}"))
            .collect::<Vec<_>>()
            .join("\n");
        self
    }

    /// Inject already-translated dependency context
    pub fn with_context(mut self, context: &str) -> Self {
        self.context = context.to_string();
        self
    }

    /// Set the strictness level
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Render the system prompt
    pub fn system_prompt(&self) -> String {
        SYSTEM_TEMPLATE
            .replace("{source_language}", &self.source_language)
            .replace("{target_language}", &self.target_language)
    }

    /// Render the user prompt around the section content
    pub fn user_prompt(&self, content: &str) -> String {
        let dictionary = if self.dictionary_lines.is_empty() {
            "(no specific terms)"
        } else {
            &self.dictionary_lines
        };
        let context = if self.context.is_empty() {
            "(no dependencies)"
        } else {
            &self.context
        };

        format!(
            r#"Translate the following scientific text from {source} to {target}.

TERMINOLOGY DICTIONARY (use these translations):
{dictionary}

CONTEXT FROM ALREADY-TRANSLATED SECTIONS:
{context}

CRITICAL RULES:
1. DO NOT MODIFY any LaTeX formulas
2. Keep all LaTeX commands and environments intact
3. Translate text naturally and idiomatically
4. Use the terminology dictionary consistently
5. Output exactly as many paragraphs as the source, separated by blank lines
{strictness}
TEXT TO TRANSLATE:
{content}

Provide ONLY the translated text, without explanations or comments."#,
            source = self.source_language,
            target = self.target_language,
            dictionary = dictionary,
            context = context,
            strictness = self.strictness.instruction(),
            content = content,
        )
    }
}
