/*!
 * Whole-section translation against the model backend.
 *
 * The engine issues one completion request per attempt and enforces the
 * paragraph-count contract: the response must contain exactly as many
 * blank-line-separated paragraphs as the source section, otherwise
 * paragraph-level validation has nothing to align against.
 */

use std::sync::Arc;

use log::debug;

use crate::app_config::Config;
use crate::document::{split_paragraphs, Paragraph, Section};
use crate::errors::TranslationError;
use crate::providers::{ChatRequest, ModelBackend};
use crate::terminology::Dictionary;

use super::prompts::{Strictness, TranslationPromptBuilder};

/// A backend response that passed the paragraph-count contract
#[derive(Debug, Clone)]
pub struct SectionTranslation {
    /// Section the translation belongs to
    pub section_id: String,
    /// Full translated text
    pub text: String,
    /// Translated paragraphs, aligned with the source paragraphs
    pub paragraphs: Vec<String>,
    /// 1-based attempt that produced this translation
    pub attempt: usize,
}

/// Translates sections through a model backend
#[derive(Debug, Clone)]
pub struct TranslationEngine {
    backend: Arc<dyn ModelBackend>,
    source_language: String,
    target_language: String,
    temperature: f32,
    max_tokens: u32,
}

impl TranslationEngine {
    /// Create an engine for the configured language pair
    pub fn new(backend: Arc<dyn ModelBackend>, config: &Config) -> Self {
        Self {
            backend,
            source_language: Config::language_display_name(&config.source_language),
            target_language: Config::language_display_name(&config.target_language),
            temperature: config.provider.temperature,
            max_tokens: config.provider.max_tokens,
        }
    }

    fn prompt_builder(
        &self,
        dictionary: &Dictionary,
        context: &str,
        attempt: usize,
    ) -> TranslationPromptBuilder {
        TranslationPromptBuilder::new(&self.source_language, &self.target_language)
            .with_dictionary(dictionary)
            .with_context(context)
            .with_strictness(Strictness::for_attempt(attempt))
    }

    async fn complete(&self, builder: &TranslationPromptBuilder, content: &str) -> Result<String, TranslationError> {
        let request = ChatRequest::new(builder.system_prompt(), builder.user_prompt(content))
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);
        let response = self.backend.complete(request).await?;
        Ok(response.trim().to_string())
    }

    /// Translate one section. The `attempt` number selects the strictness
    /// level; retry scheduling is the orchestrator's job.
    pub async fn translate_section(
        &self,
        section: &Section,
        dictionary: &Dictionary,
        context: &str,
        attempt: usize,
    ) -> Result<SectionTranslation, TranslationError> {
        debug!(
            "Translating section '{}' (attempt {}, {} paragraphs)",
            section.id,
            attempt,
            section.paragraphs.len()
        );

        let builder = self.prompt_builder(dictionary, context, attempt);
        let text = self.complete(&builder, &section.content).await?;
        let paragraphs = split_paragraphs(&text);

        if paragraphs.len() != section.paragraphs.len() {
            return Err(TranslationError::ParagraphCountMismatch {
                section_id: section.id.clone(),
                source_count: section.paragraphs.len(),
                translated_count: paragraphs.len(),
            });
        }

        Ok(SectionTranslation {
            section_id: section.id.clone(),
            text,
            paragraphs,
            attempt,
        })
    }

    /// Retranslate a single paragraph (paragraph retry granularity).
    /// The response must collapse to exactly one paragraph.
    pub async fn translate_paragraph(
        &self,
        section: &Section,
        paragraph: &Paragraph,
        dictionary: &Dictionary,
        context: &str,
        attempt: usize,
    ) -> Result<String, TranslationError> {
        debug!(
            "Retranslating paragraph {} of section '{}' (attempt {})",
            paragraph.index, section.id, attempt
        );

        let builder = self.prompt_builder(dictionary, context, attempt);
        let text = self.complete(&builder, &paragraph.text).await?;
        let paragraphs = split_paragraphs(&text);

        if paragraphs.len() != 1 {
            return Err(TranslationError::ParagraphCountMismatch {
                section_id: section.id.clone(),
                source_count: 1,
                translated_count: paragraphs.len(),
            });
        }

        Ok(paragraphs.into_iter().next().unwrap_or(text))
    }
}
