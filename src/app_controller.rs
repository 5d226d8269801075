/*!
 * Application controller: the end-to-end translation pipeline.
 *
 * Phases: parse, dependency analysis, terminology preparation, translation,
 * assembly, reporting. Only a structural parse failure or a completely
 * unreachable backend aborts the run; everything downstream degrades per
 * unit and is reflected in the outcome instead.
 */

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::app_config::Config;
use crate::assemble::{assemble_document, build_outcome};
use crate::dependency::{assign_dependencies, translation_order, DependencyAnalyzer};
use crate::document::{RunOutcome, StructuralParser};
use crate::errors::AppError;
use crate::providers::openai::OpenAiBackend;
use crate::providers::ModelBackend;
use crate::terminology::{
    build_dictionary, AutoResolver, ConflictResolver, SqliteTermIndex, TermIndex, TerminologyStore,
};
use crate::translation::{CancellationFlag, Orchestrator, TranslationEngine};
use crate::validation::FormulaValidator;

/// Pipeline phases shown in the progress bar
const PHASES: usize = 5;

/// Drives a full document translation run
pub struct Controller {
    config: Config,
    backend: Arc<dyn ModelBackend>,
    index: Arc<dyn TermIndex>,
    resolver: Arc<dyn ConflictResolver>,
    cancel: CancellationFlag,
}

impl Controller {
    /// Create a controller with the production collaborators: the
    /// OpenAI-compatible backend and the sqlite terminology index.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let api_key = config.provider.resolved_api_key()?;
        let backend = Arc::new(OpenAiBackend::new(&config.provider, api_key)?);

        let index: Arc<dyn TermIndex> = if config.terminology.database_path.is_empty() {
            Arc::new(SqliteTermIndex::new_default().map_err(|e| AppError::Index(e.to_string()))?)
        } else {
            Arc::new(
                SqliteTermIndex::new(&config.terminology.database_path)
                    .map_err(|e| AppError::Index(e.to_string()))?,
            )
        };

        if !config.terminology.auto_mode {
            warn!("No interactive resolver wired in; conflicts fall back to the stored entry");
        }

        Ok(Self::with_collaborators(
            config,
            backend,
            index,
            Arc::new(AutoResolver),
        ))
    }

    /// Create a controller over explicit collaborators. Front-ends use this
    /// to wire in their own backend, index, or interactive resolver.
    pub fn with_collaborators(
        config: Config,
        backend: Arc<dyn ModelBackend>,
        index: Arc<dyn TermIndex>,
        resolver: Arc<dyn ConflictResolver>,
    ) -> Self {
        Self {
            config,
            backend,
            index,
            resolver,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that aborts the translation phase when set
    pub fn cancellation_flag(&self) -> CancellationFlag {
        Arc::clone(&self.cancel)
    }

    /// Run the pipeline: read `source`, write the translated document to
    /// `output` and the outcome JSON next to it (or to `report`).
    pub async fn run(
        &self,
        source: &Path,
        output: &Path,
        report: Option<&Path>,
    ) -> Result<RunOutcome, AppError> {
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let progress = phase_progress();

        // Phase 1: parse
        progress.set_message("Parsing document structure");
        let parser = StructuralParser::new(self.config.output.preserve_comments);
        let flattened = parser.flatten_document(source)?;
        let source_hash = format!("{:x}", Sha256::digest(flattened.as_bytes()));
        let mut document = parser.parse_content(&flattened, &source.display().to_string())?;
        info!(
            "Parsed {} sections from {:?} (run {})",
            document.sections.len(),
            source,
            run_id
        );
        progress.inc(1);

        // An unreachable backend is the one non-structural fatal condition
        self.backend.test_connection().await?;

        // Phase 2: dependency analysis
        progress.set_message("Analyzing section dependencies");
        let analyzer = DependencyAnalyzer::new(
            Arc::clone(&self.backend),
            self.config.translation.analysis_retries,
        );
        let edges = analyzer.analyze(&document).await;
        assign_dependencies(&mut document, &edges);
        let order = translation_order(&document, &edges);
        info!("Translation order: {}", order.join(" -> "));
        progress.inc(1);

        // Phase 3: terminology
        progress.set_message("Preparing terminology");
        let store = TerminologyStore::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.index),
            Arc::clone(&self.resolver),
            self.config.terminology.clone(),
            self.config.translation.analysis_retries,
        );
        let entries = store
            .prepare(
                &document,
                &Config::language_display_name(&self.config.source_language),
                &Config::language_display_name(&self.config.target_language),
            )
            .await?;
        let dictionary = build_dictionary(&entries);
        info!("Dictionary carries {} terms", dictionary.len());
        progress.inc(1);

        // Phase 4: translation (validation runs inside the retry loop)
        progress.set_message("Translating sections");
        let engine = TranslationEngine::new(Arc::clone(&self.backend), &self.config);
        let validator = FormulaValidator::new(self.config.translation.formula_compare);
        let orchestrator = Orchestrator::new(engine, validator, &self.config)
            .with_cancellation(Arc::clone(&self.cancel));
        let state = orchestrator.run(&document, &order, &dictionary).await?;
        progress.inc(1);

        // Phase 5: assembly and reporting
        progress.set_message("Assembling output");
        let text = assemble_document(&document, &state);
        std::fs::write(output, &text)?;

        let outcome = build_outcome(
            &document,
            &state,
            &run_id,
            &source_hash,
            &dictionary,
            started.elapsed().as_secs_f64(),
        );
        let outcome_path = report
            .map(Path::to_path_buf)
            .unwrap_or_else(|| output.with_extension("outcome.json"));
        let rendered = serde_json::to_string_pretty(&outcome)
            .map_err(|e| AppError::File(e.to_string()))?;
        std::fs::write(&outcome_path, rendered)?;
        progress.inc(1);
        progress.finish_with_message("Done");

        info!(
            "Run {} finished: {:?}, {} marked paragraph(s), {} failed section(s), {:.1}s",
            run_id,
            outcome.status,
            outcome.marked_count(),
            outcome.failed_sections.len(),
            outcome.elapsed_secs
        );
        Ok(outcome)
    }
}

fn phase_progress() -> ProgressBar {
    let progress = ProgressBar::new(PHASES as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{bar:20.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    progress
}
