/*!
 * Common test utilities for the scitrans test suite
 */

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use scitrans::app_config::Config;
use scitrans::app_controller::Controller;
use scitrans::document::{Document, StructuralParser};
use scitrans::providers::mock::{ScriptedBackend, ScriptedResponse};
use scitrans::terminology::{AutoResolver, InMemoryTermIndex};

/// Route log output through the test harness (`RUST_LOG` controls the level)
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &PathBuf, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Parse already-flattened content into a document
pub fn parse(content: &str) -> Document {
    StructuralParser::default()
        .parse_content(content, "test.tex")
        .expect("test content parses")
}

/// Default config trimmed for deterministic tests: requests run one at a
/// time so scripted responses are consumed in a predictable order.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.provider.concurrent_requests = 1;
    config
}

/// A backend that plays back the given responses, echoing afterwards
pub fn scripted(responses: Vec<ScriptedResponse>) -> ScriptedBackend {
    ScriptedBackend::new(responses)
}

/// Controller wired with mock collaborators over the given backend
pub fn controller_with(config: Config, backend: ScriptedBackend) -> Controller {
    Controller::with_collaborators(
        config,
        Arc::new(backend),
        Arc::new(InMemoryTermIndex::new()),
        Arc::new(AutoResolver),
    )
}

/// A terminology extraction response with no terms, for pipelines that do
/// not exercise the dictionary
pub fn empty_terms_response() -> ScriptedResponse {
    ScriptedResponse::Text(r#"{"terms": []}"#.to_string())
}
