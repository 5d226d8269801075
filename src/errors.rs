/*!
 * Error types for the scitrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur while parsing the structure of a source document.
///
/// Structural errors are fatal: they abort the run before any translation
/// request is made.
#[derive(Error, Debug)]
pub enum StructuralError {
    /// A file-inclusion directive chain loops back onto itself
    #[error("inclusion cycle detected: {cycle}")]
    IncludeCycle {
        /// The cycle rendered as "a.tex -> b.tex -> a.tex"
        cycle: String,
    },

    /// Inline math delimiters do not pair up
    #[error("unbalanced '$' delimiter at line {line}, column {column}")]
    UnbalancedDelimiter {
        /// 1-based line of the dangling delimiter
        line: usize,
        /// 1-based column of the dangling delimiter
        column: usize,
    },

    /// A display environment is opened but never closed
    #[error("unterminated display environment '{environment}' starting at line {line}")]
    UnterminatedEnvironment {
        /// Environment name, e.g. "equation"
        environment: String,
        /// 1-based line where the environment opens
        line: usize,
    },

    /// The root document could not be read
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when talking to the model backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The bounded wait for a response ran out
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors that can occur while translating a section
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The backend returned a different number of paragraphs than the source
    #[error("paragraph count mismatch in section '{section_id}': source {source_count}, translated {translated_count}")]
    ParagraphCountMismatch {
        /// Section being translated
        section_id: String,
        /// Paragraphs in the source section
        source_count: usize,
        /// Paragraphs in the backend response
        translated_count: usize,
    },

    /// A section was scheduled before one of its dependencies completed
    #[error("section '{section_id}' cannot start: dependency '{dependency_id}' has no completed translation")]
    DependencyPending {
        /// Section that was scheduled too early
        section_id: String,
        /// The dependency that is still incomplete
        dependency_id: String,
    },

    /// Retry budget for a section is exhausted
    #[error("section '{section_id}' failed after {attempts} attempts: {reason}")]
    RetriesExhausted {
        /// Section that failed
        section_id: String,
        /// Number of attempts made
        attempts: usize,
        /// Last failure reason
        reason: String,
    },

    /// The run was cancelled before this unit was scheduled
    #[error("translation cancelled before section '{0}' was scheduled")]
    Cancelled(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from parsing the source document
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from the terminology index
    #[error("Terminology index error: {0}")]
    Index(String),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
