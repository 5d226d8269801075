/*!
 * SQLite-backed terminology index.
 *
 * Terms and their context embeddings persist across runs in a single table.
 * Similarity search loads stored embeddings and scores them in process;
 * collections here are dictionary-sized, so a scan is cheap and keeps the
 * persistence lifecycle trivially external.
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::document::TermEntry;

use super::index::{cosine_similarity, ScoredTerm, TermIndex};

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "terms.db";

/// Default database directory name under the user's data directory
const DEFAULT_DB_DIRNAME: &str = "scitrans";

/// SQLite-backed terminology index with thread-safe access
#[derive(Debug, Clone)]
pub struct SqliteTermIndex {
    /// Path to the database file
    db_path: PathBuf,
    /// Thread-safe connection wrapped in Arc<Mutex>
    connection: Arc<Mutex<Connection>>,
}

impl SqliteTermIndex {
    /// Open (or create) the index at the default location
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open (or create) the index at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening terminology database at: {:?}", db_path);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;
        initialize_schema(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory index (for testing)
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory terminology database");
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        initialize_schema(&conn)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Default database path under the user's data directory
    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(base_dir.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Execute a database operation asynchronously using spawn_blocking
    async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| anyhow::anyhow!("Failed to acquire database lock: {}", e))?;
            f(&conn)
        })
        .await
        .context("Database task panicked")?
    }

    /// Fetch one entry by exact source term
    pub async fn get(&self, source: &str) -> Result<Option<TermEntry>> {
        let source = source.to_string();
        self.execute_async(move |conn| {
            let entry = conn
                .query_row(
                    "SELECT source, target, context, confidence, approved FROM terms WHERE source = ?1",
                    params![source],
                    row_to_entry,
                )
                .optional()?;
            Ok(entry)
        })
        .await
    }

    /// Number of stored entries
    pub async fn count(&self) -> Result<i64> {
        self.execute_async(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM terms", [], |row| row.get(0))?;
            Ok(count)
        })
        .await
    }
}

/// Initialize the terms table
fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS terms (
            source TEXT PRIMARY KEY,
            target TEXT NOT NULL,
            context TEXT NOT NULL DEFAULT '',
            confidence REAL NOT NULL DEFAULT 1.0,
            approved INTEGER NOT NULL DEFAULT 0,
            embedding TEXT NOT NULL,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_terms_target ON terms(target);
        "#,
    )
    .context("Failed to initialize terminology schema")?;
    Ok(())
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<TermEntry> {
    Ok(TermEntry {
        source: row.get(0)?,
        target: row.get(1)?,
        context: row.get(2)?,
        confidence: row.get(3)?,
        approved: row.get::<_, i64>(4)? != 0,
    })
}

#[async_trait]
impl TermIndex for SqliteTermIndex {
    async fn nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredTerm>> {
        let query = embedding.to_vec();
        self.execute_async(move |conn| {
            let mut statement = conn.prepare(
                "SELECT source, target, context, confidence, approved, embedding FROM terms",
            )?;
            let rows = statement.query_map([], |row| {
                let entry = row_to_entry(row)?;
                let stored: String = row.get(5)?;
                Ok((entry, stored))
            })?;

            let mut scored = Vec::new();
            for row in rows {
                let (entry, stored) = row?;
                let stored: Vec<f32> = serde_json::from_str(&stored)
                    .with_context(|| format!("corrupt embedding for term '{}'", entry.source))?;
                scored.push(ScoredTerm {
                    similarity: cosine_similarity(&query, &stored),
                    entry,
                });
            }
            scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
            scored.truncate(k);
            Ok(scored)
        })
        .await
    }

    async fn upsert(&self, entry: TermEntry, embedding: Vec<f32>) -> Result<()> {
        // Single statement, so concurrent writers for the same source term
        // serialize on the connection and the last one wins atomically.
        self.execute_async(move |conn| {
            let embedding_json = serde_json::to_string(&embedding)?;
            conn.execute(
                r#"
                INSERT INTO terms (source, target, context, confidence, approved, embedding, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, CURRENT_TIMESTAMP)
                ON CONFLICT(source) DO UPDATE SET
                    target = excluded.target,
                    context = excluded.context,
                    confidence = excluded.confidence,
                    approved = excluded.approved,
                    embedding = excluded.embedding,
                    updated_at = CURRENT_TIMESTAMP
                "#,
                params![
                    entry.source,
                    entry.target,
                    entry.context,
                    entry.confidence,
                    entry.approved as i64,
                    embedding_json,
                ],
            )?;
            Ok(())
        })
        .await
    }
}
