//! Storage module for the persisted query history
//!
//! `QueryHistory` is the in-memory list the shell shows; every mutation is
//! written through to an injected `HistoryStore`.
use crate::core::Result;
use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, error};

/// Default number of queries kept
pub const HISTORY_LIMIT: usize = 50;

const HISTORY_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS query_history (
    position INTEGER PRIMARY KEY,
    query TEXT NOT NULL,
    saved_at TEXT NOT NULL
)"#;

/// Where the history survives between sessions
pub trait HistoryStore {
    /// Returns the stored queries, most recent first
    fn load(&self) -> Result<Vec<String>>;
    /// Replaces the stored queries with `entries`, most recent first
    fn save(&mut self, entries: &[String]) -> Result<()>;
}

/// Store that lives only as long as the process
#[derive(Debug, Default, Clone)]
pub struct MemoryHistoryStore {
    entries: Vec<String>,
    pub saves: usize,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<String>) -> Self {
        MemoryHistoryStore { entries, saves: 0 }
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<Vec<String>> {
        Ok(self.entries.clone())
    }

    fn save(&mut self, entries: &[String]) -> Result<()> {
        self.entries = entries.to_vec();
        self.saves += 1;
        Ok(())
    }
}

/// History kept in a small SQLite file
pub struct SqliteHistoryStore {
    conn: Connection,
}

impl SqliteHistoryStore {
    /// Initialize storage with the given path, creating the file if needed
    pub fn new(path: &Path) -> Result<Self> {
        debug!("Initializing history storage at {:?}", path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute(HISTORY_TABLE_SQL, [])?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(HISTORY_TABLE_SQL, [])?;
        Ok(Self { conn })
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn load(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT query FROM query_history ORDER BY position")?;
        let entries = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn save(&mut self, entries: &[String]) -> Result<()> {
        let saved_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM query_history", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO query_history (position, query, saved_at) VALUES (?1, ?2, ?3)",
            )?;
            for (position, query) in entries.iter().enumerate() {
                insert.execute((position as i64, query, &saved_at))?;
            }
        }
        tx.commit()?;
        debug!("Saved {} history entries", entries.len());
        Ok(())
    }
}

/// Most-recent-first list of distinct queries, capped at a fixed length
pub struct QueryHistory<S: HistoryStore> {
    store: S,
    entries: Vec<String>,
    limit: usize,
}

impl<S: HistoryStore> QueryHistory<S> {
    /// Loads the stored history with the default limit
    pub fn load(store: S) -> Result<Self> {
        Self::load_with_limit(store, HISTORY_LIMIT)
    }

    pub fn load_with_limit(store: S, limit: usize) -> Result<Self> {
        let mut entries = store.load()?;
        entries.truncate(limit);
        Ok(QueryHistory {
            store,
            entries,
            limit,
        })
    }

    /// Puts `query` at the front. Empty queries and queries already in the
    /// list are ignored; an existing entry keeps its position.
    ///
    /// Returns whether the list changed.
    pub fn record(&mut self, query: &str) -> Result<bool> {
        if query.is_empty() || self.entries.iter().any(|q| q == query) {
            return Ok(false);
        }
        let mut entries = Vec::with_capacity(self.limit);
        entries.push(query.to_string());
        entries.extend(self.entries.iter().take(self.limit.saturating_sub(1)).cloned());
        entries.truncate(self.limit);
        self.replace(entries)?;
        Ok(true)
    }

    /// Empties the list. On a failed save the entries are kept.
    pub fn clear(&mut self) -> Result<()> {
        self.replace(Vec::new())
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The in-memory list only changes once the store accepted `entries`.
    fn replace(&mut self, entries: Vec<String>) -> Result<()> {
        self.store.save(&entries).map_err(|e| {
            error!("Failed to save query history: {}", e);
            e
        })?;
        self.entries = entries;
        Ok(())
    }
}
