//! Connection and mapping configuration.

use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use serde::Deserialize;

use super::naming::{IdentityTranslator, NameTranslator, SnakeCaseTranslator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    Identity,
    #[default]
    SnakeCase,
}

impl NamingStrategy {
    pub fn translator(self) -> Arc<dyn NameTranslator> {
        match self {
            NamingStrategy::Identity => Arc::new(IdentityTranslator),
            NamingStrategy::SnakeCase => Arc::new(SnakeCaseTranslator),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    fn as_pragma(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Synchronous {
    Off,
    Normal,
    Full,
    Extra,
}

impl Synchronous {
    fn level(self) -> i64 {
        match self {
            Synchronous::Off => 0,
            Synchronous::Normal => 1,
            Synchronous::Full => 2,
            Synchronous::Extra => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeginMode {
    #[default]
    Deferred,
    Immediate,
    Exclusive,
}

impl BeginMode {
    pub(crate) fn begin_sql(self) -> &'static str {
        match self {
            BeginMode::Deferred => "BEGIN DEFERRED",
            BeginMode::Immediate => "BEGIN IMMEDIATE",
            BeginMode::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// Store configuration: database location, naming strategy and the tuning
/// applied to every connection a unit of work opens.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file path, or `:memory:` for an in-memory database that lives
    /// as long as the store's connection provider.
    pub db_path: String,
    pub naming: NamingStrategy,
    pub journal_mode: Option<JournalMode>,
    pub synchronous: Option<Synchronous>,
    pub cache_size: Option<i64>,
    pub busy_timeout_ms: Option<u64>,
    pub transaction_behavior: BeginMode,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            db_path: ":memory:".to_string(),
            naming: NamingStrategy::default(),
            journal_mode: None,
            synchronous: None,
            cache_size: None,
            busy_timeout_ms: None,
            transaction_behavior: BeginMode::default(),
        }
    }
}

impl SqliteConfig {
    /// Create a new SQLite config for the database at `db_path`
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = Some(mode);
        self
    }

    pub fn with_synchronous(mut self, mode: Synchronous) -> Self {
        self.synchronous = Some(mode);
        self
    }

    pub fn with_cache_size(mut self, pages: i64) -> Self {
        self.cache_size = Some(pages);
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_transaction_behavior(mut self, mode: BeginMode) -> Self {
        self.transaction_behavior = mode;
        self
    }

    /// Apply the connection-tuning directives in their fixed order.
    ///
    /// Foreign-key enforcement is always switched on first; without it SQLite
    /// silently ignores `ON DELETE` actions.
    pub(crate) fn apply_pragmas(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.pragma_update(None, "foreign_keys", true)?;
        if let Some(mode) = self.journal_mode {
            // journal_mode answers with the mode actually in effect.
            conn.pragma_update_and_check(None, "journal_mode", mode.as_pragma(), |row| {
                row.get::<_, String>(0)
            })?;
        }
        if let Some(mode) = self.synchronous {
            conn.pragma_update(None, "synchronous", mode.level())?;
        }
        if let Some(pages) = self.cache_size {
            conn.pragma_update(None, "cache_size", pages)?;
        }
        if let Some(ms) = self.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let config: SqliteConfig = serde_json::from_str(
            r#"{"db_path": "app.db", "naming": "identity", "journal_mode": "wal", "busy_timeout_ms": 500}"#,
        )
        .unwrap();
        assert_eq!(config.db_path, "app.db");
        assert_eq!(config.naming, NamingStrategy::Identity);
        assert_eq!(config.journal_mode, Some(JournalMode::Wal));
        assert_eq!(config.synchronous, None);
        assert_eq!(config.busy_timeout_ms, Some(500));
        assert_eq!(config.transaction_behavior, BeginMode::Deferred);
    }

    #[test]
    fn foreign_keys_are_always_enabled() {
        let conn = Connection::open_in_memory().unwrap();
        SqliteConfig::default()
            .with_synchronous(Synchronous::Normal)
            .apply_pragmas(&conn)
            .unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
        let sync: i64 = conn
            .query_row("PRAGMA synchronous", [], |row| row.get(0))
            .unwrap();
        assert_eq!(sync, 1);
    }
}
