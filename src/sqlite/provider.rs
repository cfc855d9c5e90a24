//! Connection providers.
//!
//! A provider hands out *closed* connection handles; the unit of work opens
//! and closes them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::lock::Mutex;
use rusqlite::{Connection, OpenFlags};

use super::error::{from_rusqlite, Result};

static NEXT_MEMORY_DB: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    File(PathBuf),
    /// Named shared-cache in-memory database, addressed by URI.
    Memory(String),
}

/// Everything needed to open one connection, not yet opened.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    target: ConnectionTarget,
    flags: OpenFlags,
}

impl ConnectionHandle {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            target: ConnectionTarget::File(path.as_ref().to_path_buf()),
            flags: OpenFlags::default(),
        }
    }

    /// A fresh in-memory database. Every connection opened from this handle
    /// (or its clones) sees the same data while at least one stays open.
    pub fn memory() -> Self {
        let id = NEXT_MEMORY_DB.fetch_add(1, Ordering::Relaxed);
        Self {
            target: ConnectionTarget::Memory(format!(
                "file:rust_sqlite_mapper_mem{id}?mode=memory&cache=shared"
            )),
            flags: OpenFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub(crate) fn open(&self) -> rusqlite::Result<Connection> {
        match &self.target {
            ConnectionTarget::File(path) => Connection::open_with_flags(path, self.flags),
            ConnectionTarget::Memory(uri) => {
                Connection::open_with_flags(uri, self.flags | OpenFlags::SQLITE_OPEN_URI)
            }
        }
    }
}

#[async_trait]
pub trait ConnectionProvider: Send + Sync + fmt::Debug {
    async fn create(&self) -> Result<ConnectionHandle>;
}

/// Provider for a database file, or `:memory:` for an in-memory database.
///
/// An in-memory database is kept alive by a connection the provider holds
/// from the first `create` until the provider is dropped, so schema and rows
/// committed by one unit of work are visible to the next.
#[derive(Debug, Clone)]
pub struct SqliteConnectionProvider {
    handle: ConnectionHandle,
    anchor: Option<Arc<Mutex<Option<Connection>>>>,
}

impl SqliteConnectionProvider {
    pub fn new(db_path: &str) -> Self {
        if db_path == ":memory:" {
            Self {
                handle: ConnectionHandle::memory(),
                anchor: Some(Arc::new(Mutex::new(None))),
            }
        } else {
            Self {
                handle: ConnectionHandle::file(db_path),
                anchor: None,
            }
        }
    }

    pub fn with_flags(mut self, flags: OpenFlags) -> Self {
        self.handle = self.handle.with_flags(flags);
        self
    }
}

#[async_trait]
impl ConnectionProvider for SqliteConnectionProvider {
    async fn create(&self) -> Result<ConnectionHandle> {
        if let Some(anchor) = &self.anchor {
            let mut held = anchor.lock().await;
            if held.is_none() {
                *held = Some(self.handle.open().map_err(from_rusqlite)?);
                tracing::debug!(db = ?self.handle.target(), "In-memory database opened");
            }
        }
        Ok(self.handle.clone())
    }
}
