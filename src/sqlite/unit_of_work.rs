//! One connection, one transaction.
//!
//! ```text
//! begin -> Active -> Committed | RolledBack -> Disposed
//!              \_____________________________/
//!                 (dispose without completion rolls back)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use futures::lock::Mutex;
use rusqlite::Connection;
use tokio_util::sync::CancellationToken;

use super::config::SqliteConfig;
use super::error::{from_rusqlite, Result, SqliteError};
use super::provider::ConnectionProvider;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    Active,
    Committed,
    RolledBack,
    Disposed,
}

impl UnitOfWorkState {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitOfWorkState::Active => "active",
            UnitOfWorkState::Committed => "committed",
            UnitOfWorkState::RolledBack => "rolled back",
            UnitOfWorkState::Disposed => "disposed",
        }
    }
}

#[derive(Debug)]
struct Session {
    conn: Option<Connection>,
    state: UnitOfWorkState,
}

/// Owns exactly one open connection and one transaction.
///
/// Not meant for concurrent callers; take one unit of work per task.
#[derive(Debug)]
pub struct UnitOfWork {
    id: u64,
    session: Mutex<Session>,
    cancel: CancellationToken,
}

impl UnitOfWork {
    /// Open a connection, apply tuning directives and begin a transaction.
    ///
    /// A failure at any step closes the partially opened connection.
    pub async fn begin(provider: &dyn ConnectionProvider, config: &SqliteConfig) -> Result<Self> {
        let handle = provider.create().await?;
        let conn = handle.open().map_err(from_rusqlite)?;
        let prepared = config
            .apply_pragmas(&conn)
            .and_then(|()| conn.execute_batch(config.transaction_behavior.begin_sql()));
        if let Err(err) = prepared {
            close(conn);
            return Err(from_rusqlite(err));
        }

        let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(scope = id, db = ?handle.target(), "Unit of work started");
        Ok(Self {
            id,
            session: Mutex::new(Session {
                conn: Some(conn),
                state: UnitOfWorkState::Active,
            }),
            cancel: CancellationToken::new(),
        })
    }

    /// Stop issuing statements once `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn state(&self) -> UnitOfWorkState {
        self.session.lock().await.state
    }

    /// Commit the transaction. No-op once committed or rolled back.
    pub async fn commit(&self) -> Result<()> {
        self.finish("COMMIT", UnitOfWorkState::Committed).await
    }

    /// Roll the transaction back. No-op once committed or rolled back.
    pub async fn rollback(&self) -> Result<()> {
        self.finish("ROLLBACK", UnitOfWorkState::RolledBack).await
    }

    async fn finish(&self, sql: &str, terminal: UnitOfWorkState) -> Result<()> {
        let mut session = self.session.lock().await;
        match session.state {
            UnitOfWorkState::Disposed => return Err(SqliteError::ObjectDisposed),
            UnitOfWorkState::Committed | UnitOfWorkState::RolledBack => {
                tracing::debug!(scope = self.id, state = ?session.state, "Unit of work already completed");
                return Ok(());
            }
            UnitOfWorkState::Active => {}
        }
        let conn = session.conn.as_ref().ok_or(SqliteError::ObjectDisposed)?;
        conn.execute_batch(sql).map_err(from_rusqlite)?;
        session.state = terminal;
        tracing::debug!(scope = self.id, state = ?terminal, "Unit of work completed");
        Ok(())
    }

    /// Release the connection, rolling back first if the scope never completed.
    ///
    /// Rollback failures are logged and swallowed. Idempotent.
    pub async fn dispose(&self) {
        let mut session = self.session.lock().await;
        release(self.id, &mut session);
    }

    /// Run `op` against the connection while the transaction is active.
    pub(crate) async fn run<R>(&self, op: impl FnOnce(&Connection) -> Result<R>) -> Result<R> {
        let session = self.session.lock().await;
        if session.state != UnitOfWorkState::Active {
            return Err(SqliteError::InvalidOperationOnCompletedScope {
                state: session.state.as_str(),
            });
        }
        if self.cancel.is_cancelled() {
            return Err(SqliteError::Cancelled);
        }
        let conn = session.conn.as_ref().ok_or(SqliteError::ObjectDisposed)?;
        op(conn)
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        release(self.id, self.session.get_mut());
    }
}

fn release(id: u64, session: &mut Session) {
    if session.state == UnitOfWorkState::Disposed {
        return;
    }
    if let Some(conn) = session.conn.take() {
        if session.state == UnitOfWorkState::Active {
            match conn.execute_batch("ROLLBACK") {
                Ok(()) => tracing::debug!(scope = id, "Unit of work rolled back on disposal"),
                Err(err) => tracing::warn!(
                    scope = id,
                    error = %err,
                    "Best-effort rollback failed during disposal"
                ),
            }
        }
        close(conn);
    }
    session.state = UnitOfWorkState::Disposed;
}

fn close(conn: Connection) {
    if let Err((_, err)) = conn.close() {
        tracing::warn!(error = %err, "Failed to close connection");
    }
}
