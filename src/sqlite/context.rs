//! Transaction context and schema bootstrap.

use std::sync::atomic::{AtomicU8, Ordering};

use super::builder::SqlBuilder;
use super::entity::{Entity, EntityRef};
use super::error::{from_rusqlite, Result, SqliteError};
use super::repository::Repository;
use super::unit_of_work::UnitOfWork;

/// Creates tables and indexes, in the given order, inside one unit of work.
///
/// Callers order principal tables before their dependents.
#[derive(Debug, Clone)]
pub struct SchemaBootstrapper {
    builder: SqlBuilder,
}

impl SchemaBootstrapper {
    pub fn new(builder: SqlBuilder) -> Self {
        Self { builder }
    }

    /// All DDL for `types`, in order. Metadata errors surface here, before
    /// anything is sent to the database.
    pub fn statements(&self, types: &[EntityRef]) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        for entity in types {
            let meta = self.builder.mapper().resolve_ref(*entity)?;
            statements.push(self.builder.create_table_for(&meta)?.sql);
            statements.extend(
                self.builder
                    .create_indexes_for(&meta)
                    .into_iter()
                    .map(|stmt| stmt.sql),
            );
        }
        Ok(statements)
    }

    pub async fn create_schema(&self, uow: &UnitOfWork, types: &[EntityRef]) -> Result<()> {
        let statements = self.statements(types)?;
        for sql in &statements {
            uow.run(|conn| {
                tracing::debug!(sql = %sql, "Executing DDL");
                conn.execute_batch(sql).map_err(from_rusqlite)
            })
            .await?;
        }
        tracing::debug!(types = types.len(), statements = statements.len(), "Schema ensured");
        Ok(())
    }

    pub async fn create<T: Entity>(&self, uow: &UnitOfWork) -> Result<()> {
        self.create_schema(uow, &[EntityRef::of::<T>()]).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Active,
    Completed,
    Disposed,
}

impl ContextState {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextState::Active => "active",
            ContextState::Completed => "completed",
            ContextState::Disposed => "disposed",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ContextState::Active,
            1 => ContextState::Completed,
            _ => ContextState::Disposed,
        }
    }
}

/// One unit of work plus a repository factory for a single linear sequence
/// of operations. Not safe for concurrent callers.
#[derive(Debug)]
pub struct TransactionContext {
    uow: UnitOfWork,
    builder: SqlBuilder,
    state: AtomicU8,
}

impl TransactionContext {
    pub fn new(uow: UnitOfWork, builder: SqlBuilder) -> Self {
        Self {
            uow,
            builder,
            state: AtomicU8::new(ContextState::Active as u8),
        }
    }

    pub fn state(&self) -> ContextState {
        ContextState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn unit_of_work(&self) -> &UnitOfWork {
        &self.uow
    }

    /// Repository for `T` bound to this context's unit of work.
    pub fn repo<T: Entity>(&self) -> Result<Repository<'_, T>> {
        self.ensure_active()?;
        Repository::new(&self.uow, self.builder.clone())
    }

    pub async fn ensure_schema(&self, types: &[EntityRef]) -> Result<()> {
        self.ensure_active()?;
        SchemaBootstrapper::new(self.builder.clone())
            .create_schema(&self.uow, types)
            .await
    }

    pub async fn commit(&self) -> Result<()> {
        self.uow.commit().await?;
        self.set_state(ContextState::Completed);
        Ok(())
    }

    pub async fn rollback(&self) -> Result<()> {
        self.uow.rollback().await?;
        self.set_state(ContextState::Completed);
        Ok(())
    }

    /// Roll back if never completed, then dispose the unit of work.
    pub async fn dispose(&self) {
        if self.state() == ContextState::Active {
            if let Err(err) = self.uow.rollback().await {
                tracing::warn!(error = %err, "Best-effort rollback failed during context disposal");
            }
        }
        self.uow.dispose().await;
        self.set_state(ContextState::Disposed);
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state() {
            ContextState::Active => Ok(()),
            state => Err(SqliteError::InvalidOperationOnCompletedScope {
                state: state.as_str(),
            }),
        }
    }

    fn set_state(&self, state: ContextState) {
        self.state.store(state as u8, Ordering::Release);
    }
}
