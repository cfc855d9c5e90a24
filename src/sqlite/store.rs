//! Explicit composition of provider, mapper, dialect and builder.

use std::sync::Arc;

use super::builder::SqlBuilder;
use super::config::SqliteConfig;
use super::context::{SchemaBootstrapper, TransactionContext};
use super::dialect::{Dialect, SqliteDialect};
use super::entity::{Entity, EntityRef};
use super::error::Result;
use super::mapper::EntityMapper;
use super::provider::{ConnectionProvider, SqliteConnectionProvider};
use super::repository::Repository;
use super::unit_of_work::UnitOfWork;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    config: SqliteConfig,
    provider: Arc<dyn ConnectionProvider>,
    builder: SqlBuilder,
}

impl SqliteStore {
    /// Store over `config.db_path` with the SQLite dialect and the configured naming.
    pub fn new(config: SqliteConfig) -> Self {
        let provider = Arc::new(SqliteConnectionProvider::new(&config.db_path));
        let mapper = Arc::new(EntityMapper::new(config.naming.translator()));
        Self::with_components(config, provider, mapper, Arc::new(SqliteDialect))
    }

    pub fn with_components(
        config: SqliteConfig,
        provider: Arc<dyn ConnectionProvider>,
        mapper: Arc<EntityMapper>,
        dialect: Arc<dyn Dialect>,
    ) -> Self {
        Self {
            config,
            provider,
            builder: SqlBuilder::new(mapper, dialect),
        }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    pub fn builder(&self) -> &SqlBuilder {
        &self.builder
    }

    pub fn mapper(&self) -> &Arc<EntityMapper> {
        self.builder.mapper()
    }

    pub async fn unit_of_work(&self) -> Result<UnitOfWork> {
        UnitOfWork::begin(self.provider.as_ref(), &self.config).await
    }

    pub async fn begin(&self) -> Result<TransactionContext> {
        let uow = self.unit_of_work().await?;
        Ok(TransactionContext::new(uow, self.builder.clone()))
    }

    pub fn repository<'a, T: Entity>(&self, uow: &'a UnitOfWork) -> Result<Repository<'a, T>> {
        Repository::new(uow, self.builder.clone())
    }

    /// Create tables and indexes for `types`, in order, in one committed transaction.
    pub async fn bootstrap(&self, types: &[EntityRef]) -> Result<()> {
        let uow = self.unit_of_work().await?;
        SchemaBootstrapper::new(self.builder.clone())
            .create_schema(&uow, types)
            .await?;
        uow.commit().await?;
        uow.dispose().await;
        Ok(())
    }
}
