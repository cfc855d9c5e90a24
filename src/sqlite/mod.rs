//! SQLite mapping and execution layer.
//!
//! Data flow: [`Entity`] descriptors are resolved by the [`EntityMapper`],
//! turned into SQL by the [`SqlBuilder`] and executed by a [`Repository`]
//! inside a [`UnitOfWork`].

pub mod builder;
pub mod config;
pub mod context;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod mapper;
pub mod naming;
pub mod provider;
pub mod query;
pub mod repository;
pub mod store;
pub mod unit_of_work;
pub mod value;

#[cfg(test)]
mod test_fixtures;

pub use builder::{SqlBuilder, Statement};
pub use config::{BeginMode, JournalMode, NamingStrategy, SqliteConfig, Synchronous};
pub use context::{ContextState, SchemaBootstrapper, TransactionContext};
pub use dialect::{Dialect, SqliteDialect};
pub use entity::{
    DefaultValue, Entity, EntityDescriptor, EntityRef, FieldDescriptor, FieldType,
    ForeignKeyAction, IndexDescriptor,
};
pub use error::{Result, SqliteError};
pub use mapper::{ColumnMapping, EntityMapper, EntityMetadata, ForeignKeyMapping, IndexMapping};
pub use naming::{IdentityTranslator, NameTranslator, SnakeCaseTranslator};
pub use provider::{ConnectionHandle, ConnectionProvider, SqliteConnectionProvider};
pub use query::{Condition, Operator, Query};
pub use repository::Repository;
pub use store::SqliteStore;
pub use unit_of_work::{UnitOfWork, UnitOfWorkState};
pub use value::{FromValue, Value, ValueError};
