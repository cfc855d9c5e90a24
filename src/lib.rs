//! Metadata-driven record mapping over SQLite.
//!
//! # Intention
//!
//! - Map typed records to SQLite rows from declared metadata, producing
//!   predictable, inspectable SQL.
//! - Execute every statement inside a transaction-scoped unit of work with
//!   explicit commit/rollback/dispose semantics.
//!
//! # Architectural Boundaries
//!
//! - No query planner, joins, change tracking or migrations beyond
//!   idempotent `CREATE ... IF NOT EXISTS`.
//! - The SQLite engine is reached only through `rusqlite` connections.

pub mod sqlite;

pub use sqlite::{
    Entity, EntityDescriptor, EntityRef, FieldDescriptor, FieldType, ForeignKeyAction, Query,
    Repository, Result, SqliteConfig, SqliteError, SqliteStore, TransactionContext, UnitOfWork,
    Value,
};
