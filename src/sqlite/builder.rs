//! SQL text generation from entity metadata.
//!
//! Every statement ends with exactly one `;`. Bound parameters are named
//! `p0`, `p1`, ... in the order of [`Statement::columns`].

use std::sync::Arc;

use super::dialect::Dialect;
use super::entity::{DefaultValue, Entity, FieldType, ForeignKeyAction};
use super::error::{Result, SqliteError};
use super::mapper::{ColumnMapping, EntityMapper, EntityMetadata, ForeignKeyMapping};

/// Generated SQL plus the columns bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub columns: Vec<ColumnMapping>,
}

pub(crate) fn param_name(index: usize) -> String {
    format!("p{index}")
}

/// SQLite storage class for a column.
pub fn column_type(column: &ColumnMapping) -> String {
    match column.field_type {
        FieldType::Int32 | FieldType::Int64 | FieldType::Bool => "INTEGER".to_string(),
        FieldType::Double | FieldType::Float | FieldType::Decimal => "REAL".to_string(),
        FieldType::Text => match column.max_length {
            // Informational only; SQLite does not enforce the length.
            Some(len) => format!("VARCHAR({len})"),
            None => "TEXT".to_string(),
        },
        FieldType::DateTime => "TEXT".to_string(),
        FieldType::Blob => "BLOB".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct SqlBuilder {
    mapper: Arc<EntityMapper>,
    dialect: Arc<dyn Dialect>,
}

impl SqlBuilder {
    pub fn new(mapper: Arc<EntityMapper>, dialect: Arc<dyn Dialect>) -> Self {
        Self { mapper, dialect }
    }

    pub fn mapper(&self) -> &Arc<EntityMapper> {
        &self.mapper
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn build_insert<T: Entity>(&self) -> Result<Statement> {
        self.insert_for(&*self.mapper.resolve::<T>()?)
    }

    pub fn build_update<T: Entity>(&self) -> Result<Statement> {
        self.update_for(&*self.mapper.resolve::<T>()?)
    }

    pub fn build_delete<T: Entity>(&self) -> Result<Statement> {
        self.delete_for(&*self.mapper.resolve::<T>()?)
    }

    pub fn build_select_by_key<T: Entity>(&self) -> Result<Statement> {
        self.select_by_key_for(&*self.mapper.resolve::<T>()?)
    }

    pub fn build_create_table<T: Entity>(&self) -> Result<Statement> {
        self.create_table_for(&*self.mapper.resolve::<T>()?)
    }

    pub fn build_create_indexes<T: Entity>(&self) -> Result<Vec<Statement>> {
        Ok(self.create_indexes_for(&*self.mapper.resolve::<T>()?))
    }

    pub fn insert_for(&self, meta: &EntityMetadata) -> Result<Statement> {
        require_columns(meta)?;
        let table = self.quote(&meta.table_name);
        let columns: Vec<ColumnMapping> = meta
            .columns
            .iter()
            .filter(|c| !c.is_auto_generated)
            .cloned()
            .collect();
        if columns.is_empty() {
            return Ok(Statement {
                sql: format!("INSERT INTO {table} DEFAULT VALUES;"),
                columns,
            });
        }
        let names = self.column_list(&columns);
        let params = (0..columns.len())
            .map(|i| self.dialect.parameter(&param_name(i)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Statement {
            sql: format!("INSERT INTO {table} ({names}) VALUES ({params});"),
            columns,
        })
    }

    pub fn update_for(&self, meta: &EntityMetadata) -> Result<Statement> {
        let key = meta.require_primary_key()?.clone();
        let mut columns: Vec<ColumnMapping> = meta
            .columns
            .iter()
            .filter(|c| !c.is_primary_key && !c.is_auto_generated)
            .cloned()
            .collect();
        if columns.is_empty() {
            return Err(SqliteError::mapping(
                &meta.entity_name,
                "no updatable columns besides the primary key",
            ));
        }
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "{} = {}",
                    self.quote(&c.column_name),
                    self.dialect.parameter(&param_name(i))
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let key_param = self.dialect.parameter(&param_name(columns.len()));
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {};",
            self.quote(&meta.table_name),
            assignments,
            self.quote(&key.column_name),
            key_param
        );
        columns.push(key);
        Ok(Statement { sql, columns })
    }

    pub fn delete_for(&self, meta: &EntityMetadata) -> Result<Statement> {
        let key = meta.require_primary_key()?.clone();
        let sql = format!(
            "DELETE FROM {} WHERE {} = {};",
            self.quote(&meta.table_name),
            self.quote(&key.column_name),
            self.dialect.parameter(&param_name(0))
        );
        Ok(Statement {
            sql,
            columns: vec![key],
        })
    }

    pub fn select_by_key_for(&self, meta: &EntityMetadata) -> Result<Statement> {
        let key = meta.require_primary_key()?.clone();
        let sql = format!(
            "{} WHERE {} = {};",
            self.select_prefix(meta),
            self.quote(&key.column_name),
            self.dialect.parameter(&param_name(0))
        );
        Ok(Statement {
            sql,
            columns: vec![key],
        })
    }

    pub fn select_all_for(&self, meta: &EntityMetadata) -> Result<Statement> {
        require_columns(meta)?;
        Ok(Statement {
            sql: format!("{};", self.select_prefix(meta)),
            columns: Vec::new(),
        })
    }

    pub fn count_for(&self, meta: &EntityMetadata) -> Statement {
        Statement {
            sql: format!("SELECT COUNT(*) FROM {};", self.quote(&meta.table_name)),
            columns: Vec::new(),
        }
    }

    /// `SELECT <all mapped columns> FROM <table>` without a terminator.
    pub(crate) fn select_prefix(&self, meta: &EntityMetadata) -> String {
        format!(
            "SELECT {} FROM {}",
            self.column_list(&meta.columns),
            self.quote(&meta.table_name)
        )
    }

    pub fn create_table_for(&self, meta: &EntityMetadata) -> Result<Statement> {
        require_columns(meta)?;
        let mut parts: Vec<String> = meta
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();
        parts.extend(meta.foreign_keys.iter().map(|fk| self.foreign_key_clause(fk)));
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            self.quote(&meta.table_name),
            parts.join(", ")
        );
        Ok(Statement {
            sql,
            columns: meta.columns.clone(),
        })
    }

    pub fn create_indexes_for(&self, meta: &EntityMetadata) -> Vec<Statement> {
        meta.indexes
            .iter()
            .map(|index| {
                let unique = if index.unique { "UNIQUE " } else { "" };
                let sql = format!(
                    "CREATE {}INDEX IF NOT EXISTS {} ON {} ({});",
                    unique,
                    self.quote(&index.effective_name(&meta.table_name)),
                    self.quote(&meta.table_name),
                    self.quote_all(&index.columns)
                );
                let columns = index
                    .columns
                    .iter()
                    .filter_map(|name| meta.column(name).cloned())
                    .collect();
                Statement { sql, columns }
            })
            .collect()
    }

    fn column_definition(&self, column: &ColumnMapping) -> String {
        let mut def = format!("{} {}", self.quote(&column.column_name), column_type(column));
        if column.is_primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if column.is_auto_generated {
            def.push_str(" AUTOINCREMENT");
        }
        if !column.is_nullable {
            def.push_str(" NOT NULL");
        }
        if column.is_unique {
            def.push_str(" UNIQUE");
        }
        if let Some(default) = &column.default_value {
            def.push_str(" DEFAULT ");
            def.push_str(&default_literal(default));
        }
        def
    }

    fn foreign_key_clause(&self, fk: &ForeignKeyMapping) -> String {
        let mut clause = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote(&fk.local_column),
            self.quote(&fk.referenced_table),
            self.quote(&fk.referenced_column)
        );
        if fk.on_delete != ForeignKeyAction::NoAction {
            clause.push_str(" ON DELETE ");
            clause.push_str(fk.on_delete.as_sql());
        }
        if fk.on_update != ForeignKeyAction::NoAction {
            clause.push_str(" ON UPDATE ");
            clause.push_str(fk.on_update.as_sql());
        }
        clause
    }

    pub(crate) fn quote(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    fn quote_all(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn column_list(&self, columns: &[ColumnMapping]) -> String {
        columns
            .iter()
            .map(|c| self.quote(&c.column_name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn require_columns(meta: &EntityMetadata) -> Result<()> {
    if meta.columns.is_empty() {
        return Err(SqliteError::mapping(&meta.entity_name, "no mapped columns"));
    }
    Ok(())
}

fn default_literal(value: &DefaultValue) -> String {
    match value {
        DefaultValue::Integer(i) => i.to_string(),
        DefaultValue::Real(f) => format!("{f:?}"),
        DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        DefaultValue::Null => "NULL".to_string(),
        DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
    }
}
