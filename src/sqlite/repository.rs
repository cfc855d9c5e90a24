//! CRUD and query execution for one record type inside a unit of work.

use std::marker::PhantomData;
use std::sync::Arc;

use rusqlite::types::ToSql;
use rusqlite::{Connection, Row};

use super::builder::{param_name, SqlBuilder, Statement};
use super::entity::Entity;
use super::error::{from_rusqlite, Result, SqliteError};
use super::mapper::EntityMetadata;
use super::query::Query;
use super::unit_of_work::UnitOfWork;
use super::value::{convert, Value};

/// Repository for `T`, borrowing (never owning) its unit of work.
pub struct Repository<'a, T: Entity> {
    uow: &'a UnitOfWork,
    builder: SqlBuilder,
    meta: Arc<EntityMetadata>,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T: Entity> Repository<'a, T> {
    pub fn new(uow: &'a UnitOfWork, builder: SqlBuilder) -> Result<Self> {
        let meta = builder.mapper().resolve::<T>()?;
        Ok(Self {
            uow,
            builder,
            meta,
            _record: PhantomData,
        })
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.meta
    }

    /// Insert `record`. With an auto-generated key, the new key is written
    /// back onto the record and returned; otherwise returns 0.
    pub async fn insert(&self, record: &mut T) -> Result<i64> {
        let stmt = self.builder.insert_for(&self.meta)?;
        let params = self.bind_record(&stmt, record)?;
        let generated_key = self.meta.generated_key();
        let key_sql = self.builder.dialect().last_insert_id_sql();

        let key = self
            .uow
            .run(|conn| {
                execute(conn, &stmt.sql, &params)?;
                match generated_key {
                    Some(_) => conn
                        .query_row(key_sql, [], |row| row.get::<_, i64>(0))
                        .map_err(from_rusqlite),
                    None => Ok(0),
                }
            })
            .await?;

        if let Some(column) = generated_key {
            record
                .write_field(&column.field_name, Value::Integer(key))
                .map_err(|e| with_column(e, &column.column_name))?;
            tracing::debug!(entity = %self.meta.entity_name, key, "Inserted record");
        }
        Ok(key)
    }

    pub async fn update(&self, record: &T) -> Result<usize> {
        let stmt = self.builder.update_for(&self.meta)?;
        let params = self.bind_record(&stmt, record)?;
        self.uow.run(|conn| execute(conn, &stmt.sql, &params)).await
    }

    pub async fn delete(&self, key: impl Into<Value>) -> Result<usize> {
        let stmt = self.builder.delete_for(&self.meta)?;
        let params = vec![(self.placeholder(0), key.into())];
        self.uow.run(|conn| execute(conn, &stmt.sql, &params)).await
    }

    /// `Ok(None)` when no row carries `key`.
    pub async fn find_by_key(&self, key: impl Into<Value>) -> Result<Option<T>> {
        let stmt = self.builder.select_by_key_for(&self.meta)?;
        let params = vec![(self.placeholder(0), key.into())];
        let mut found = self
            .uow
            .run(|conn| select::<T>(conn, &self.meta, &stmt.sql, &params))
            .await?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    pub async fn find_all(&self) -> Result<Vec<T>> {
        let stmt = self.builder.select_all_for(&self.meta)?;
        self.uow
            .run(|conn| select::<T>(conn, &self.meta, &stmt.sql, &[]))
            .await
    }

    pub async fn query(&self, query: &Query) -> Result<Vec<T>> {
        let rendered = query.render(
            &self.meta,
            self.builder.mapper().translator(),
            self.builder.dialect(),
        )?;
        let sql = format!(
            "{}{};",
            self.builder.select_prefix(&self.meta),
            rendered.clause
        );
        let params: Vec<(String, Value)> = rendered
            .params
            .into_iter()
            .map(|(name, value)| (self.builder.dialect().parameter(&name), value))
            .collect();
        self.uow
            .run(|conn| select::<T>(conn, &self.meta, &sql, &params))
            .await
    }

    pub async fn count(&self) -> Result<i64> {
        let stmt = self.builder.count_for(&self.meta);
        self.uow
            .run(|conn| {
                tracing::debug!(sql = %stmt.sql, "Executing query");
                conn.query_row(&stmt.sql, [], |row| row.get::<_, i64>(0))
                    .map_err(from_rusqlite)
            })
            .await
    }

    fn placeholder(&self, index: usize) -> String {
        self.builder.dialect().parameter(&param_name(index))
    }

    fn bind_record(&self, stmt: &Statement, record: &T) -> Result<Vec<(String, Value)>> {
        stmt.columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = record.read_field(&column.field_name).ok_or_else(|| {
                    SqliteError::mapping(
                        &self.meta.entity_name,
                        format!("field '{}' is not readable", column.field_name),
                    )
                })?;
                Ok((self.placeholder(i), value))
            })
            .collect()
    }
}

fn named(params: &[(String, Value)]) -> Vec<(&str, &dyn ToSql)> {
    params
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}

fn execute(conn: &Connection, sql: &str, params: &[(String, Value)]) -> Result<usize> {
    tracing::debug!(sql = %sql, params = params.len(), "Executing statement");
    let mut stmt = conn.prepare_cached(sql).map_err(from_rusqlite)?;
    stmt.execute(named(params).as_slice()).map_err(from_rusqlite)
}

fn select<T: Entity>(
    conn: &Connection,
    meta: &EntityMetadata,
    sql: &str,
    params: &[(String, Value)],
) -> Result<Vec<T>> {
    tracing::debug!(sql = %sql, params = params.len(), "Executing query");
    let mut stmt = conn.prepare_cached(sql).map_err(from_rusqlite)?;
    let mut rows = stmt.query(named(params).as_slice()).map_err(from_rusqlite)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(from_rusqlite)? {
        records.push(materialize::<T>(meta, row)?);
    }
    Ok(records)
}

/// Build a record from a row whose columns follow `meta.columns` order.
fn materialize<T: Entity>(meta: &EntityMetadata, row: &Row<'_>) -> Result<T> {
    let mut record = T::default();
    for (i, column) in meta.columns.iter().enumerate() {
        let raw = Value::from_sql_ref(&column.column_name, row.get_ref(i).map_err(from_rusqlite)?)?;
        let value = convert(&column.column_name, raw, column.field_type)?;
        record
            .write_field(&column.field_name, value)
            .map_err(|e| with_column(e, &column.column_name))?;
    }
    Ok(record)
}

fn with_column(err: SqliteError, column_name: &str) -> SqliteError {
    match err {
        SqliteError::Conversion { column, message } if column.is_empty() => {
            SqliteError::conversion(column_name, message)
        }
        other => other,
    }
}
