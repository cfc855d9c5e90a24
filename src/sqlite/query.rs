//! Minimal filter/sort query model.
//!
//! Conditions are AND-combined in declaration order. Column tokens are
//! resolved against entity metadata only when the query is executed.

use super::dialect::Dialect;
use super::error::{Result, SqliteError};
use super::mapper::{ColumnMapping, EntityMetadata};
use super::naming::NameTranslator;
use super::value::Value;

/// Query operators for building filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    column: String,
    operator: Operator,
    value: Value,
}

impl Condition {
    /// Build a condition. NULL is only meaningful with [`Operator::Eq`].
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Result<Self> {
        let column = column.into();
        let value = value.into();
        if value.is_null() && operator != Operator::Eq {
            return Err(SqliteError::InvalidArgument(format!(
                "operator '{}' cannot compare column '{}' against NULL",
                operator.as_sql(),
                column
            )));
        }
        Ok(Self {
            column,
            operator,
            value,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// Query builder for composable, immutable queries
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Query {
    conditions: Vec<Condition>,
    order_by: Option<OrderBy>,
    limit: Option<u32>,
    offset: Option<u32>,
}

/// WHERE/ORDER BY/LIMIT tail of a select plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub clause: String,
    pub params: Vec<(String, Value)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    fn push(self, column: &str, operator: Operator, value: Value) -> Result<Self> {
        Ok(self.with_condition(Condition::new(column, operator, value)?))
    }

    /// Equality; a NULL value matches rows where the column IS NULL.
    pub fn where_equals(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            column: column.to_string(),
            operator: Operator::Eq,
            value: value.into(),
        });
        self
    }

    pub fn where_greater(self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.push(column, Operator::Gt, value.into())
    }

    pub fn where_greater_or_equals(self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.push(column, Operator::Ge, value.into())
    }

    pub fn where_less(self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.push(column, Operator::Lt, value.into())
    }

    pub fn where_less_or_equals(self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.push(column, Operator::Le, value.into())
    }

    pub fn and_equals(self, column: &str, value: impl Into<Value>) -> Self {
        self.where_equals(column, value)
    }

    pub fn and_greater(self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.where_greater(column, value)
    }

    pub fn and_greater_or_equals(self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.where_greater_or_equals(column, value)
    }

    pub fn and_less(self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.where_less(column, value)
    }

    pub fn and_less_or_equals(self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.where_less_or_equals(column, value)
    }

    /// Set the sort key. Only one is kept; the last call wins.
    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            column: column.to_string(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn sort(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    /// Resolve every column token and render the clause tail.
    pub fn render(
        &self,
        meta: &EntityMetadata,
        translator: &dyn NameTranslator,
        dialect: &dyn Dialect,
    ) -> Result<RenderedQuery> {
        let mut predicates = Vec::with_capacity(self.conditions.len());
        let mut params = Vec::new();
        for condition in &self.conditions {
            let column = resolve_column(meta, translator, &condition.column)?;
            let quoted = dialect.quote_identifier(&column.column_name);
            if condition.value.is_null() {
                if condition.operator != Operator::Eq {
                    return Err(SqliteError::InvalidArgument(format!(
                        "operator '{}' cannot compare column '{}' against NULL",
                        condition.operator.as_sql(),
                        condition.column
                    )));
                }
                predicates.push(format!("{quoted} IS NULL"));
                continue;
            }
            let name = format!("param{}", params.len());
            predicates.push(format!(
                "{} {} {}",
                quoted,
                condition.operator.as_sql(),
                dialect.parameter(&name)
            ));
            params.push((name, condition.value.clone()));
        }

        let mut clause = String::new();
        if !predicates.is_empty() {
            clause.push_str(" WHERE ");
            clause.push_str(&predicates.join(" AND "));
        }
        if let Some(order) = &self.order_by {
            let column = resolve_column(meta, translator, &order.column)?;
            clause.push_str(&format!(
                " ORDER BY {} {}",
                dialect.quote_identifier(&column.column_name),
                if order.descending { "DESC" } else { "ASC" }
            ));
        }
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => clause.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => clause.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => clause.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }
        Ok(RenderedQuery { clause, params })
    }
}

/// Map a caller token to a column: database name, then declared field name,
/// then the translated token against database names.
pub fn resolve_column<'m>(
    meta: &'m EntityMetadata,
    translator: &dyn NameTranslator,
    token: &str,
) -> Result<&'m ColumnMapping> {
    // Precedence is kept even when a translated token shadows another column.
    meta.column(token)
        .or_else(|| meta.column_for_field(token))
        .or_else(|| meta.column(&translator.to_database(token)))
        .ok_or_else(|| SqliteError::UnknownColumn {
            column: token.to_string(),
            entity: meta.entity_name.clone(),
        })
}
