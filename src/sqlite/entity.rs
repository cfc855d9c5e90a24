//! Declarative per-type metadata.
//!
//! A record type registers its shape by implementing [`Entity`]. The
//! descriptor plays the role of the annotations; [`EntityMapper`] turns it
//! into resolved table metadata.
//!
//! [`EntityMapper`]: super::mapper::EntityMapper

use std::any::TypeId;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::Result;
use super::value::Value;

/// Field types understood by the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Int32,
    Int64,
    Bool,
    Double,
    Float,
    Decimal,
    DateTime,
    Blob,
}

impl FieldType {
    /// Reference-like types default to nullable when nullability is not declared.
    pub fn is_reference_like(self) -> bool {
        matches!(self, FieldType::Text | FieldType::Blob)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Text(String),
    Real(f64),
    Null,
    CurrentTimestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

impl ForeignKeyAction {
    pub fn as_sql(self) -> &'static str {
        match self {
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
            ForeignKeyAction::Restrict => "RESTRICT",
        }
    }
}

/// Handle to another entity type, used for foreign-key targets and bootstrap lists.
#[derive(Clone, Copy)]
pub struct EntityRef {
    type_id: TypeId,
    describe: fn() -> EntityDescriptor,
}

impl EntityRef {
    pub fn of<T: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            describe: T::describe,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn describe(&self) -> EntityDescriptor {
        (self.describe)()
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRef").field(&self.describe().type_name).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Reference {
    pub target: EntityRef,
    pub column: String,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
}

/// Declaration of a single record field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub column: Option<String>,
    pub key: bool,
    pub auto_increment: bool,
    pub nullable: Option<bool>,
    pub unique: bool,
    pub indexed: bool,
    pub unique_index: bool,
    pub max_length: Option<u32>,
    pub default_value: Option<DefaultValue>,
    pub references: Option<Reference>,
    pub on_update: ForeignKeyAction,
    pub not_mapped: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            column: None,
            key: false,
            auto_increment: false,
            nullable: None,
            unique: false,
            indexed: false,
            unique_index: false,
            max_length: None,
            default_value: None,
            references: None,
            on_update: ForeignKeyAction::NoAction,
            not_mapped: false,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = Some(true);
        self
    }

    pub fn required(mut self) -> Self {
        self.nullable = Some(false);
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn unique_index(mut self) -> Self {
        self.indexed = true;
        self.unique_index = true;
        self
    }

    pub fn max_length(mut self, len: u32) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn default_value(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Declare a foreign key to `T`'s `column` with the given `ON DELETE` action.
    pub fn references<T: Entity>(
        mut self,
        column: impl Into<String>,
        on_delete: ForeignKeyAction,
    ) -> Self {
        self.references = Some(Reference {
            target: EntityRef::of::<T>(),
            column: column.into(),
            on_delete,
            on_update: self.on_update,
        });
        self
    }

    /// `ON UPDATE` action for the field's reference, before or after `references`.
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        if let Some(reference) = self.references.as_mut() {
            reference.on_update = action;
        }
        self
    }

    pub fn not_mapped(mut self) -> Self {
        self.not_mapped = true;
        self
    }
}

/// Type-level (possibly composite) index declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDescriptor {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub type_name: String,
    pub table: Option<String>,
    pub fields: Vec<FieldDescriptor>,
    pub indexes: Vec<IndexDescriptor>,
}

impl EntityDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            table: None,
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn index<I, S>(mut self, name: Option<&str>, columns: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes.push(IndexDescriptor {
            name: name.map(str::to_string),
            columns: columns.into_iter().map(Into::into).collect(),
            unique,
        });
        self
    }
}

/// A record type mapped to a table.
///
/// Field access is keyed by the declared field name from [`Entity::describe`].
pub trait Entity: Default + Send + Sync + 'static {
    fn describe() -> EntityDescriptor;

    /// Current value of a declared field, or `None` if the name is not a field.
    fn read_field(&self, field: &str) -> Option<Value>;

    /// Store a converted value into a declared field. Unknown names are ignored.
    fn write_field(&mut self, field: &str, value: Value) -> Result<()>;
}
