//! Entity metadata resolution.
//!
//! Turns an [`EntityDescriptor`] plus the configured [`NameTranslator`] into
//! table, column, key, foreign-key and index metadata. Results are cached per
//! type for the lifetime of the mapper.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use super::entity::{
    DefaultValue, Entity, EntityDescriptor, EntityRef, FieldDescriptor, FieldType,
    ForeignKeyAction,
};
use super::error::{Result, SqliteError};
use super::naming::NameTranslator;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    pub column_name: String,
    pub field_name: String,
    pub field_type: FieldType,
    pub is_primary_key: bool,
    pub is_auto_generated: bool,
    pub is_nullable: bool,
    pub is_unique: bool,
    pub is_indexed: bool,
    pub is_unique_index: bool,
    pub max_length: Option<u32>,
    pub default_value: Option<DefaultValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyMapping {
    pub local_column: String,
    pub referenced_type: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexMapping {
    /// Explicit name; `None` means derived from table and columns.
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexMapping {
    pub fn effective_name(&self, table: &str) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("ix_{}_{}", table, self.columns.join("_")),
        }
    }
}

/// Resolved mapping of one record type to one table.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMetadata {
    pub entity_name: String,
    pub table_name: String,
    pub columns: Vec<ColumnMapping>,
    pub foreign_keys: Vec<ForeignKeyMapping>,
    pub indexes: Vec<IndexMapping>,
    primary_key: Option<usize>,
}

impl EntityMetadata {
    pub fn primary_key(&self) -> Option<&ColumnMapping> {
        self.primary_key.map(|i| &self.columns[i])
    }

    pub fn require_primary_key(&self) -> Result<&ColumnMapping> {
        self.primary_key().ok_or_else(|| SqliteError::MissingPrimaryKey {
            entity: self.entity_name.clone(),
        })
    }

    /// Auto-generated primary key, if the engine assigns this type's keys.
    pub fn generated_key(&self) -> Option<&ColumnMapping> {
        self.primary_key().filter(|c| c.is_auto_generated)
    }

    pub fn column(&self, column_name: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.column_name == column_name)
    }

    pub fn column_for_field(&self, field_name: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.field_name == field_name)
    }
}

/// Resolves and caches [`EntityMetadata`] per record type.
#[derive(Debug)]
pub struct EntityMapper {
    translator: Arc<dyn NameTranslator>,
    cache: DashMap<TypeId, Arc<EntityMetadata>>,
}

impl EntityMapper {
    pub fn new(translator: Arc<dyn NameTranslator>) -> Self {
        Self {
            translator,
            cache: DashMap::new(),
        }
    }

    pub fn translator(&self) -> &dyn NameTranslator {
        self.translator.as_ref()
    }

    pub fn resolve<T: Entity>(&self) -> Result<Arc<EntityMetadata>> {
        self.resolve_ref(EntityRef::of::<T>())
    }

    pub fn resolve_ref(&self, entity: EntityRef) -> Result<Arc<EntityMetadata>> {
        if let Some(hit) = self.cache.get(&entity.type_id()) {
            return Ok(Arc::clone(hit.value()));
        }
        let metadata = Arc::new(self.resolve_descriptor(&entity.describe())?);
        tracing::debug!(
            entity = %metadata.entity_name,
            table = %metadata.table_name,
            columns = metadata.columns.len(),
            "Resolved entity metadata"
        );
        let cached = self
            .cache
            .entry(entity.type_id())
            .or_insert(metadata)
            .value()
            .clone();
        Ok(cached)
    }

    /// Resolve a descriptor without touching the cache.
    pub fn resolve_descriptor(&self, descriptor: &EntityDescriptor) -> Result<EntityMetadata> {
        let entity = descriptor.type_name.as_str();
        let table_name = self.table_name(descriptor)?;

        let mapped: Vec<&FieldDescriptor> =
            descriptor.fields.iter().filter(|f| !f.not_mapped).collect();
        if let Some(unnamed) = mapped.iter().find(|f| f.name.trim().is_empty()) {
            return Err(SqliteError::mapping(
                entity,
                format!("field of type {:?} has no name", unnamed.field_type),
            ));
        }

        let primary_key = find_primary_key(entity, &mapped)?;

        let mut columns = Vec::with_capacity(mapped.len());
        for (i, field) in mapped.iter().enumerate() {
            let is_primary_key = primary_key == Some(i);
            if field.auto_increment && !is_primary_key {
                return Err(SqliteError::mapping(
                    entity,
                    format!("field '{}' is auto-increment but not the primary key", field.name),
                ));
            }
            if field.auto_increment
                && !matches!(field.field_type, FieldType::Int32 | FieldType::Int64)
            {
                return Err(SqliteError::mapping(
                    entity,
                    format!("auto-increment key '{}' must be an integer", field.name),
                ));
            }
            let is_nullable = !is_primary_key
                && field
                    .nullable
                    .unwrap_or_else(|| field.field_type.is_reference_like());
            columns.push(ColumnMapping {
                column_name: self.column_name(field),
                field_name: field.name.clone(),
                field_type: field.field_type,
                is_primary_key,
                is_auto_generated: field.auto_increment,
                is_nullable,
                is_unique: field.unique,
                is_indexed: field.indexed,
                is_unique_index: field.unique_index,
                max_length: field.max_length,
                default_value: field.default_value.clone(),
            });
        }

        check_collisions(entity, &columns)?;

        let mut foreign_keys = Vec::new();
        for (field, column) in mapped.iter().zip(&columns) {
            let Some(reference) = &field.references else {
                continue;
            };
            let target = reference.target.describe();
            foreign_keys.push(ForeignKeyMapping {
                local_column: column.column_name.clone(),
                referenced_type: target.type_name.clone(),
                referenced_table: self.table_name(&target)?,
                referenced_column: self.referenced_column(&target, &reference.column),
                on_delete: reference.on_delete,
                on_update: reference.on_update,
            });
        }

        let mut indexes: Vec<IndexMapping> = columns
            .iter()
            .filter(|c| c.is_indexed)
            .map(|c| IndexMapping {
                name: None,
                columns: vec![c.column_name.clone()],
                unique: c.is_unique_index,
            })
            .collect();
        for declared in &descriptor.indexes {
            if declared.columns.is_empty() {
                return Err(SqliteError::mapping(entity, "index declares no columns"));
            }
            let columns = declared
                .columns
                .iter()
                .map(|name| {
                    columns
                        .iter()
                        .find(|c| c.field_name == *name)
                        .or_else(|| columns.iter().find(|c| c.column_name == *name))
                        .map(|c| c.column_name.clone())
                        .ok_or_else(|| {
                            SqliteError::mapping(
                                entity,
                                format!("index column '{name}' is not a mapped field"),
                            )
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            indexes.push(IndexMapping {
                name: declared.name.clone(),
                columns,
                unique: declared.unique,
            });
        }

        Ok(EntityMetadata {
            entity_name: entity.to_string(),
            table_name,
            columns,
            foreign_keys,
            indexes,
            primary_key,
        })
    }

    fn table_name(&self, descriptor: &EntityDescriptor) -> Result<String> {
        if let Some(explicit) = descriptor.table.as_deref().filter(|t| !t.trim().is_empty()) {
            return Ok(explicit.to_string());
        }
        if descriptor.type_name.trim().is_empty() {
            return Err(SqliteError::Mapping(
                "entity has neither a table name nor a type name".to_string(),
            ));
        }
        Ok(self.translator.to_database(&descriptor.type_name))
    }

    fn column_name(&self, field: &FieldDescriptor) -> String {
        match field.column.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(explicit) => explicit.to_string(),
            None => self.translator.to_database(&field.name),
        }
    }

    /// A reference may name the target field or its column; unknown names pass through.
    fn referenced_column(&self, target: &EntityDescriptor, name: &str) -> String {
        let fields = target.fields.iter().filter(|f| !f.not_mapped);
        for field in fields {
            let column = self.column_name(field);
            if field.name == name || column == name {
                return column;
            }
        }
        name.to_string()
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn find_primary_key(entity: &str, fields: &[&FieldDescriptor]) -> Result<Option<usize>> {
    let explicit: Vec<usize> = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.key)
        .map(|(i, _)| i)
        .collect();
    match explicit.as_slice() {
        [single] => return Ok(Some(*single)),
        [] => {}
        _ => {
            let names: Vec<&str> = explicit.iter().map(|&i| fields[i].name.as_str()).collect();
            return Err(SqliteError::mapping(
                entity,
                format!("multiple key fields declared: {}", names.join(", ")),
            ));
        }
    }
    let type_key = format!("{}id", normalize(entity));
    let by_convention = fields
        .iter()
        .position(|f| normalize(&f.name) == "id")
        .or_else(|| fields.iter().position(|f| normalize(&f.name) == type_key));
    Ok(by_convention)
}

fn check_collisions(entity: &str, columns: &[ColumnMapping]) -> Result<()> {
    let mut groups: Vec<(String, Vec<&str>)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    for column in columns {
        let key = column.column_name.to_lowercase();
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push((column.column_name.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(column.field_name.as_str());
    }
    let collisions: Vec<String> = groups
        .iter()
        .filter(|(_, fields)| fields.len() > 1)
        .map(|(column, fields)| format!("{} -> '{}'", fields.join(", "), column))
        .collect();
    if collisions.is_empty() {
        Ok(())
    } else {
        Err(SqliteError::mapping(
            entity,
            format!("fields map to the same column: {}", collisions.join("; ")),
        ))
    }
}
