#![allow(dead_code)]

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_sqlite_mapper::sqlite::{
    Entity, EntityDescriptor, EntityRef, FieldDescriptor, FieldType, ForeignKeyAction, Result,
    SqliteConfig, SqliteStore, Value,
};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

impl Person {
    pub fn new(first: &str, last: &str, email: Option<&str>) -> Self {
        Self {
            id: 0,
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.map(str::to_string),
        }
    }
}

impl Entity for Person {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("Person")
            .field(FieldDescriptor::new("Id", FieldType::Int64).key().auto_increment())
            .field(FieldDescriptor::new("FirstName", FieldType::Text).required().max_length(100))
            .field(FieldDescriptor::new("LastName", FieldType::Text).required())
            .field(FieldDescriptor::new("Email", FieldType::Text).unique())
    }

    fn read_field(&self, field: &str) -> Option<Value> {
        Some(match field {
            "Id" => self.id.into(),
            "FirstName" => self.first_name.clone().into(),
            "LastName" => self.last_name.clone().into(),
            "Email" => self.email.clone().into(),
            _ => return None,
        })
    }

    fn write_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "Id" => self.id = value.decode()?,
            "FirstName" => self.first_name = value.decode()?,
            "LastName" => self.last_name = value.decode()?,
            "Email" => self.email = value.decode()?,
            _ => {}
        }
        Ok(())
    }
}

/// Table name comes from the type name, so this lands in `"order"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Order {
    pub id: i64,
    pub person_id: i64,
    pub total: Decimal,
    pub note: Option<String>,
}

impl Order {
    pub fn new(person_id: i64, total: &str) -> Self {
        Self {
            id: 0,
            person_id,
            total: total.parse().expect("valid decimal literal"),
            note: None,
        }
    }
}

impl Entity for Order {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("Order")
            .field(FieldDescriptor::new("Id", FieldType::Int64).key().auto_increment())
            .field(
                FieldDescriptor::new("PersonId", FieldType::Int64)
                    .references::<Person>("Id", ForeignKeyAction::Cascade)
                    .indexed(),
            )
            .field(FieldDescriptor::new("Total", FieldType::Decimal))
            .field(FieldDescriptor::new("Note", FieldType::Text))
    }

    fn read_field(&self, field: &str) -> Option<Value> {
        Some(match field {
            "Id" => self.id.into(),
            "PersonId" => self.person_id.into(),
            "Total" => self.total.into(),
            "Note" => self.note.clone().into(),
            _ => return None,
        })
    }

    fn write_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "Id" => self.id = value.decode()?,
            "PersonId" => self.person_id = value.decode()?,
            "Total" => self.total = value.decode()?,
            "Note" => self.note = value.decode()?,
            _ => {}
        }
        Ok(())
    }
}

/// One field per supported field type, plus nullable variants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    pub id: i64,
    pub name: String,
    pub nickname: Option<String>,
    pub small: i32,
    pub maybe_small: Option<i32>,
    pub big: i64,
    pub flag: bool,
    pub ratio: f64,
    pub ratio32: f32,
    pub price: Decimal,
    pub maybe_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub seen_at: Option<DateTime<Utc>>,
    pub payload: Vec<u8>,
}

impl Entity for Sample {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("Sample")
            .table("samples")
            .field(FieldDescriptor::new("id", FieldType::Int64).auto_increment())
            .field(FieldDescriptor::new("name", FieldType::Text).required())
            .field(FieldDescriptor::new("nickname", FieldType::Text))
            .field(FieldDescriptor::new("small", FieldType::Int32))
            .field(FieldDescriptor::new("maybe_small", FieldType::Int32).nullable())
            .field(FieldDescriptor::new("big", FieldType::Int64))
            .field(FieldDescriptor::new("flag", FieldType::Bool))
            .field(FieldDescriptor::new("ratio", FieldType::Double))
            .field(FieldDescriptor::new("ratio32", FieldType::Float))
            .field(FieldDescriptor::new("price", FieldType::Decimal))
            .field(FieldDescriptor::new("maybe_price", FieldType::Decimal).nullable())
            .field(FieldDescriptor::new("created_at", FieldType::DateTime))
            .field(FieldDescriptor::new("seen_at", FieldType::DateTime).nullable())
            .field(FieldDescriptor::new("payload", FieldType::Blob))
            .index(None, ["name", "created_at"], false)
    }

    fn read_field(&self, field: &str) -> Option<Value> {
        Some(match field {
            "id" => self.id.into(),
            "name" => self.name.clone().into(),
            "nickname" => self.nickname.clone().into(),
            "small" => self.small.into(),
            "maybe_small" => self.maybe_small.into(),
            "big" => self.big.into(),
            "flag" => self.flag.into(),
            "ratio" => self.ratio.into(),
            "ratio32" => self.ratio32.into(),
            "price" => self.price.into(),
            "maybe_price" => self.maybe_price.into(),
            "created_at" => self.created_at.into(),
            "seen_at" => self.seen_at.into(),
            "payload" => self.payload.clone().into(),
            _ => return None,
        })
    }

    fn write_field(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "id" => self.id = value.decode()?,
            "name" => self.name = value.decode()?,
            "nickname" => self.nickname = value.decode()?,
            "small" => self.small = value.decode()?,
            "maybe_small" => self.maybe_small = value.decode()?,
            "big" => self.big = value.decode()?,
            "flag" => self.flag = value.decode()?,
            "ratio" => self.ratio = value.decode()?,
            "ratio32" => self.ratio32 = value.decode()?,
            "price" => self.price = value.decode()?,
            "maybe_price" => self.maybe_price = value.decode()?,
            "created_at" => self.created_at = value.decode()?,
            "seen_at" => self.seen_at = value.decode()?,
            "payload" => self.payload = value.decode()?,
            _ => {}
        }
        Ok(())
    }
}

/// Keyless entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditNote {
    pub message: String,
}

impl Entity for AuditNote {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("AuditNote").field(FieldDescriptor::new("Message", FieldType::Text))
    }

    fn read_field(&self, field: &str) -> Option<Value> {
        match field {
            "Message" => Some(self.message.clone().into()),
            _ => None,
        }
    }

    fn write_field(&mut self, field: &str, value: Value) -> Result<()> {
        if field == "Message" {
            self.message = value.decode()?;
        }
        Ok(())
    }
}

pub fn all_types() -> Vec<EntityRef> {
    vec![
        EntityRef::of::<Person>(),
        EntityRef::of::<Order>(),
        EntityRef::of::<Sample>(),
        EntityRef::of::<AuditNote>(),
    ]
}

/// A store over a fresh temporary database file. Keep the file alive for the test.
pub fn temp_store() -> (SqliteStore, NamedTempFile) {
    let file = NamedTempFile::new().unwrap();
    let config = SqliteConfig::new(file.path().to_string_lossy());
    (SqliteStore::new(config), file)
}

pub async fn bootstrapped_store() -> anyhow::Result<(SqliteStore, NamedTempFile)> {
    let (store, file) = temp_store();
    store.bootstrap(&all_types()).await?;
    Ok((store, file))
}
