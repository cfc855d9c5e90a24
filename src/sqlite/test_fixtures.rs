use rust_decimal::Decimal;

use super::entity::{Entity, EntityDescriptor, FieldDescriptor, FieldType, ForeignKeyAction};
use super::error::Result;
use super::value::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
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

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Order {
    pub id: i64,
    pub person_id: i64,
    pub total: Decimal,
    pub note: Option<String>,
}

impl Entity for Order {
    fn describe() -> EntityDescriptor {
        EntityDescriptor::new("Order")
            .table("orders")
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
