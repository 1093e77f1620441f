//! Objects: keyed instances of a class.

use super::{Class, PrimaryKey};
use crate::error::{CoreError, CoreResult};
use std::sync::Arc;
use tessera_data::{Timestamp, Value};

/// One instance of a [`Class`].
///
/// Holds its primary key and one value per non-key field, all null until
/// set. Key fields can be read by name but not changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    class: Arc<Class>,
    key: PrimaryKey,
    values: Vec<Value>,
}

impl Object {
    /// Creates an object with every non-key field null.
    ///
    /// # Errors
    ///
    /// Returns `KeyMismatch` if `key` does not fit the class.
    pub fn new(class: Arc<Class>, key: PrimaryKey) -> CoreResult<Self> {
        class.check_key(&key)?;
        let values = vec![Value::Null; class.fields().len()];
        Ok(Self { class, key, values })
    }

    /// Returns the class.
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Returns the primary key.
    pub fn key(&self) -> &PrimaryKey {
        &self.key
    }

    /// Returns the non-key values in field order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns a field value by name. Key fields are readable too.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` for an unknown name.
    pub fn get(&self, name: &str) -> CoreResult<&Value> {
        if let Some(value) = self.key.get(name) {
            return Ok(value);
        }
        let index = self.class.field_index(name)?;
        Ok(&self.values[index])
    }

    /// Sets a non-key field by name.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` for a key field
    /// - `FieldNotFound` for an unknown name
    /// - a data error if the value has the wrong type
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> CoreResult<()> {
        if self.class.is_key_field(name) {
            return Err(CoreError::invalid_operation(format!(
                "key field {name} of class {} is read-only",
                self.class.name()
            )));
        }
        let index = self.class.field_index(name)?;
        self.set_at(index, value)
    }

    /// Returns the non-key value at `index`.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` if the index is past the last field.
    pub fn value_at(&self, index: usize) -> CoreResult<&Value> {
        self.values
            .get(index)
            .ok_or_else(|| self.class.missing(&format!("#{index}")))
    }

    /// Sets the non-key value at `index`.
    ///
    /// # Errors
    ///
    /// - `FieldNotFound` if the index is past the last field
    /// - a data error if the value has the wrong type
    pub fn set_at(&mut self, index: usize, value: impl Into<Value>) -> CoreResult<()> {
        let def = self
            .class
            .fields()
            .get(index)
            .ok_or_else(|| self.class.missing(&format!("#{index}")))?;
        let value = value.into();
        value.check_type(def.data_type)?;
        self.values[index] = value;
        Ok(())
    }

    /// Reads a field as a boolean.
    pub fn get_bool(&self, name: &str) -> CoreResult<bool> {
        Ok(self.get(name)?.as_bool()?)
    }

    /// Reads a field as an integer.
    pub fn get_integer(&self, name: &str) -> CoreResult<i64> {
        Ok(self.get(name)?.as_integer()?)
    }

    /// Reads a field as a float.
    pub fn get_float(&self, name: &str) -> CoreResult<f64> {
        Ok(self.get(name)?.as_float()?)
    }

    /// Reads a field as text.
    pub fn get_text(&self, name: &str) -> CoreResult<&str> {
        Ok(self.get(name)?.as_text()?)
    }

    /// Reads a field as a date.
    pub fn get_date(&self, name: &str) -> CoreResult<Timestamp> {
        Ok(self.get(name)?.as_date()?)
    }

    /// Reads a field as bytes.
    pub fn get_blob(&self, name: &str) -> CoreResult<&[u8]> {
        Ok(self.get(name)?.as_blob()?)
    }
}
