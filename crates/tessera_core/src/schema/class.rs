//! Classes: key shape plus ordered fields.

use super::PrimaryKey;
use crate::error::{CoreError, CoreResult};
use std::collections::HashSet;
use std::sync::Arc;
use tessera_data::DataType;

/// A named, typed field of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field type.
    pub data_type: DataType,
}

/// Schema of cached objects.
///
/// Build with [`Class::builder`]:
///
/// ```rust,ignore
/// let person = Class::builder("person")
///     .key("id", DataType::Integer)
///     .field("name", DataType::Text)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    name: String,
    key: Vec<FieldDef>,
    fields: Vec<FieldDef>,
}

impl Class {
    /// Starts building a class.
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            key: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Returns the class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the key fields.
    pub fn key_fields(&self) -> &[FieldDef] {
        &self.key
    }

    /// Returns the non-key fields.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Returns the position of a non-key field.
    ///
    /// # Errors
    ///
    /// Returns `FieldNotFound` if the class has no such non-key field.
    pub fn field_index(&self, name: &str) -> CoreResult<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| self.missing(name))
    }

    /// Returns true if `name` is a key field.
    pub fn is_key_field(&self, name: &str) -> bool {
        self.key.iter().any(|f| f.name == name)
    }

    /// Checks that `key` has this class's key shape.
    ///
    /// # Errors
    ///
    /// Returns `KeyMismatch` on wrong arity, names, types, or a null value.
    pub fn check_key(&self, key: &PrimaryKey) -> CoreResult<()> {
        if key.len() != self.key.len() {
            return Err(CoreError::key_mismatch(format!(
                "class {} expects {} key fields, got {}",
                self.name,
                self.key.len(),
                key.len()
            )));
        }
        for (def, (name, value)) in self.key.iter().zip(key.fields()) {
            if def.name != *name {
                return Err(CoreError::key_mismatch(format!(
                    "class {} expects key field {}, got {}",
                    self.name, def.name, name
                )));
            }
            match value.data_type() {
                None => {
                    return Err(CoreError::key_mismatch(format!(
                        "key field {name} is null"
                    )))
                }
                Some(ty) if ty != def.data_type => {
                    return Err(CoreError::key_mismatch(format!(
                        "key field {name} expects {}, got {ty}",
                        def.data_type
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub(crate) fn missing(&self, name: &str) -> CoreError {
        CoreError::FieldNotFound {
            class: self.name.clone(),
            name: name.to_string(),
        }
    }
}

/// Builder for [`Class`].
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    name: String,
    key: Vec<FieldDef>,
    fields: Vec<FieldDef>,
}

impl ClassBuilder {
    /// Appends a key field.
    #[must_use]
    pub fn key(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.key.push(FieldDef {
            name: name.into(),
            data_type,
        });
        self
    }

    /// Appends a non-key field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            data_type,
        });
        self
    }

    /// Finishes the class.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if the class has no key field
    /// - `DuplicateName` if two fields share a name
    pub fn build(self) -> CoreResult<Arc<Class>> {
        if self.key.is_empty() {
            return Err(CoreError::invalid_operation(format!(
                "class {} has no key field",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for def in self.key.iter().chain(&self.fields) {
            if !seen.insert(def.name.as_str()) {
                return Err(CoreError::duplicate("field", def.name.clone()));
            }
        }
        Ok(Arc::new(Class {
            name: self.name,
            key: self.key,
            fields: self.fields,
        }))
    }
}
