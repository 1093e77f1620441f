//! Primary keys.

use std::fmt;
use tessera_data::Value;

/// Ordered, named key values identifying one object.
///
/// Equality and hashing are structural, so a key built from the same
/// values always finds the same cached object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimaryKey {
    fields: Vec<(String, Value)>,
}

impl PrimaryKey {
    /// Creates an empty key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key field.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Appends a key field in place.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Returns the number of key fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the key has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the value of a key field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Returns the key fields in order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Returns the key values in order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str(")")
    }
}
