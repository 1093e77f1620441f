//! Dynamic field value type.

use crate::error::{DataError, DataResult};
use crate::types::{DataType, Timestamp};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A dynamically typed field value.
///
/// This is the closed set of values that binders, keys and object fields
/// carry. Any value may be [`Value::Null`]; the typed accessors refuse to
/// read a null or a value of another type.
///
/// Equality, hashing and ordering are total: floats compare by
/// [`f64::total_cmp`], so a `Value` can be used as a map key.
#[derive(Debug, Clone, Default, Serialize)]
pub enum Value {
    /// Null value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Double precision float.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Date with second resolution.
    Date(Timestamp),
    /// Byte string.
    Blob(Vec<u8>),
}

impl Value {
    /// Returns the type of this value, or `None` for null.
    #[must_use]
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Bool),
            Value::Integer(_) => Some(DataType::Integer),
            Value::Float(_) => Some(DataType::Float),
            Value::Text(_) => Some(DataType::Text),
            Value::Date(_) => Some(DataType::Date),
            Value::Blob(_) => Some(DataType::Blob),
        }
    }

    /// Check if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value may be stored in a slot of type `ty`.
    ///
    /// Null conforms to every type.
    #[must_use]
    pub fn conforms_to(&self, ty: DataType) -> bool {
        self.data_type().map_or(true, |own| own == ty)
    }

    /// Checks that this value may be stored in a slot of type `ty`.
    pub fn check_type(&self, ty: DataType) -> DataResult<()> {
        match self.data_type() {
            Some(own) if own != ty => Err(DataError::type_mismatch(ty, own)),
            _ => Ok(()),
        }
    }

    /// Reads this value as a boolean.
    pub fn as_bool(&self) -> DataResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.access_error(DataType::Bool)),
        }
    }

    /// Reads this value as an integer.
    pub fn as_integer(&self) -> DataResult<i64> {
        match self {
            Value::Integer(n) => Ok(*n),
            other => Err(other.access_error(DataType::Integer)),
        }
    }

    /// Reads this value as a 32-bit integer.
    pub fn as_i32(&self) -> DataResult<i32> {
        let n = self.as_integer()?;
        i32::try_from(n).map_err(|_| DataError::out_of_range("i32", n))
    }

    /// Reads this value as a float.
    pub fn as_float(&self) -> DataResult<f64> {
        match self {
            Value::Float(x) => Ok(*x),
            other => Err(other.access_error(DataType::Float)),
        }
    }

    /// Reads this value as text.
    pub fn as_text(&self) -> DataResult<&str> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(other.access_error(DataType::Text)),
        }
    }

    /// Reads this value as a date.
    pub fn as_date(&self) -> DataResult<Timestamp> {
        match self {
            Value::Date(ts) => Ok(*ts),
            other => Err(other.access_error(DataType::Date)),
        }
    }

    /// Reads this value as bytes.
    pub fn as_blob(&self) -> DataResult<&[u8]> {
        match self {
            Value::Blob(b) => Ok(b),
            other => Err(other.access_error(DataType::Blob)),
        }
    }

    fn access_error(&self, expected: DataType) -> DataError {
        match self.data_type() {
            None => DataError::null_value(expected),
            Some(found) => DataError::type_mismatch(expected, found),
        }
    }

    // Nulls first, then by type tag.
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) => 2,
            Value::Float(_) => 3,
            Value::Text(_) => 4,
            Value::Date(_) => 5,
            Value::Blob(_) => 6,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Integer(n) => n.hash(state),
            Value::Float(x) => x.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Date(ts) => ts.hash(state),
            Value::Blob(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Date(ts) => write!(f, "{ts}"),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::Date(ts)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Blob(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Blob(b.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn typed_accessors() {
        assert_eq!(Value::Bool(true).as_bool(), Ok(true));
        assert_eq!(Value::Integer(42).as_integer(), Ok(42));
        assert_eq!(Value::Float(1.5).as_float(), Ok(1.5));
        assert_eq!(Value::from("hello").as_text(), Ok("hello"));
        assert_eq!(
            Value::Date(Timestamp::from_secs(7)).as_date(),
            Ok(Timestamp::from_secs(7))
        );
        assert_eq!(Value::Blob(vec![1, 2, 3]).as_blob(), Ok(&[1, 2, 3][..]));
    }

    #[test]
    fn wrong_type_is_a_mismatch() {
        let err = Value::from("42").as_integer().unwrap_err();
        assert_eq!(
            err,
            DataError::type_mismatch(DataType::Integer, DataType::Text)
        );
    }

    #[test]
    fn null_read_is_rejected() {
        let err = Value::Null.as_text().unwrap_err();
        assert_eq!(err, DataError::null_value(DataType::Text));
    }

    #[test]
    fn i32_out_of_range() {
        let err = Value::Integer(i64::MAX).as_i32().unwrap_err();
        assert!(matches!(err, DataError::OutOfRange { target: "i32", .. }));
        assert_eq!(Value::Integer(-5).as_i32(), Ok(-5));
    }

    #[test]
    fn null_conforms_to_any_type() {
        assert!(Value::Null.conforms_to(DataType::Blob));
        assert!(Value::Integer(1).conforms_to(DataType::Integer));
        assert!(!Value::Integer(1).conforms_to(DataType::Text));
        assert!(Value::Integer(1).check_type(DataType::Float).is_err());
    }

    #[test]
    fn floats_are_usable_as_keys() {
        let mut set = HashSet::new();
        set.insert(Value::Float(0.5));
        set.insert(Value::Float(0.5));
        set.insert(Value::Float(f64::NAN));
        set.insert(Value::Float(f64::NAN));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn ordering_groups_by_type() {
        let mut values = vec![
            Value::from("b"),
            Value::Integer(3),
            Value::Null,
            Value::from("a"),
            Value::Integer(-1),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Integer(-1),
                Value::Integer(3),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i64), Value::Integer(42));
        assert_eq!(Value::from(42i32), Value::Integer(42));
        assert_eq!(Value::from(42u32), Value::Integer(42));
        assert_eq!(Value::from("hello"), Value::Text("hello".to_string()));
        assert_eq!(Value::from(vec![1u8, 2, 3]), Value::Blob(vec![1, 2, 3]));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(()), Value::Null);
    }

    #[test]
    fn display() {
        assert_eq!(Value::from("x").to_string(), "\"x\"");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Blob(vec![0; 4]).to_string(), "<4 bytes>");
    }
}
