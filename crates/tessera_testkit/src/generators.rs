//! Property-based test generators using proptest.
//!
//! Provides strategies for values, keys and cache workloads.

use proptest::prelude::*;
use tessera_data::{DataType, Timestamp, Value};

/// Strategy for generating any data type.
pub fn data_type_strategy() -> impl Strategy<Value = DataType> {
    prop_oneof![
        Just(DataType::Bool),
        Just(DataType::Integer),
        Just(DataType::Float),
        Just(DataType::Text),
        Just(DataType::Date),
        Just(DataType::Blob),
    ]
}

/// Strategy for generating non-null values of any type.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        any::<f64>().prop_map(Value::Float),
        "[a-zA-Z0-9 ]{0,24}".prop_map(Value::Text),
        any::<i64>().prop_map(|s| Value::Date(Timestamp::from_secs(s))),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Blob),
    ]
}

/// Strategy for generating a value of the given type.
pub fn value_of_type(data_type: DataType) -> BoxedStrategy<Value> {
    match data_type {
        DataType::Bool => any::<bool>().prop_map(Value::Bool).boxed(),
        DataType::Integer => any::<i64>().prop_map(Value::Integer).boxed(),
        DataType::Float => any::<f64>().prop_map(Value::Float).boxed(),
        DataType::Text => "[a-zA-Z0-9 ]{0,24}".prop_map(Value::Text).boxed(),
        DataType::Date => any::<i64>()
            .prop_map(|s| Value::Date(Timestamp::from_secs(s)))
            .boxed(),
        DataType::Blob => prop::collection::vec(any::<u8>(), 0..32)
            .prop_map(Value::Blob)
            .boxed(),
    }
}

/// Strategy for generating person names.
pub fn person_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,12}( [a-z]{1,12})?").expect("Invalid regex")
}

/// One step of a cache workload over record ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    /// Load a record.
    Load(i64),
    /// Upsert a record with a new name.
    Save(i64, String),
    /// Erase a record.
    Erase(i64),
}

/// Strategy for one cache operation on ids `0..max_id`.
pub fn cache_op_strategy(max_id: i64) -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (0..max_id).prop_map(CacheOp::Load),
        2 => (0..max_id, person_name_strategy()).prop_map(|(id, name)| CacheOp::Save(id, name)),
        1 => (0..max_id).prop_map(CacheOp::Erase),
    ]
}

/// Strategy for a workload of up to `max_len` operations on ids `0..max_id`.
pub fn cache_workload_strategy(max_id: i64, max_len: usize) -> impl Strategy<Value = Vec<CacheOp>> {
    prop::collection::vec(cache_op_strategy(max_id), 0..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_values_have_their_type(
            (ty, value) in data_type_strategy().prop_flat_map(|ty| (Just(ty), value_of_type(ty)))
        ) {
            prop_assert_eq!(value.data_type(), Some(ty));
        }

        #[test]
        fn values_are_never_null(value in value_strategy()) {
            prop_assert!(!value.is_null());
        }

        #[test]
        fn ops_stay_in_range(op in cache_op_strategy(5)) {
            let id = match op {
                CacheOp::Load(id) | CacheOp::Save(id, _) | CacheOp::Erase(id) => id,
            };
            prop_assert!((0..5).contains(&id));
        }
    }
}
