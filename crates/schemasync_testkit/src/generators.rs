//! Property-based test generators using proptest.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Strategy for valid identifiers (database, branch, table and record names).
pub fn identifier_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9][a-z0-9_~-]{0,15}").expect("Invalid regex")
}

/// Strategy for fields of a `users` fixture record.
pub fn user_fields_strategy() -> impl Strategy<Value = Map<String, Value>> {
    (
        "[a-zA-Z ]{0,20}",
        "[a-z]{1,8}",
        prop::option::of("[A-Z][a-z]{2,10}"),
    )
        .prop_map(|(name, mailbox, city)| {
            let mut fields = Map::new();
            fields.insert("name".into(), Value::from(name));
            fields.insert("email".into(), Value::from(format!("{}@example.com", mailbox)));
            if let Some(city) = city {
                fields.insert("address".into(), json!({ "city": city }));
            }
            fields
        })
}

/// Strategy for up to `max` `users` records with distinct ids, as `(id, fields)`.
pub fn user_records_strategy(max: usize) -> impl Strategy<Value = Vec<(String, Map<String, Value>)>> {
    prop::collection::btree_map(identifier_strategy(), user_fields_strategy(), 0..max)
        .prop_map(|records| records.into_iter().collect())
}
