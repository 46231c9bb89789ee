//! Property-based test generators using proptest.
//!
//! Provides strategies for generating keys, index values and users whose
//! fields survive the `key=value` text format.

use crate::fixtures::User;
use entifile_core::{IntKey, StringKey, Value};
use proptest::prelude::*;

/// Countries used by generated users. Few enough that collisions are common.
pub const COUNTRIES: &[&str] = &["Canada", "Germany", "Japan", "Kenya", "Peru"];

/// Strategy for generating string keys, including characters that need
/// escaping in file names.
pub fn string_key_strategy() -> impl Strategy<Value = StringKey> {
    prop::string::string_regex("[a-zA-Z0-9_./ -]{1,24}")
        .expect("Invalid regex")
        .prop_map(|s| StringKey::new(s).expect("non-empty by construction"))
}

/// Strategy for generating integer keys.
pub fn int_key_strategy() -> impl Strategy<Value = IntKey> {
    any::<i64>().prop_map(IntKey::new)
}

/// Strategy for generating index values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        ".{0,16}".prop_map(Value::Text),
    ]
}

/// Strategy for generating text that round-trips through one entity line:
/// no line breaks, no surrounding whitespace.
pub fn field_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9][A-Za-z0-9 =.'-]{0,14}[A-Za-z0-9]|[A-Za-z0-9]")
        .expect("Invalid regex")
}

/// Strategy for generating a user with the given id.
pub fn user_with_id_strategy(id: String) -> impl Strategy<Value = User> {
    (
        prop::string::string_regex("[a-z][a-z0-9]{2,10}").expect("Invalid regex"),
        field_text_strategy(),
        field_text_strategy(),
        prop::sample::select(COUNTRIES),
        0i64..120,
    )
        .prop_map(move |(username, first, last, country, age)| {
            User::new(&id, &username, &first, &last, country, age)
        })
}

/// Strategy for generating a single user.
pub fn user_strategy() -> impl Strategy<Value = User> {
    prop::string::string_regex("u[0-9]{1,6}")
        .expect("Invalid regex")
        .prop_flat_map(user_with_id_strategy)
}

/// Strategy for generating up to `max` users with distinct ids.
///
/// Usernames may repeat, so saving all of them can hit the unique index.
pub fn users_strategy(max: usize) -> impl Strategy<Value = Vec<User>> {
    prop::collection::btree_set("u[0-9]{1,4}", 0..=max).prop_flat_map(|ids| {
        ids.into_iter()
            .map(user_with_id_strategy)
            .collect::<Vec<_>>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::UserSerializer;
    use entifile_core::{EntitySerializer, PrimaryKey};

    proptest! {
        #[test]
        fn user_text_roundtrip(user in user_strategy()) {
            let text = UserSerializer.serialize(&user).unwrap();
            prop_assert_eq!(UserSerializer.deserialize(&text).unwrap(), user);
        }

        #[test]
        fn string_key_file_names_are_single_components(key in string_key_strategy()) {
            let name = key.file_name();
            prop_assert!(!name.contains('/'));
            prop_assert!(name != "." && name != "..");
        }

        #[test]
        fn int_key_bytes_roundtrip(key in int_key_strategy()) {
            prop_assert_eq!(IntKey::from_bytes(&key.to_bytes()).unwrap(), key);
        }

        #[test]
        fn generated_users_have_distinct_ids(users in users_strategy(8)) {
            let mut ids: Vec<_> = users.iter().map(|u| u.id.clone()).collect();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), users.len());
        }
    }
}
