//! Cross-crate integration test helpers.
//!
//! Provides consistency checks between stored users and their indexes,
//! and the end-to-end scenarios of the repository.

use crate::fixtures::{User, UserRepository, COUNTRY_INDEX, USERNAME_INDEX};
use entifile_core::{EntityRepository, StringKey};

/// Asserts that every stored user is reachable through both standard
/// indexes, and that the indexes hold no other key.
///
/// # Panics
///
/// Panics if the repository and its indexes disagree.
pub fn assert_indexes_consistent(repo: &UserRepository) {
    let users = repo.find_all().expect("Failed to read users");

    for user in &users {
        let key = user.id.clone().expect("stored user has a key");
        let by_name = repo
            .find_keys_by_indexed_value(USERNAME_INDEX, user.username.as_str())
            .expect("username index exists");
        assert_eq!(by_name, vec![key.clone()], "username of {key}");

        let by_country = repo
            .find_keys_by_indexed_value(COUNTRY_INDEX, user.country.as_str())
            .expect("country index exists");
        assert!(by_country.contains(&key), "country of {key}");
    }

    for name in [USERNAME_INDEX, COUNTRY_INDEX] {
        let info = repo.index_info(name).expect("index exists");
        assert_eq!(info.keys, users.len(), "key count of index '{name}'");
    }
}

/// Returns the sorted ids of `users`.
pub fn sorted_ids(users: &[User]) -> Vec<String> {
    let mut ids: Vec<String> = users
        .iter()
        .filter_map(|u| u.id.as_ref().map(StringKey::to_string))
        .collect();
    ids.sort();
    ids
}
