//! Benchmark helpers.

#![warn(missing_docs)]

use entifile_core::{EntityRepository, RepositoryConfig};
use entifile_testkit::{open_user_repository, User, UserRepository};
use tempfile::TempDir;

const COUNTRIES: &[&str] = &["Canada", "Germany", "Japan", "Kenya", "Peru", "Chile", "India"];

/// Returns `n` users spread over a handful of countries.
pub fn generate_users(n: usize) -> Vec<User> {
    (0..n)
        .map(|i| {
            User::new(
                &format!("u{i:06}"),
                &format!("user{i}"),
                "First",
                "Last",
                COUNTRIES[i % COUNTRIES.len()],
                (i % 90) as i64,
            )
        })
        .collect()
}

/// Opens a repository in a fresh temporary directory holding `n` users.
///
/// # Panics
///
/// Panics if the repository cannot be created.
pub fn populated_repository(n: usize) -> (TempDir, UserRepository) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let repo =
        open_user_repository(dir.path(), RepositoryConfig::default()).expect("Failed to open");
    for user in generate_users(n) {
        repo.save(&user).expect("Failed to save user");
    }
    (dir, repo)
}
