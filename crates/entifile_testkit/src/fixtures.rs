//! Test fixtures and repository helpers.
//!
//! Provides a `User` entity, its serializer and temporary repositories
//! carrying the standard `username` and `country` indexes, plus an `Order`
//! entity keyed by integers.

use entifile_codec::SerializedEntity;
use entifile_core::{
    CoreResult, Entity, EntityRepository, IndexedRepository, IntKey, RepositoryConfig, StringKey,
    TextSerializer,
};
use std::path::Path;
use tempfile::TempDir;

/// Name of the unique index over `username`.
pub const USERNAME_INDEX: &str = "username";

/// Name of the non-unique index over `country`.
pub const COUNTRY_INDEX: &str = "country";

/// Name of the non-unique index over an order's `status`.
pub const STATUS_INDEX: &str = "status";

/// A user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Primary key, unset for users not yet stored.
    pub id: Option<StringKey>,
    /// Unique login name.
    pub username: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Country of residence.
    pub country: String,
    /// Age in years.
    pub age: i64,
}

impl User {
    /// Creates a user with the given key.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn new(
        id: &str,
        username: &str,
        first_name: &str,
        last_name: &str,
        country: &str,
        age: i64,
    ) -> Self {
        Self {
            id: Some(StringKey::new(id).expect("user id must not be empty")),
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            country: country.to_string(),
            age,
        }
    }

    /// Returns the key for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn key(id: &str) -> StringKey {
        StringKey::new(id).expect("user id must not be empty")
    }
}

impl Entity for User {
    type Key = StringKey;

    fn primary_key(&self) -> Option<StringKey> {
        self.id.clone()
    }
}

/// Text serializer for [`User`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UserSerializer;

impl TextSerializer<User> for UserSerializer {
    fn to_serialized(&self, user: &User) -> SerializedEntity {
        SerializedEntity::builder()
            .add_optional("id", user.id.as_ref())
            .add("firstName", &user.first_name)
            .add("lastName", &user.last_name)
            .add("username", &user.username)
            .add("country", &user.country)
            .add_int("age", user.age)
            .build()
    }

    fn from_serialized(&self, data: &SerializedEntity) -> CoreResult<User> {
        Ok(User {
            id: data.get("id").map(StringKey::new).transpose()?,
            first_name: data.require("firstName")?.to_string(),
            last_name: data.require("lastName")?.to_string(),
            username: data.require("username")?.to_string(),
            country: data.require("country")?.to_string(),
            age: data.get_int("age")?,
        })
    }
}

/// The repository type used throughout the tests.
pub type UserRepository = IndexedRepository<User, UserSerializer>;

/// Five users, two of them in Canada.
pub fn sample_users() -> Vec<User> {
    vec![
        User::new("u1", "jdoe", "John", "Doe", "Canada", 34),
        User::new("u2", "asmith", "Alice", "Smith", "United States", 28),
        User::new("u3", "mtremblay", "Marie", "Tremblay", "Canada", 41),
        User::new("u4", "kmuller", "Klaus", "Muller", "Germany", 52),
        User::new("u5", "ytanaka", "Yuki", "Tanaka", "Japan", 23),
    ]
}

/// Opens a repository at `dir` and registers the standard indexes.
pub fn open_user_repository(dir: &Path, config: RepositoryConfig) -> CoreResult<UserRepository> {
    let repo = IndexedRepository::open_with_config(dir, UserSerializer, config)?;
    repo.create_unique_index(USERNAME_INDEX, |u: &User| u.username.clone())?;
    repo.create_non_unique_index(COUNTRY_INDEX, |u: &User| u.country.clone())?;
    Ok(repo)
}

/// An order record, keyed by number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Order number.
    pub id: Option<IntKey>,
    /// Customer name.
    pub customer: String,
    /// Processing state.
    pub status: String,
}

impl Order {
    /// Creates an order with the given number.
    pub fn new(id: i64, customer: &str, status: &str) -> Self {
        Self {
            id: Some(IntKey::new(id)),
            customer: customer.to_string(),
            status: status.to_string(),
        }
    }
}

impl Entity for Order {
    type Key = IntKey;

    fn primary_key(&self) -> Option<IntKey> {
        self.id
    }
}

/// Text serializer for [`Order`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderSerializer;

impl TextSerializer<Order> for OrderSerializer {
    fn to_serialized(&self, order: &Order) -> SerializedEntity {
        SerializedEntity::builder()
            .add_optional("id", order.id.as_ref())
            .add("customer", &order.customer)
            .add("status", &order.status)
            .build()
    }

    fn from_serialized(&self, data: &SerializedEntity) -> CoreResult<Order> {
        let id = match data.get("id") {
            Some(_) => Some(IntKey::new(data.get_int("id")?)),
            None => None,
        };
        Ok(Order {
            id,
            customer: data.require("customer")?.to_string(),
            status: data.require("status")?.to_string(),
        })
    }
}

/// Repository of [`Order`]s.
pub type OrderRepository = IndexedRepository<Order, OrderSerializer>;

/// Four orders, two of them open; one has a negative number.
pub fn sample_orders() -> Vec<Order> {
    vec![
        Order::new(1001, "jdoe", "open"),
        Order::new(1002, "asmith", "shipped"),
        Order::new(-7, "mtremblay", "open"),
        Order::new(42, "kmuller", "cancelled"),
    ]
}

/// Opens an order repository at `dir` with the `status` index.
pub fn open_order_repository(dir: &Path, config: RepositoryConfig) -> CoreResult<OrderRepository> {
    let repo = IndexedRepository::open_with_config(dir, OrderSerializer, config)?;
    repo.create_non_unique_index(STATUS_INDEX, |o: &Order| o.status.clone())?;
    Ok(repo)
}

/// A repository in a temporary directory, removed on drop.
pub struct TestRepository {
    /// The repository instance.
    pub repo: UserRepository,
    /// The temporary directory (kept alive to prevent cleanup).
    dir: TempDir,
}

impl TestRepository {
    /// Creates an empty repository with the standard indexes.
    pub fn new() -> Self {
        Self::with_config(RepositoryConfig::default())
    }

    /// Creates an empty repository with the standard indexes and `config`.
    pub fn with_config(config: RepositoryConfig) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let repo = open_user_repository(dir.path(), config).expect("Failed to open repository");
        Self { repo, dir }
    }

    /// Creates a repository holding [`sample_users`].
    pub fn with_sample_users() -> Self {
        let test = Self::new();
        for user in sample_users() {
            test.repo.save(&user).expect("Failed to save sample user");
        }
        test
    }

    /// Returns the repository directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Closes the repository and opens the same directory again, loading
    /// the index records.
    pub fn reopen(self) -> Self {
        let Self { repo, dir } = self;
        let config = repo.config().clone();
        drop(repo);

        let repo = IndexedRepository::open_with_config(dir.path(), UserSerializer, config)
            .expect("Failed to reopen repository");
        repo.create_unique_index(USERNAME_INDEX, |u: &User| u.username.clone())
            .expect("Failed to create username index");
        repo.create_non_unique_index(COUNTRY_INDEX, |u: &User| u.country.clone())
            .expect("Failed to create country index");
        repo.load_indexes().expect("Failed to load indexes");
        Self { repo, dir }
    }
}

impl Default for TestRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestRepository {
    type Target = UserRepository;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}

/// Runs a test with a temporary repository carrying the standard indexes.
///
/// # Example
///
/// ```rust,ignore
/// use entifile_testkit::with_temp_repo;
///
/// #[test]
/// fn my_test() {
///     with_temp_repo(|repo| {
///         assert_eq!(repo.count().unwrap(), 0);
///     });
/// }
/// ```
pub fn with_temp_repo<F, R>(f: F) -> R
where
    F: FnOnce(&UserRepository) -> R,
{
    let test = TestRepository::new();
    f(&test.repo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entifile_core::EntitySerializer;

    #[test]
    fn serializer_writes_expected_lines() {
        let user = User::new("u1", "jdoe", "John", "Doe", "Canada", 34);
        let text = UserSerializer.serialize(&user).unwrap();
        assert_eq!(
            text,
            "id=u1\nfirstName=John\nlastName=Doe\nusername=jdoe\ncountry=Canada\nage=34\n"
        );
        assert_eq!(UserSerializer.deserialize(&text).unwrap(), user);
    }

    #[test]
    fn sample_users_have_two_canadians() {
        let canadians = sample_users()
            .into_iter()
            .filter(|u| u.country == "Canada")
            .count();
        assert_eq!(canadians, 2);
    }

    #[test]
    fn test_repository_has_indexes() {
        let test = TestRepository::new();
        assert_eq!(test.index_names(), vec![USERNAME_INDEX, COUNTRY_INDEX]);
        assert!(test.path().join("indexes").is_dir());
    }

    #[test]
    fn order_repository_uses_integer_files() {
        let dir = TempDir::new().unwrap();
        let repo = open_order_repository(dir.path(), RepositoryConfig::default()).unwrap();
        for order in sample_orders() {
            repo.save(&order).unwrap();
        }

        assert!(dir.path().join("-7.txt").is_file());
        assert_eq!(
            repo.find_keys_by_indexed_value(STATUS_INDEX, "open").unwrap(),
            vec![IntKey::new(1001), IntKey::new(-7)]
        );
        assert_eq!(
            repo.find_by_id(&IntKey::new(42)).unwrap(),
            Some(Order::new(42, "kmuller", "cancelled"))
        );
    }

    #[test]
    fn with_temp_repo_returns_value() {
        let count = with_temp_repo(|repo| repo.count().unwrap());
        assert_eq!(count, 0);
    }
}
