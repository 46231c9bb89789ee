//! Entity and serializer traits.

use crate::error::{CoreError, CoreResult};
use crate::key::PrimaryKey;
use entifile_codec::SerializedEntity;

/// A record stored as one file, identified by one primary key.
///
/// `primary_key` returns `None` while the key is unset; such entities are
/// rejected by every write operation.
pub trait Entity: Clone + Send + Sync + 'static {
    /// The key type.
    type Key: PrimaryKey;

    /// Returns the entity's key, if one is assigned.
    fn primary_key(&self) -> Option<Self::Key>;
}

/// Returns the entity's key or a validation error.
pub(crate) fn require_key<E: Entity>(entity: &E) -> CoreResult<E::Key> {
    entity
        .primary_key()
        .ok_or_else(|| CoreError::validation("entity primary key is not set"))
}

/// Converts entities to and from file content.
///
/// `deserialize` must invert `serialize` for every entity the caller stores.
pub trait EntitySerializer<E>: Send + Sync {
    /// Encodes an entity as text.
    fn serialize(&self, entity: &E) -> CoreResult<String>;

    /// Decodes an entity from text.
    fn deserialize(&self, data: &str) -> CoreResult<E>;
}

/// A serializer expressed through [`SerializedEntity`] pairs.
///
/// Every `TextSerializer` is an [`EntitySerializer`] writing the
/// `key=value` line format.
///
/// # Example
///
/// ```rust,ignore
/// struct UserSerializer;
///
/// impl TextSerializer<User> for UserSerializer {
///     fn to_serialized(&self, user: &User) -> SerializedEntity {
///         SerializedEntity::builder()
///             .add("id", user.id.value())
///             .add_int("age", user.age)
///             .build()
///     }
///
///     fn from_serialized(&self, data: &SerializedEntity) -> CoreResult<User> {
///         Ok(User {
///             id: StringKey::new(data.require("id")?)?,
///             age: data.get_int("age")?,
///         })
///     }
/// }
/// ```
pub trait TextSerializer<E>: Send + Sync {
    /// Flattens an entity into pairs.
    fn to_serialized(&self, entity: &E) -> SerializedEntity;

    /// Rebuilds an entity from pairs.
    fn from_serialized(&self, data: &SerializedEntity) -> CoreResult<E>;
}

impl<E, T> EntitySerializer<E> for T
where
    T: TextSerializer<E>,
{
    fn serialize(&self, entity: &E) -> CoreResult<String> {
        Ok(self.to_serialized(entity).to_file_content())
    }

    fn deserialize(&self, data: &str) -> CoreResult<E> {
        self.from_serialized(&SerializedEntity::from_file_content(data))
    }
}
