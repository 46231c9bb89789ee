//! # EntiFile Codec
//!
//! Line-oriented key/value text format for EntiFile entity files.
//!
//! An entity is flattened into an ordered list of `(key, value)` pairs and
//! written as one `key=value` line per pair:
//!
//! ```text
//! id=u1
//! username=alice
//! age=31
//! ```
//!
//! Decoding trims every line, skips blank lines and lines without `=`, and
//! splits on the first `=`. There is no escaping, so values must not contain
//! line breaks.
//!
//! ## Usage
//!
//! ```
//! use entifile_codec::SerializedEntity;
//!
//! let entity = SerializedEntity::builder()
//!     .add("username", "alice")
//!     .add_int("age", 31)
//!     .build();
//!
//! let text = entity.to_file_content();
//! let decoded = SerializedEntity::from_file_content(&text);
//! assert_eq!(decoded.get_int("age").unwrap(), 31);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entity;
mod error;
mod pair;

pub use entity::{SerializedEntity, SerializedEntityBuilder};
pub use error::{CodecError, CodecResult};
pub use pair::KeyValuePair;
