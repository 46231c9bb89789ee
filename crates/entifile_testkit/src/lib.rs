//! # EntiFile Testkit
//!
//! Test utilities for EntiFile.
//!
//! This crate provides:
//! - A `User` entity with its text serializer
//! - Temporary repositories with the standard indexes
//! - Property-based test generators using proptest
//! - Consistency checks shared by the integration tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entifile_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_repository() {
//!     with_temp_repo(|repo| {
//!         repo.save(&User::new("u1", "alice", "Alice", "Smith", "Canada", 30)).unwrap();
//!         assert_indexes_consistent(repo);
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use entifile_core::EntityRepository;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
