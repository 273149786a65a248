//! # Postboard Testkit
//!
//! Test utilities for Postboard.
//!
//! This crate provides:
//! - Test fixtures and database helpers
//! - A search index that records every call and can script query results
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use postboard_testkit::prelude::*;
//!
//! #[test]
//! fn post_is_indexed() {
//!     let (db, index) = TestDatabase::with_recording_index();
//!     insert_post(&db, "help", "flask help");
//!     assert_eq!(index.adds().len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod recording;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::recording::*;
}

pub use fixtures::*;
pub use generators::*;
pub use recording::*;
