//! Storage modules for Hashserv
//!
//! Provides the staging area for in-flight uploads and the content-addressed
//! object store they are committed into.

pub mod content_store;
pub mod staging_area;

pub use content_store::{CommitResult, ContentStore, StoredObject};
pub use staging_area::{StagedObject, StagingArea};
