//! Record-access boundary for standard files.
//!
//! The binary standard-file codec is an external capability: this crate
//! defines what the extraction engine relies on — record metadata, search
//! predicates and the store traits — plus a JSON-backed reference store
//! that implements the traits for tests, tooling and the CLI.

pub mod json;
pub mod metadata;
pub mod store;

pub use json::JsonStore;
pub use metadata::{RecordMetadata, RecordQuery};
pub use store::{RecordCollection, RecordSink, RecordStore};
