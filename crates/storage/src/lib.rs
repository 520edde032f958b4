//! File Storage Adapter.
//!
//! Validates uploads against a static extension/MIME table, generates
//! collision-resistant storage keys, and issues time-limited signed URLs.
//! Bytes live behind the [`ObjectStore`] trait; production delegates to an
//! S3-compatible store, development and tests use [`MemoryObjectStore`] with
//! the same API surface.

pub mod adapter;
pub mod mime;
pub mod object_store;

pub use adapter::{FileStorage, StoredFile};
pub use mime::validate_upload;
pub use object_store::{MemoryObjectStore, ObjectStore, StoredObject};
