//! Content-addressed blob storage and version persistence for subvc.
//!
//! Every file body is stored once as an immutable [`Blob`] keyed by the
//! SHA-256 of its bytes, no matter how many versions or submissions contain
//! it. Versions are persisted as immutable [`Version`] records that bind
//! paths to blobs.
//!
//! # Storage Backends
//!
//! All backends implement the [`Storage`] trait (the union of [`BlobStore`]
//! and [`VersionStore`] plus one atomic commit operation):
//!
//! - [`InMemoryStorage`] -- lock-protected tables for tests and embedding
//! - [`StateFile`] -- durable checksummed snapshot of an `InMemoryStorage`
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written; only `reference_count` changes.
//! 2. A blob's reference count equals the number of version-file bindings
//!    pointing at it, not the number of `put` calls.
//! 3. A version and all of its bindings are persisted as one unit, or not at all.
//! 4. `(submission_id, version_number)` is unique.
//! 5. Reads re-verify the content hash; corruption is an error, never silent.

pub mod blob;
pub mod error;
pub mod memory;
pub mod state_file;
pub mod traits;
pub mod version;

pub use blob::{Blob, BlobRef, CompressionConfig, EncodedBlob, StorageType};
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryStorage, StorageSnapshot, StorageStats};
pub use state_file::StateFile;
pub use traits::{BlobStore, Storage, VersionStore};
pub use version::{Metadata, NewVersion, NewVersionFile, Version, VersionFile};
