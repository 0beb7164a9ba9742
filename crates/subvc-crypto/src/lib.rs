//! Hashing primitives for subvc.
//!
//! Content addressing uses plain SHA-256 over a blob's raw bytes, so a
//! content hash can be reproduced with any standard `sha256sum`. Commit hashes
//! are derived from version provenance, not from content.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod hasher;

pub use hasher::{ContentHasher, HasherError};
