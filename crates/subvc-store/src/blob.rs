use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subvc_crypto::ContentHasher;
use subvc_types::{BlobId, ContentHash};

use crate::error::{StoreError, StoreResult};

/// How a blob's `content` relates to the payload it represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    /// `content` holds the complete payload (possibly zstd-compressed).
    Full,
    /// `content` is a patch against `base_blob_id`.
    ///
    /// Reserved: nothing in this engine writes delta blobs, and reading one
    /// fails with [`StoreError::UnsupportedStorage`].
    Delta,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "FULL"),
            Self::Delta => write!(f, "DELTA"),
        }
    }
}

/// Compression of blob payloads at rest.
///
/// This is independent of [`StorageType`]: a compressed blob is still
/// `Full`, and its content hash is always taken over the uncompressed bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub enabled: bool,
    /// Payloads smaller than this are stored raw.
    pub min_size_bytes: u64,
    /// zstd compression level.
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_size_bytes: 4096,
            level: 3,
        }
    }
}

impl CompressionConfig {
    /// Compression enabled with default threshold and level.
    pub fn zstd() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

/// A stored blob: an immutable payload plus bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub id: BlobId,
    /// SHA-256 of the uncompressed payload. Unique across the store.
    pub content_hash: ContentHash,
    /// Stored bytes; interpret through [`Blob::decode`].
    pub content: Vec<u8>,
    pub storage_type: StorageType,
    pub base_blob_id: Option<BlobId>,
    /// Size of the uncompressed payload.
    pub size_bytes: u64,
    pub compressed_size_bytes: Option<u64>,
    pub is_compressed: bool,
    /// Number of version-file bindings pointing at this blob.
    pub reference_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Blob {
    /// Materialize a new `Full` blob from encoded content. The reference
    /// count starts at zero; bindings increment it.
    pub fn from_encoded(id: BlobId, encoded: EncodedBlob, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            content_hash: encoded.content_hash,
            compressed_size_bytes: encoded.is_compressed.then_some(encoded.stored.len() as u64),
            content: encoded.stored,
            storage_type: StorageType::Full,
            base_blob_id: None,
            size_bytes: encoded.size_bytes,
            is_compressed: encoded.is_compressed,
            reference_count: 0,
            created_at,
        }
    }

    /// Reconstruct the original payload and verify it against the content hash.
    pub fn decode(&self) -> StoreResult<Vec<u8>> {
        let payload = match self.storage_type {
            StorageType::Full if self.is_compressed => zstd::decode_all(self.content.as_slice())
                .map_err(|e| StoreError::Compression(e.to_string()))?,
            StorageType::Full => self.content.clone(),
            StorageType::Delta => {
                return Err(StoreError::UnsupportedStorage {
                    id: self.id,
                    storage_type: self.storage_type,
                })
            }
        };

        let computed = ContentHasher::hash(&payload);
        if computed != self.content_hash {
            return Err(StoreError::HashMismatch {
                id: self.id,
                expected: self.content_hash,
                computed,
            });
        }
        Ok(payload)
    }

    /// Lightweight handle for this blob.
    pub fn to_ref(&self) -> BlobRef {
        BlobRef {
            id: self.id,
            content_hash: self.content_hash,
            size_bytes: self.size_bytes,
        }
    }
}

/// Handle to a stored blob, returned by `put` and used by version bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef {
    pub id: BlobId,
    pub content_hash: ContentHash,
    pub size_bytes: u64,
}

/// Content that has been hashed and prepared for storage but not yet
/// assigned an id.
///
/// Encoding is pure CPU work, so backends do it before taking their write
/// lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedBlob {
    pub content_hash: ContentHash,
    pub size_bytes: u64,
    pub stored: Vec<u8>,
    pub is_compressed: bool,
}

impl EncodedBlob {
    /// Hash `content` and apply compression per `config`. Compressed output
    /// is kept only when it is actually smaller.
    pub fn encode(content: &[u8], config: &CompressionConfig) -> StoreResult<Self> {
        let content_hash = ContentHasher::hash(content);
        let size_bytes = content.len() as u64;

        if config.enabled && size_bytes >= config.min_size_bytes {
            let compressed = zstd::encode_all(content, config.level)
                .map_err(|e| StoreError::Compression(e.to_string()))?;
            if compressed.len() < content.len() {
                return Ok(Self {
                    content_hash,
                    size_bytes,
                    stored: compressed,
                    is_compressed: true,
                });
            }
        }

        Ok(Self {
            content_hash,
            size_bytes,
            stored: content.to_vec(),
            is_compressed: false,
        })
    }
}
