use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::memory::StorageSnapshot;

const MAGIC: &[u8; 8] = b"SUBVC001";

/// Magic (8 bytes) + CRC32 (4 bytes).
const HEADER_SIZE: usize = 12;

/// Durable, checksummed image of a storage snapshot.
///
/// On-disk format:
/// ```text
/// [8 bytes: magic "SUBVC001"]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized StorageSnapshot)]
/// ```
///
/// Saves go to a temporary file in the same directory which is synced and
/// then renamed over the target, so a crash mid-save leaves the previous
/// image intact.
#[derive(Clone, Debug)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or `Ok(None)` if the file does not exist yet.
    pub fn load(&self) -> StoreResult<Option<StorageSnapshot>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if data.len() < HEADER_SIZE || &data[..MAGIC.len()] != MAGIC {
            return Err(StoreError::Corrupt(format!(
                "{} is not a subvc state file",
                self.path.display()
            )));
        }

        let expected_crc = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        let payload = &data[HEADER_SIZE..];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            return Err(StoreError::Corrupt(format!(
                "checksum mismatch in {}: expected {expected_crc:08x}, got {actual_crc:08x}",
                self.path.display()
            )));
        }

        let snapshot: StorageSnapshot = bincode::deserialize(payload)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        debug!(
            path = %self.path.display(),
            blobs = snapshot.blobs.len(),
            versions = snapshot.versions.len(),
            "loaded state file"
        );
        Ok(Some(snapshot))
    }

    /// Atomically replace the file with `snapshot`.
    pub fn save(&self, snapshot: &StorageSnapshot) -> StoreResult<()> {
        let payload =
            bincode::serialize(snapshot).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let crc = crc32fast::hash(&payload);

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(MAGIC)?;
        tmp.write_all(&crc.to_le_bytes())?;
        tmp.write_all(&payload)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        debug!(path = %self.path.display(), bytes = payload.len(), "saved state file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStorage;
    use crate::traits::{BlobStore, VersionStore};
    use crate::CompressionConfig;

    fn populated() -> InMemoryStorage {
        let store = InMemoryStorage::with_compression(CompressionConfig::zstd());
        store.put(b"small").unwrap();
        store.put("large ".repeat(2000).as_bytes()).unwrap();
        store
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state.bin"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state.bin"));
        let store = populated();
        let snapshot = store.snapshot().unwrap();

        file.save(&snapshot).unwrap();
        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded, snapshot);

        let restored = InMemoryStorage::restore(loaded, CompressionConfig::zstd()).unwrap();
        assert_eq!(restored.blob_count().unwrap(), 2);
        assert!(restored.submissions().unwrap().is_empty());
    }

    #[test]
    fn save_overwrites_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state.bin"));
        file.save(&StorageSnapshot::default()).unwrap();
        let snapshot = populated().snapshot().unwrap();
        file.save(&snapshot).unwrap();
        assert_eq!(file.load().unwrap().unwrap().blobs.len(), 2);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("nested/deeper/state.bin"));
        file.save(&StorageSnapshot::default()).unwrap();
        assert!(file.path().exists());
    }

    #[test]
    fn flipped_payload_byte_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        let file = StateFile::new(&path);
        file.save(&populated().snapshot().unwrap()).unwrap();

        let mut data = fs::read(&path).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        fs::write(&path, data).unwrap();

        assert!(matches!(file.load(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn foreign_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        fs::write(&path, b"definitely not a state file").unwrap();
        assert!(matches!(
            StateFile::new(&path).load(),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn truncated_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        fs::write(&path, b"SUBV").unwrap();
        assert!(matches!(
            StateFile::new(&path).load(),
            Err(StoreError::Corrupt(_))
        ));
    }
}
