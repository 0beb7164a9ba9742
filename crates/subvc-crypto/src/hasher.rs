use sha2::{Digest, Sha256};
use subvc_types::{CommitHash, ContentHash, SubmissionId};

/// SHA-256 hasher for blob content and version commit hashes.
pub struct ContentHasher;

impl ContentHasher {
    /// Hash raw bytes. Zero-length input is legal and yields the well-known
    /// empty-string digest.
    pub fn hash(data: &[u8]) -> ContentHash {
        let digest = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        ContentHash::from_digest(bytes)
    }

    /// Verify that data produces the expected content hash.
    pub fn verify(data: &[u8], expected: &ContentHash) -> bool {
        Self::hash(data) == *expected
    }

    /// Derive the commit hash of a version from its provenance.
    ///
    /// The input is `"{submission}-{version_number}-{timestamp_ms}"`, hashed
    /// with SHA-256 and truncated to 40 hex characters.
    pub fn commit_hash(
        submission: SubmissionId,
        version_number: u32,
        timestamp_ms: i64,
    ) -> Result<CommitHash, HasherError> {
        let input = format!("{submission}-{version_number}-{timestamp_ms}");
        let digest = hex::encode(Sha256::digest(input.as_bytes()));
        CommitHash::from_hex(&digest[..CommitHash::LEN])
            .map_err(|e| HasherError::InvalidDigest(e.to_string()))
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("digest could not be encoded: {0}")]
    InvalidDigest(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn empty_input_has_well_known_digest() {
        assert_eq!(ContentHasher::hash(b"").to_hex(), EMPTY_SHA256);
    }

    #[test]
    fn matches_reference_digest() {
        assert_eq!(
            ContentHasher::hash(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn verify_correct_data() {
        let hash = ContentHasher::hash(b"test data");
        assert!(ContentHasher::verify(b"test data", &hash));
    }

    #[test]
    fn verify_incorrect_data() {
        let hash = ContentHasher::hash(b"original");
        assert!(!ContentHasher::verify(b"tampered", &hash));
    }

    #[test]
    fn commit_hash_is_40_chars() {
        let hash = ContentHasher::commit_hash(SubmissionId::new(7), 3, 1_700_000_000_000).unwrap();
        assert_eq!(hash.as_str().len(), 40);
    }

    #[test]
    fn commit_hash_depends_on_every_input() {
        let base = ContentHasher::commit_hash(SubmissionId::new(1), 1, 1000).unwrap();
        let other_submission = ContentHasher::commit_hash(SubmissionId::new(2), 1, 1000).unwrap();
        let other_number = ContentHasher::commit_hash(SubmissionId::new(1), 2, 1000).unwrap();
        let other_time = ContentHasher::commit_hash(SubmissionId::new(1), 1, 1001).unwrap();
        assert_ne!(base, other_submission);
        assert_ne!(base, other_number);
        assert_ne!(base, other_time);
    }

    #[test]
    fn commit_hash_is_prefix_of_provenance_digest() {
        let hash = ContentHasher::commit_hash(SubmissionId::new(5), 2, 42).unwrap();
        let full = ContentHasher::hash(b"5-2-42").to_hex();
        assert_eq!(hash.as_str(), &full[..40]);
    }

    proptest! {
        #[test]
        fn hash_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(ContentHasher::hash(&data), ContentHasher::hash(&data));
        }

        #[test]
        fn distinct_inputs_rarely_collide(a in "[a-z]{1,16}", b in "[a-z]{1,16}") {
            prop_assume!(a != b);
            prop_assert_ne!(ContentHasher::hash(a.as_bytes()), ContentHasher::hash(b.as_bytes()));
        }
    }
}
