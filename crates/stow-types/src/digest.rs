const SCRATCH_DOMAIN: &str = "stow-scratch-v1";

/// Domain-separated BLAKE3 digest of a final artifact path.
///
/// Used to name per-artifact scratch directories. The same path always
/// produces the same digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PathDigest([u8; 32]);

impl PathDigest {
    pub fn of_path(path: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(SCRATCH_DOMAIN.as_bytes());
        hasher.update(b":");
        hasher.update(path.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}
