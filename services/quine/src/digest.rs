//! Content digests

use std::fmt;

use sha2::Sha256;

/// Algorithm prefix used for every digest produced by this crate
pub const SHA256: &str = "sha256";

/// An algorithm-prefixed content digest, e.g. `sha256:e3b0c442...`
///
/// The encoded portion is always lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Compute the sha256 digest of an exact byte sequence
    pub fn sha256(data: &[u8]) -> Self {
        use sha2::Digest as _;
        Self(format!("{SHA256}:{}", hex::encode(Sha256::digest(data))))
    }

    /// The full digest string, including the algorithm prefix
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The algorithm portion (before the `:`)
    pub fn algorithm(&self) -> &str {
        self.0.split_once(':').map(|(alg, _)| alg).unwrap_or(SHA256)
    }

    /// The hex-encoded hash (after the `:`)
    pub fn encoded(&self) -> &str {
        self.0
            .split_once(':')
            .map(|(_, encoded)| encoded)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Digest {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Digest {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_digest() {
        let digest = Digest::sha256(b"");
        assert_eq!(
            digest,
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_deterministic() {
        let data = b"the same bytes twice";
        assert_eq!(Digest::sha256(data), Digest::sha256(data));
        assert_ne!(Digest::sha256(data), Digest::sha256(b"other bytes"));
    }

    #[test]
    fn test_parts() {
        let digest = Digest::sha256(b"hello");
        assert_eq!(digest.algorithm(), "sha256");
        assert_eq!(digest.encoded().len(), 64);
        assert!(
            digest
                .encoded()
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn test_serializes_as_string() {
        let digest = Digest::sha256(b"hello");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", digest));
    }
}
