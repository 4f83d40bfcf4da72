// ABOUTME: Content fingerprinting for optimistic locking.
// ABOUTME: SHA-256 over raw file bytes, hex-encoded, recomputed on every read.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A fixed-size digest of file bytes, compared before every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Wrap an already-hex-encoded digest (e.g. one a caller read earlier).
    pub fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of a byte slice.
pub fn fingerprint(bytes: &[u8]) -> ContentFingerprint {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(64);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    ContentFingerprint(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint(b"hello world");
        let b = fingerprint(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn fingerprint_differs_on_any_change() {
        assert_ne!(fingerprint(b"hello world"), fingerprint(b"hello worle"));
        assert_ne!(fingerprint(b""), fingerprint(b" "));
    }

    #[test]
    fn known_empty_digest() {
        // SHA-256 of the empty string is a published constant.
        assert_eq!(
            fingerprint(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        );
    }

    #[test]
    fn display_matches_as_str() {
        let fp = fingerprint(b"abc");
        assert_eq!(format!("{}", fp), fp.as_str());
    }
}
