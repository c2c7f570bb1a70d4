//! Content hashing for artifact provenance
//!
//! Every downloaded or synthesized artifact is recorded with its SHA-256
//! hash so consumers can verify a bundle entry matches what the run produced.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Write};
use std::path::Path;

/// A SHA-256 content hash.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::from_bytes(&std::fs::read(path)?))
    }

    pub fn to_hex(&self) -> String {
        let mut hex = String::with_capacity(64);
        for byte in &self.0 {
            let _ = write!(hex, "{:02x}", byte);
        }
        hex
    }

    /// Hex string with an algorithm prefix, e.g. "sha256:ab12...".
    pub fn to_prefixed_hex(&self) -> String {
        format!("sha256:{}", self.to_hex())
    }

    /// Parse a prefixed hex string produced by `to_prefixed_hex`.
    pub fn from_prefixed_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix("sha256:")?;
        if hex.len() != 64 {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_input_same_hash() {
        let a = ContentHash::from_bytes(b"sprite bytes");
        let b = ContentHash::from_bytes(b"sprite bytes");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_input_different_hash() {
        let a = ContentHash::from_bytes(b"idle.mp4");
        let b = ContentHash::from_bytes(b"walk.mp4");
        assert_ne!(a, b);
    }

    #[test]
    fn test_prefixed_roundtrip() {
        let h = ContentHash::from_bytes(b"model.glb");
        let prefixed = h.to_prefixed_hex();
        assert!(prefixed.starts_with("sha256:"));
        assert_eq!(ContentHash::from_prefixed_hex(&prefixed), Some(h));
    }

    #[test]
    fn test_reject_malformed_prefixed_hex() {
        assert!(ContentHash::from_prefixed_hex("md5:0011").is_none());
        assert!(ContentHash::from_prefixed_hex("sha256:zz").is_none());
    }
}
