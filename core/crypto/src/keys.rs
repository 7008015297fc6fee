//! Key types with secure memory handling.
//!
//! All key types automatically zeroize their memory on drop to prevent
//! sensitive data from persisting in memory.

use blake2::digest::consts::{U32, U64};
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use xela_common::{Error, Result};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of the filename key; AES-256-SIV takes two 256-bit halves.
pub const NAME_KEY_LENGTH: usize = 64;

/// Length of the KDF salt in bytes.
pub const SALT_LENGTH: usize = 32;

/// Master key derived from the vault password.
///
/// This key is never used directly by a cipher: content and filename keys
/// are derived from it with domain-separated BLAKE2b.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; KEY_LENGTH],
}

impl MasterKey {
    /// Create a master key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Create a master key from a slice of unchecked length.
    ///
    /// # Errors
    /// - `Error::Key` if `key` is not exactly `KEY_LENGTH` bytes
    pub fn from_slice(key: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LENGTH] = key.try_into().map_err(|_| {
            Error::Key(format!(
                "Invalid key length: expected {}, got {}",
                KEY_LENGTH,
                key.len()
            ))
        })?;
        Ok(Self { key })
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Derive the AES-256 key for file contents.
    pub fn derive_content_key(&self) -> ContentKey {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update(self.key);
        hasher.update(b"xela-content");

        let mut derived = [0u8; KEY_LENGTH];
        derived.copy_from_slice(&hasher.finalize());
        ContentKey { key: derived }
    }

    /// Derive the AES-256-SIV key for filenames.
    pub fn derive_name_key(&self) -> NameKey {
        let mut hasher = Blake2b::<U64>::new();
        hasher.update(self.key);
        hasher.update(b"xela-names");

        let mut derived = [0u8; NAME_KEY_LENGTH];
        derived.copy_from_slice(&hasher.finalize());
        NameKey { key: derived }
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterKey([REDACTED])")
    }
}

/// Key for encrypting superblocks.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey {
    key: [u8; KEY_LENGTH],
}

impl ContentKey {
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey([REDACTED])")
    }
}

/// Key for encrypting filenames.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct NameKey {
    key: [u8; NAME_KEY_LENGTH],
}

impl NameKey {
    pub fn from_bytes(key: [u8; NAME_KEY_LENGTH]) -> Self {
        Self { key }
    }

    pub fn as_bytes(&self) -> &[u8; NAME_KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameKey([REDACTED])")
    }
}

/// Salt for key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt(pub [u8; SALT_LENGTH]);

impl Salt {
    /// Generate a random salt.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        Self(salt)
    }

    pub fn from_bytes(bytes: [u8; SALT_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LENGTH] {
        &self.0
    }
}
