//! Vault configuration and metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use xela_common::{Error, Result};
use xela_crypto::{KdfParams, Salt};

/// Configuration file name in the backend root.
pub const CONFIG_FILENAME: &str = "crypt.json";

/// Vault format version for migration support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultVersion {
    pub major: u32,
    pub minor: u32,
}

impl VaultVersion {
    /// Current vault format version.
    pub const CURRENT: Self = Self { major: 1, minor: 0 };

    /// Check if this version is compatible with the current version.
    pub fn is_compatible(&self) -> bool {
        self.major == Self::CURRENT.major
    }
}

impl Default for VaultVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Vault configuration.
///
/// Stored in plaintext at the backend root. It holds what key derivation
/// needs and nothing secret; there is no password verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Vault format version.
    #[serde(default)]
    pub version: VaultVersion,
    /// Salt for master key derivation.
    pub salt: Salt,
    /// KDF parameters.
    pub kdf_parameters: KdfParams,
    /// Vault creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl VaultConfig {
    /// Create a configuration with a fresh random salt.
    ///
    /// # Errors
    /// - `Error::Configuration` if Argon2 rejects `kdf_parameters`
    pub fn new(kdf_parameters: KdfParams) -> Result<Self> {
        kdf_parameters.validate()?;

        Ok(Self {
            version: VaultVersion::CURRENT,
            salt: Salt::generate(),
            kdf_parameters,
            created_at: Some(Utc::now()),
        })
    }

    /// Check that this configuration can be opened by this build.
    ///
    /// # Errors
    /// - `Error::Configuration` for an incompatible version or invalid KDF
    ///   parameters
    pub fn validate(&self) -> Result<()> {
        if !self.version.is_compatible() {
            return Err(Error::Configuration(format!(
                "Incompatible vault version {}.{}",
                self.version.major, self.version.minor
            )));
        }
        self.kdf_parameters.validate()
    }

    /// Serialize to bytes for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse and validate a stored configuration.
    ///
    /// # Errors
    /// - `Error::Configuration` if the bytes are not a valid configuration
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(bytes)
            .map_err(|e| Error::Configuration(format!("Malformed {}: {}", CONFIG_FILENAME, e)))?;
        config.validate()?;
        Ok(config)
    }
}
