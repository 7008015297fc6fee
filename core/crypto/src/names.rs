//! Filename encryption.
//!
//! Names are encrypted with AES-256-SIV under a zero nonce and encoded as
//! unpadded URL-safe base64. SIV is deterministic, so the same name always
//! maps to the same stored name and an item can be looked up in the backend
//! without listing its directory. The synthetic IV doubles as an
//! authentication tag: a stored name that was not produced under this key is
//! rejected rather than passed through.

use aes_siv::aead::{Aead, KeyInit};
use aes_siv::{Aes256SivAead, Nonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use crate::keys::NameKey;
use xela_common::{Error, Result, VaultPath};

/// Longest plaintext name, in bytes, whose encryption fits a 255-byte
/// filename.
pub const MAX_NAME_LEN: usize = 175;

/// Encrypts and decrypts item names.
pub struct FilenameCodec {
    cipher: Aes256SivAead,
}

impl FilenameCodec {
    /// # Errors
    /// - `Error::Key` if the name key is rejected by the cipher
    pub fn new(key: &NameKey) -> Result<Self> {
        let cipher = Aes256SivAead::new_from_slice(key.as_bytes())
            .map_err(|_| Error::Key("Invalid filename key length".to_string()))?;
        Ok(Self { cipher })
    }

    /// Encrypt one name.
    ///
    /// The result only contains `[A-Za-z0-9_-]` and is at most 255 bytes.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if `name` is not a valid path component or is
    ///   longer than [`MAX_NAME_LEN`] bytes
    pub fn encrypt(&self, name: &str) -> Result<String> {
        VaultPath::validate_component(name)?;
        if name.len() > MAX_NAME_LEN {
            return Err(Error::InvalidInput(format!(
                "Name is {} bytes long, the limit is {}",
                name.len(),
                MAX_NAME_LEN
            )));
        }

        let ciphertext = self
            .cipher
            .encrypt(&Nonce::default(), name.as_bytes())
            .map_err(|_| Error::InvalidInput("Filename encryption failed".to_string()))?;

        Ok(URL_SAFE_NO_PAD.encode(ciphertext))
    }

    /// Decrypt one stored name.
    ///
    /// # Errors
    /// - `Error::Corruption` if `encrypted` was not produced by
    ///   [`FilenameCodec::encrypt`] under this key
    pub fn decrypt(&self, encrypted: &str) -> Result<String> {
        let ciphertext = URL_SAFE_NO_PAD.decode(encrypted).map_err(|_| {
            Error::Corruption(format!("Stored name {:?} is not an encrypted name", encrypted))
        })?;

        let plaintext = self
            .cipher
            .decrypt(&Nonce::default(), ciphertext.as_slice())
            .map_err(|_| {
                Error::Corruption(format!(
                    "Stored name {:?} does not decrypt under this key",
                    encrypted
                ))
            })?;

        String::from_utf8(plaintext).map_err(|_| {
            Error::Corruption(format!(
                "Stored name {:?} decrypts to invalid UTF-8",
                encrypted
            ))
        })
    }
}
