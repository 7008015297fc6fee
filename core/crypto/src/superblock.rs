//! The superblock codec.
//!
//! Each file is divided into superblocks that are 256 bytes large in the
//! encrypted, on-disk format:
//!
//! ```text
//! +----------+-------------------------------------------------+
//! | IV (16)  | AES-256-CBC( length (1) | content (239) )        |
//! +----------+-------------------------------------------------+
//! ```
//!
//! The 240-byte body is exactly 15 AES blocks, so no padding scheme is
//! involved. Bytes of the content area beyond `length` are zero. Every
//! superblock carries its own random IV and decrypts without looking at any
//! other superblock.

use aes::Aes256;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, InnerIvInit, KeyInit};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::keys::ContentKey;
use xela_common::{Error, Result};

/// Size of one superblock on disk.
pub const SUPERBLOCK_SIZE: usize = 256;

/// Size of the random IV at the start of each superblock.
pub const IV_SIZE: usize = 16;

/// Number of plaintext bytes one superblock can hold.
pub const PAYLOAD_SIZE: usize = 239;

/// Encrypted part of a superblock: length byte plus payload.
const BODY_SIZE: usize = SUPERBLOCK_SIZE - IV_SIZE;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encrypts and decrypts single superblocks.
///
/// The AES key schedule is computed once in [`SuperblockCodec::new`]; each
/// call only sets up CBC state for its own IV. Methods take `&self`, so one
/// codec can be shared between tasks.
#[derive(Clone)]
pub struct SuperblockCodec {
    cipher: Aes256,
}

impl SuperblockCodec {
    pub fn new(key: &ContentKey) -> Self {
        Self {
            cipher: Aes256::new(key.as_bytes().into()),
        }
    }

    /// Build a codec from a raw key of unchecked length.
    ///
    /// # Errors
    /// - `Error::Key` if `key` is not 32 bytes
    pub fn from_slice(key: &[u8]) -> Result<Self> {
        let cipher = Aes256::new_from_slice(key).map_err(|_| {
            Error::Key(format!(
                "Invalid key length: expected 32, got {}",
                key.len()
            ))
        })?;
        Ok(Self { cipher })
    }

    /// Encrypt up to [`PAYLOAD_SIZE`] bytes into one superblock.
    ///
    /// # Preconditions
    /// - `dst` is exactly [`SUPERBLOCK_SIZE`] bytes
    /// - `plaintext` is at most [`PAYLOAD_SIZE`] bytes
    ///
    /// # Errors
    /// - `Error::Size` if either buffer violates the above
    /// - `Error::Randomness` if the OS random source fails; nothing falls
    ///   back to a weaker generator
    pub fn encrypt_superblock(&self, dst: &mut [u8], plaintext: &[u8]) -> Result<()> {
        if dst.len() != SUPERBLOCK_SIZE {
            return Err(Error::size(
                "superblock destination",
                SUPERBLOCK_SIZE,
                dst.len(),
            ));
        }
        if plaintext.len() > PAYLOAD_SIZE {
            return Err(Error::size(
                "superblock plaintext limit",
                PAYLOAD_SIZE,
                plaintext.len(),
            ));
        }

        let (iv, body) = dst.split_at_mut(IV_SIZE);
        OsRng
            .try_fill_bytes(iv)
            .map_err(|e| Error::Randomness(format!("Failed to generate IV: {}", e)))?;

        body[0] = plaintext.len() as u8;
        body[1..=plaintext.len()].copy_from_slice(plaintext);
        body[1 + plaintext.len()..].fill(0);

        Aes256CbcEnc::inner_iv_slice_init(self.cipher.clone(), iv)
            .map_err(|_| Error::size("superblock IV", IV_SIZE, iv.len()))?
            .encrypt_padded_mut::<NoPadding>(body, BODY_SIZE)
            .map_err(|_| Error::size("superblock body", BODY_SIZE, BODY_SIZE))?;

        Ok(())
    }

    /// Decrypt one superblock.
    ///
    /// Writes the 239 content bytes (including padding) to `dst` and returns
    /// the recovered length byte. The length byte is returned as-is; callers
    /// decide what an out-of-range value means.
    ///
    /// # Errors
    /// - `Error::Size` if `src` is not [`SUPERBLOCK_SIZE`] bytes or `dst` is
    ///   not [`PAYLOAD_SIZE`] bytes
    pub fn decrypt_superblock(&self, dst: &mut [u8], src: &[u8]) -> Result<u8> {
        if src.len() != SUPERBLOCK_SIZE {
            return Err(Error::size("superblock", SUPERBLOCK_SIZE, src.len()));
        }
        if dst.len() != PAYLOAD_SIZE {
            return Err(Error::size(
                "superblock plaintext destination",
                PAYLOAD_SIZE,
                dst.len(),
            ));
        }

        let (iv, ciphertext) = src.split_at(IV_SIZE);
        let mut body = [0u8; BODY_SIZE];

        Aes256CbcDec::inner_iv_slice_init(self.cipher.clone(), iv)
            .map_err(|_| Error::size("superblock IV", IV_SIZE, iv.len()))?
            .decrypt_padded_b2b_mut::<NoPadding>(ciphertext, &mut body)
            .map_err(|_| Error::size("superblock body", BODY_SIZE, ciphertext.len()))?;

        let length = body[0];
        dst.copy_from_slice(&body[1..]);
        body.zeroize();

        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbc::cipher::KeyIvInit;

    fn codec() -> SuperblockCodec {
        SuperblockCodec::new(&ContentKey::from_bytes([42u8; 32]))
    }

    #[test]
    fn test_roundtrip() {
        let codec = codec();
        let plaintext = b"Hello, superblock!";

        let mut block = [0u8; SUPERBLOCK_SIZE];
        codec.encrypt_superblock(&mut block, plaintext).unwrap();

        let mut out = [0u8; PAYLOAD_SIZE];
        let length = codec.decrypt_superblock(&mut out, &block).unwrap();

        assert_eq!(length as usize, plaintext.len());
        assert_eq!(&out[..plaintext.len()], plaintext);
        assert!(out[plaintext.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_full_and_empty_payload() {
        let codec = codec();
        let mut block = [0u8; SUPERBLOCK_SIZE];
        let mut out = [0u8; PAYLOAD_SIZE];

        let full = [0xABu8; PAYLOAD_SIZE];
        codec.encrypt_superblock(&mut block, &full).unwrap();
        assert_eq!(codec.decrypt_superblock(&mut out, &block).unwrap(), 239);
        assert_eq!(out, full);

        codec.encrypt_superblock(&mut block, &[]).unwrap();
        assert_eq!(codec.decrypt_superblock(&mut out, &block).unwrap(), 0);
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let codec = codec();
        let plaintext = b"Same plaintext";

        let mut block1 = [0u8; SUPERBLOCK_SIZE];
        let mut block2 = [0u8; SUPERBLOCK_SIZE];
        codec.encrypt_superblock(&mut block1, plaintext).unwrap();
        codec.encrypt_superblock(&mut block2, plaintext).unwrap();

        assert_ne!(&block1[..IV_SIZE], &block2[..IV_SIZE]);
        assert_ne!(&block1[IV_SIZE..], &block2[IV_SIZE..]);
    }

    #[test]
    fn test_matches_plain_cbc() {
        let key = [42u8; 32];
        let plaintext = b"format check";

        let mut block = [0u8; SUPERBLOCK_SIZE];
        codec().encrypt_superblock(&mut block, plaintext).unwrap();

        let mut expected = [0u8; BODY_SIZE];
        expected[0] = plaintext.len() as u8;
        expected[1..=plaintext.len()].copy_from_slice(plaintext);
        Aes256CbcEnc::new(&key.into(), (&block[..IV_SIZE]).into())
            .encrypt_padded_mut::<NoPadding>(&mut expected, BODY_SIZE)
            .unwrap();

        assert_eq!(&block[IV_SIZE..], &expected[..]);
    }

    #[test]
    fn test_size_contracts() {
        let codec = codec();
        let mut out = [0u8; PAYLOAD_SIZE];

        for len in [255, 257] {
            let src = vec![0u8; len];
            let err = codec.decrypt_superblock(&mut out, &src).unwrap_err();
            assert!(matches!(err, Error::Size { actual, .. } if actual == len));
        }

        let src = [0u8; SUPERBLOCK_SIZE];
        let mut short = [0u8; PAYLOAD_SIZE - 1];
        assert!(matches!(
            codec.decrypt_superblock(&mut short, &src),
            Err(Error::Size { .. })
        ));

        let mut small_dst = [0u8; SUPERBLOCK_SIZE - 1];
        assert!(matches!(
            codec.encrypt_superblock(&mut small_dst, b"x"),
            Err(Error::Size { .. })
        ));

        let mut dst = [0u8; SUPERBLOCK_SIZE];
        assert!(matches!(
            codec.encrypt_superblock(&mut dst, &[0u8; PAYLOAD_SIZE + 1]),
            Err(Error::Size { .. })
        ));
    }

    #[test]
    fn test_wrong_key_yields_garbage_not_panic() {
        let mut block = [0u8; SUPERBLOCK_SIZE];
        codec().encrypt_superblock(&mut block, b"secret").unwrap();

        let other = SuperblockCodec::new(&ContentKey::from_bytes([1u8; 32]));
        let mut out = [0u8; PAYLOAD_SIZE];
        other.decrypt_superblock(&mut out, &block).unwrap();
        assert_ne!(&out[..6], b"secret");
    }

    #[test]
    fn test_from_slice_checks_key_length() {
        assert!(matches!(
            SuperblockCodec::from_slice(&[0u8; 16]),
            Err(Error::Key(_))
        ));
        assert!(SuperblockCodec::from_slice(&[0u8; 32]).is_ok());
    }
}
