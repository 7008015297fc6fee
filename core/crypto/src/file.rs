//! Whole-file encryption as a sequence of superblocks.
//!
//! A file of `n` plaintext bytes becomes `ceil(n / 239)` superblocks, i.e.
//! exactly `ceil(n / 239) * 256` bytes of ciphertext. An empty file has no
//! superblocks at all.

use tracing::debug;
use zeroize::Zeroizing;

use crate::keys::ContentKey;
use crate::superblock::{SuperblockCodec, PAYLOAD_SIZE, SUPERBLOCK_SIZE};
use xela_common::{Error, Result};

/// Number of superblocks needed for `plaintext_len` bytes.
pub fn superblock_count(plaintext_len: usize) -> usize {
    plaintext_len.div_ceil(PAYLOAD_SIZE)
}

/// Upper bound on the plaintext held by `ciphertext_len` bytes of superblocks.
pub fn plaintext_capacity(ciphertext_len: usize) -> usize {
    ciphertext_len / SUPERBLOCK_SIZE * PAYLOAD_SIZE
}

fn check_ciphertext_len(len: usize) -> Result<()> {
    if len % SUPERBLOCK_SIZE != 0 {
        return Err(Error::Corruption(format!(
            "ciphertext length {} is not a multiple of {}",
            len, SUPERBLOCK_SIZE
        )));
    }
    Ok(())
}

/// Splits files into encrypted superblocks.
#[derive(Clone)]
pub struct FileEncrypter {
    codec: SuperblockCodec,
}

impl FileEncrypter {
    pub fn new(key: &ContentKey) -> Self {
        Self {
            codec: SuperblockCodec::new(key),
        }
    }

    /// Encrypt a whole file. Every superblock gets a fresh IV.
    ///
    /// # Errors
    /// - `Error::Randomness` if an IV cannot be generated
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut ciphertext = vec![0u8; superblock_count(plaintext.len()) * SUPERBLOCK_SIZE];

        for (chunk, block) in plaintext
            .chunks(PAYLOAD_SIZE)
            .zip(ciphertext.chunks_exact_mut(SUPERBLOCK_SIZE))
        {
            self.codec.encrypt_superblock(block, chunk)?;
        }

        Ok(ciphertext)
    }

    /// Encrypt a file while keeping the byte-level diff against `previous`
    /// small.
    ///
    /// Superblock `i` of `previous` is copied verbatim when it decrypts to
    /// exactly chunk `i` of `plaintext`. Every other chunk (changed, new, or
    /// unreadable in `previous`) is encrypted with a fresh IV. Reusing a
    /// block reveals that the chunk did not change.
    ///
    /// # Errors
    /// - `Error::Randomness` if an IV cannot be generated
    pub fn encrypt_minimal_diff(&self, plaintext: &[u8], previous: &[u8]) -> Result<Vec<u8>> {
        let count = superblock_count(plaintext.len());
        let mut ciphertext = vec![0u8; count * SUPERBLOCK_SIZE];
        let mut scratch = Zeroizing::new([0u8; PAYLOAD_SIZE]);
        let mut reused = 0usize;

        for (index, (chunk, block)) in plaintext
            .chunks(PAYLOAD_SIZE)
            .zip(ciphertext.chunks_exact_mut(SUPERBLOCK_SIZE))
            .enumerate()
        {
            let old = previous.get(index * SUPERBLOCK_SIZE..(index + 1) * SUPERBLOCK_SIZE);
            if let Some(old) = old {
                let unchanged = match self.codec.decrypt_superblock(&mut scratch[..], old) {
                    Ok(length) => {
                        length as usize == chunk.len() && &scratch[..chunk.len()] == chunk
                    }
                    Err(_) => false,
                };
                if unchanged {
                    block.copy_from_slice(old);
                    reused += 1;
                    continue;
                }
            }
            self.codec.encrypt_superblock(block, chunk)?;
        }

        debug!(superblocks = count, reused, "Re-encrypted file with minimal diff");
        Ok(ciphertext)
    }
}

/// Reassembles plaintext from encrypted superblocks.
#[derive(Clone)]
pub struct FileDecrypter {
    codec: SuperblockCodec,
}

impl FileDecrypter {
    pub fn new(key: &ContentKey) -> Self {
        Self {
            codec: SuperblockCodec::new(key),
        }
    }

    /// Decrypt a whole file.
    ///
    /// # Errors
    /// - `Error::Corruption` if the length is not a multiple of 256 or any
    ///   length byte exceeds 239 (the message names the superblock index)
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        check_ciphertext_len(ciphertext.len())?;

        let mut plaintext = Vec::with_capacity(plaintext_capacity(ciphertext.len()));
        let mut buf = Zeroizing::new([0u8; PAYLOAD_SIZE]);

        for (index, block) in ciphertext.chunks_exact(SUPERBLOCK_SIZE).enumerate() {
            let length = self.decrypt_block(index, block, &mut buf)?;
            plaintext.extend_from_slice(&buf[..length]);
        }

        Ok(plaintext)
    }

    /// Decrypt only superblock `index` of a file.
    ///
    /// No other superblock is read, so damage elsewhere in the file does not
    /// matter.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if `index` is past the last superblock
    /// - `Error::Corruption` as for [`FileDecrypter::decrypt`]
    pub fn decrypt_superblock_at(&self, ciphertext: &[u8], index: usize) -> Result<Vec<u8>> {
        check_ciphertext_len(ciphertext.len())?;

        let block = ciphertext
            .chunks_exact(SUPERBLOCK_SIZE)
            .nth(index)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "superblock {} out of range ({} superblocks)",
                    index,
                    ciphertext.len() / SUPERBLOCK_SIZE
                ))
            })?;

        let mut buf = Zeroizing::new([0u8; PAYLOAD_SIZE]);
        let length = self.decrypt_block(index, block, &mut buf)?;
        Ok(buf[..length].to_vec())
    }

    fn decrypt_block(&self, index: usize, block: &[u8], buf: &mut [u8; PAYLOAD_SIZE]) -> Result<usize> {
        let length = self.codec.decrypt_superblock(&mut buf[..], block)? as usize;
        if length > PAYLOAD_SIZE {
            return Err(Error::Corruption(format!(
                "superblock {}: length byte {} exceeds {}",
                index, length, PAYLOAD_SIZE
            )));
        }
        Ok(length)
    }
}
