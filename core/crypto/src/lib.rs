//! Cryptographic primitives for Xela.
//!
//! This module provides:
//! - Key derivation using Argon2id
//! - The superblock codec: AES-256-CBC over fixed 256-byte on-disk units
//! - Whole-file encryption as a sequence of independent superblocks
//! - Deterministic, authenticated filename encryption (AES-256-SIV)
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Every superblock gets a fresh IV from the operating system RNG
//!
//! File contents are encrypted for confidentiality only. A superblock carries
//! no authentication tag, so tampering is detected only when it produces an
//! out-of-range length byte. Filenames are authenticated.

pub mod file;
pub mod kdf;
pub mod keys;
pub mod names;
pub mod superblock;

pub use file::{plaintext_capacity, superblock_count, FileDecrypter, FileEncrypter};
pub use kdf::{derive_key, KdfParams};
pub use keys::{ContentKey, MasterKey, NameKey, Salt, KEY_LENGTH};
pub use names::{FilenameCodec, MAX_NAME_LEN};
pub use superblock::{SuperblockCodec, IV_SIZE, PAYLOAD_SIZE, SUPERBLOCK_SIZE};
