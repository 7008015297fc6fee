//! Vault engine for Xela.
//!
//! This module provides:
//! - The vault configuration object stored next to the encrypted data
//! - [`Vault`], a decorator that wraps any [`StorageProvider`] and exposes
//!   the same trait with encrypted names and contents
//!
//! # Architecture
//! The vault sits between the user interface and a storage provider. The
//! provider addresses items; the vault interposes encryption at the
//! boundary and never keeps an index of its own.
//!
//! [`StorageProvider`]: xela_storage::StorageProvider

pub mod config;
pub mod operations;
pub mod session;

pub use config::{VaultConfig, VaultVersion, CONFIG_FILENAME};
pub use operations::VaultRef;
pub use session::{Vault, VaultOptions};
