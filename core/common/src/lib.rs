//! Common utilities and types shared across the Xela crates.
//!
//! This module provides the error taxonomy used by every layer of the vault
//! and the small value types (paths, sensitive buffers) they exchange.

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::{SensitiveBytes, VaultPath};
