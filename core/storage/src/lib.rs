//! Storage backend abstraction for Xela.
//!
//! This module defines the capability set a vault needs from the storage it
//! decorates, plus two implementations (in-memory and local filesystem).
//!
//! # Design Principles
//! - Reference-addressed: items are reached through opaque refs handed out
//!   by the backend, never through paths the caller builds itself
//! - One trait, many backends: the vault decorator is written once against
//!   [`StorageProvider`] and its associated reference type
//! - Async operations: all I/O goes through `async fn`
//! - Unified error semantics via `xela_common::Error`

pub mod local;
pub mod memory;
pub mod provider;

pub use local::{LocalProvider, LocalRef};
pub use memory::{MemoryProvider, MemoryRef};
pub use provider::{ItemKind, ItemRef, StorageProvider};
