//! Storage provider trait definition.

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use xela_common::Result;

/// Whether a stored item is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    File,
    Directory,
}

impl ItemKind {
    pub fn is_directory(self) -> bool {
        self == ItemKind::Directory
    }
}

/// Opaque handle to an item in a backend.
///
/// Refs are only ever produced by the backend itself (`root`, `list`,
/// `lookup`, `create`). The name is the item's name as stored in its parent
/// directory; the root's name is empty.
pub trait ItemRef: Clone + Debug + PartialEq + Send + Sync + 'static {
    fn name(&self) -> &str;

    fn kind(&self) -> ItemKind;

    fn is_directory(&self) -> bool {
        self.kind().is_directory()
    }
}

/// Storage provider trait for different backends.
///
/// Items are addressed through the provider's own [`ItemRef`] type. A
/// decorator can therefore wrap any provider and expose the same trait with a
/// reference type of its own.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    type Ref: ItemRef;

    /// Get the provider name (e.g., "local", "memory").
    fn name(&self) -> &str;

    /// Reference to the root directory.
    fn root(&self) -> Self::Ref;

    /// List the direct children of a directory.
    ///
    /// # Errors
    /// - `NotFound` if `dir` no longer exists
    /// - `InvalidInput` if `dir` is a file
    async fn list(&self, dir: &Self::Ref) -> Result<Vec<Self::Ref>>;

    /// Find a direct child of `dir` by name.
    ///
    /// # Errors
    /// - `NotFound` if there is no such child
    async fn lookup(&self, dir: &Self::Ref, name: &str) -> Result<Self::Ref>;

    /// Create a new file or directory inside `dir`.
    ///
    /// # Postconditions
    /// - A new file is empty
    ///
    /// # Errors
    /// - `AlreadyExists` if `name` is taken
    /// - `NotFound` if `dir` does not exist
    async fn create(&self, dir: &Self::Ref, name: &str, kind: ItemKind) -> Result<Self::Ref>;

    /// Read the complete content of a file.
    ///
    /// # Errors
    /// - `NotFound` if the file does not exist
    /// - `InvalidInput` if `item` is a directory
    async fn read(&self, item: &Self::Ref) -> Result<Vec<u8>>;

    /// Replace the complete content of a file.
    ///
    /// # Errors
    /// - `NotFound` if the file does not exist
    /// - `InvalidInput` if `item` is a directory
    async fn write(&self, item: &Self::Ref, data: Vec<u8>) -> Result<()>;

    /// Delete a file or an empty directory.
    ///
    /// # Errors
    /// - `NotFound` if the item does not exist
    /// - `InvalidInput` if `item` is a non-empty directory or the root
    async fn delete(&self, item: &Self::Ref) -> Result<()>;
}

#[async_trait]
impl<P: StorageProvider + ?Sized> StorageProvider for Arc<P> {
    type Ref = P::Ref;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn root(&self) -> Self::Ref {
        (**self).root()
    }

    async fn list(&self, dir: &Self::Ref) -> Result<Vec<Self::Ref>> {
        (**self).list(dir).await
    }

    async fn lookup(&self, dir: &Self::Ref, name: &str) -> Result<Self::Ref> {
        (**self).lookup(dir, name).await
    }

    async fn create(&self, dir: &Self::Ref, name: &str, kind: ItemKind) -> Result<Self::Ref> {
        (**self).create(dir, name, kind).await
    }

    async fn read(&self, item: &Self::Ref) -> Result<Vec<u8>> {
        (**self).read(item).await
    }

    async fn write(&self, item: &Self::Ref, data: Vec<u8>) -> Result<()> {
        (**self).write(item, data).await
    }

    async fn delete(&self, item: &Self::Ref) -> Result<()> {
        (**self).delete(item).await
    }
}
