//! Local filesystem storage provider.

use async_trait::async_trait;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::provider::{ItemKind, ItemRef, StorageProvider};
use xela_common::{Error, Result, VaultPath};

/// Reference to an item below a [`LocalProvider`] root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRef {
    path: VaultPath,
    kind: ItemKind,
}

impl LocalRef {
    pub fn path(&self) -> &VaultPath {
        &self.path
    }
}

impl ItemRef for LocalRef {
    fn name(&self) -> &str {
        self.path.name().unwrap_or("")
    }

    fn kind(&self) -> ItemKind {
        self.kind
    }
}

/// Local filesystem storage provider.
///
/// Stores vault data in a local directory structure. Every item name maps to
/// one directory entry.
pub struct LocalProvider {
    root: PathBuf,
}

impl LocalProvider {
    /// Create a new local provider with the given root directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Permission denied or other I/O failure while creating the root
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }

        Ok(Self { root })
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Convert a VaultPath to a filesystem path.
    fn to_fs_path(&self, path: &VaultPath) -> PathBuf {
        let mut fs_path = self.root.clone();
        for component in path.components() {
            fs_path.push(component);
        }
        fs_path
    }

    /// Kind of the item at `path`, mapping a missing entry to `NotFound`.
    async fn kind_of(&self, path: &VaultPath) -> Result<ItemKind> {
        let fs_meta = fs::metadata(self.to_fs_path(path))
            .await
            .map_err(|e| io_error(e, path))?;

        Ok(if fs_meta.is_dir() {
            ItemKind::Directory
        } else {
            ItemKind::File
        })
    }

    async fn require_directory(&self, path: &VaultPath) -> Result<()> {
        match self.kind_of(path).await? {
            ItemKind::Directory => Ok(()),
            ItemKind::File => Err(Error::InvalidInput(format!("Not a directory: {}", path))),
        }
    }

    async fn require_file(&self, path: &VaultPath) -> Result<()> {
        match self.kind_of(path).await? {
            ItemKind::File => Ok(()),
            ItemKind::Directory => Err(Error::InvalidInput(format!(
                "Not a file: {}",
                path
            ))),
        }
    }
}

fn io_error(err: std::io::Error, path: &VaultPath) -> Error {
    match err.kind() {
        IoErrorKind::NotFound => Error::NotFound(format!("Path not found: {}", path)),
        IoErrorKind::AlreadyExists => {
            Error::AlreadyExists(format!("Path already exists: {}", path))
        }
        _ => Error::Io(err),
    }
}

#[async_trait]
impl StorageProvider for LocalProvider {
    type Ref = LocalRef;

    fn name(&self) -> &str {
        "local"
    }

    fn root(&self) -> LocalRef {
        LocalRef {
            path: VaultPath::root(),
            kind: ItemKind::Directory,
        }
    }

    async fn list(&self, dir: &LocalRef) -> Result<Vec<LocalRef>> {
        self.require_directory(&dir.path).await?;

        let mut results = Vec::new();
        let mut entries = fs::read_dir(self.to_fs_path(&dir.path))
            .await
            .map_err(|e| io_error(e, &dir.path))?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().into_string().map_err(|raw| {
                Error::Storage(format!(
                    "Entry {:?} in {} is not valid UTF-8",
                    raw, dir.path
                ))
            })?;

            let kind = if entry.file_type().await?.is_dir() {
                ItemKind::Directory
            } else {
                ItemKind::File
            };

            results.push(LocalRef {
                path: dir.path.join(&name)?,
                kind,
            });
        }

        results.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(dir = %dir.path, count = results.len(), "Listed local directory");
        Ok(results)
    }

    async fn lookup(&self, dir: &LocalRef, name: &str) -> Result<LocalRef> {
        let path = dir.path.join(name)?;
        self.require_directory(&dir.path).await?;

        let kind = self.kind_of(&path).await?;
        Ok(LocalRef { path, kind })
    }

    async fn create(&self, dir: &LocalRef, name: &str, kind: ItemKind) -> Result<LocalRef> {
        let path = dir.path.join(name)?;
        self.require_directory(&dir.path).await?;

        let fs_path = self.to_fs_path(&path);
        match kind {
            ItemKind::File => {
                fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&fs_path)
                    .await
                    .map_err(|e| io_error(e, &path))?;
            }
            ItemKind::Directory => {
                fs::create_dir(&fs_path)
                    .await
                    .map_err(|e| io_error(e, &path))?;
            }
        }

        Ok(LocalRef { path, kind })
    }

    async fn read(&self, item: &LocalRef) -> Result<Vec<u8>> {
        self.require_file(&item.path).await?;

        fs::read(self.to_fs_path(&item.path))
            .await
            .map_err(|e| io_error(e, &item.path))
    }

    async fn write(&self, item: &LocalRef, data: Vec<u8>) -> Result<()> {
        self.require_file(&item.path).await?;

        fs::write(self.to_fs_path(&item.path), &data)
            .await
            .map_err(|e| io_error(e, &item.path))
    }

    async fn delete(&self, item: &LocalRef) -> Result<()> {
        if item.path.is_root() {
            return Err(Error::InvalidInput(
                "Cannot delete the root directory".to_string(),
            ));
        }

        let fs_path = self.to_fs_path(&item.path);
        match self.kind_of(&item.path).await? {
            ItemKind::File => fs::remove_file(&fs_path).await?,
            ItemKind::Directory => {
                let mut entries = fs::read_dir(&fs_path).await?;
                if entries.next_entry().await?.is_some() {
                    return Err(Error::InvalidInput(format!(
                        "Directory not empty: {}",
                        item.path
                    )));
                }
                fs::remove_dir(&fs_path).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_write_read() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path()).unwrap();
        let root = provider.root();

        let file = provider
            .create(&root, "test.txt", ItemKind::File)
            .await
            .unwrap();
        assert!(provider.read(&file).await.unwrap().is_empty());

        let data = b"Hello, Local!".to_vec();
        provider.write(&file, data.clone()).await.unwrap();

        assert_eq!(provider.read(&file).await.unwrap(), data);
        assert_eq!(std::fs::read(temp.path().join("test.txt")).unwrap(), data);
    }

    #[tokio::test]
    async fn test_local_create_dir() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path()).unwrap();

        let dir = provider
            .create(&provider.root(), "mydir", ItemKind::Directory)
            .await
            .unwrap();
        assert!(dir.is_directory());
        assert!(temp.path().join("mydir").is_dir());

        let err = provider
            .create(&provider.root(), "mydir", ItemKind::File)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_local_list_and_lookup() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path()).unwrap();
        let root = provider.root();

        let dir = provider
            .create(&root, "dir", ItemKind::Directory)
            .await
            .unwrap();
        provider.create(&dir, "file2.txt", ItemKind::File).await.unwrap();
        provider.create(&dir, "file1.txt", ItemKind::File).await.unwrap();

        let contents = provider.list(&dir).await.unwrap();
        let names: Vec<&str> = contents.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["file1.txt", "file2.txt"]);

        let found = provider.lookup(&root, "dir").await.unwrap();
        assert_eq!(found, dir);
        assert!(matches!(
            provider.lookup(&dir, "nope").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_delete() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path()).unwrap();
        let root = provider.root();

        let dir = provider
            .create(&root, "dir", ItemKind::Directory)
            .await
            .unwrap();
        let file = provider.create(&dir, "f", ItemKind::File).await.unwrap();

        assert!(matches!(
            provider.delete(&dir).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            provider.read(&dir).await,
            Err(Error::InvalidInput(_))
        ));

        provider.delete(&file).await.unwrap();
        provider.delete(&dir).await.unwrap();
        assert!(provider.list(&root).await.unwrap().is_empty());
        assert!(matches!(
            provider.delete(&file).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_local_missing_parent() {
        let temp = TempDir::new().unwrap();
        let provider = LocalProvider::new(temp.path()).unwrap();
        let dir = provider
            .create(&provider.root(), "tmp", ItemKind::Directory)
            .await
            .unwrap();
        std::fs::remove_dir(temp.path().join("tmp")).unwrap();

        let err = provider
            .create(&dir, "f", ItemKind::File)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
