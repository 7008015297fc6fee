//! In-memory storage provider for testing.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::provider::{ItemKind, ItemRef, StorageProvider};
use xela_common::{Error, Result, VaultPath};

/// In-memory storage entry.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8> },
    Directory,
}

impl Entry {
    fn kind(&self) -> ItemKind {
        match self {
            Entry::File { .. } => ItemKind::File,
            Entry::Directory => ItemKind::Directory,
        }
    }
}

/// Reference to an item held by a [`MemoryProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRef {
    path: VaultPath,
    kind: ItemKind,
}

impl MemoryRef {
    pub fn path(&self) -> &VaultPath {
        &self.path
    }
}

impl ItemRef for MemoryRef {
    fn name(&self) -> &str {
        self.path.name().unwrap_or("")
    }

    fn kind(&self) -> ItemKind {
        self.kind
    }
}

/// In-memory storage provider.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop. Entries are kept sorted by path, so listings come
/// back in name order.
#[derive(Clone)]
pub struct MemoryProvider {
    storage: Arc<RwLock<BTreeMap<VaultPath, Entry>>>,
}

impl MemoryProvider {
    /// Create a new provider holding only the root directory.
    pub fn new() -> Self {
        let mut storage = BTreeMap::new();
        storage.insert(VaultPath::root(), Entry::Directory);

        Self {
            storage: Arc::new(RwLock::new(storage)),
        }
    }

    fn read_storage(&self) -> Result<RwLockReadGuard<'_, BTreeMap<VaultPath, Entry>>> {
        self.storage
            .read()
            .map_err(|_| Error::Storage("Memory storage lock poisoned".to_string()))
    }

    fn write_storage(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<VaultPath, Entry>>> {
        self.storage
            .write()
            .map_err(|_| Error::Storage("Memory storage lock poisoned".to_string()))
    }

    fn require_directory(storage: &BTreeMap<VaultPath, Entry>, path: &VaultPath) -> Result<()> {
        match storage.get(path) {
            Some(Entry::Directory) => Ok(()),
            Some(Entry::File { .. }) => {
                Err(Error::InvalidInput(format!("Not a directory: {}", path)))
            }
            None => Err(Error::NotFound(format!("Directory not found: {}", path))),
        }
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    type Ref = MemoryRef;

    fn name(&self) -> &str {
        "memory"
    }

    fn root(&self) -> MemoryRef {
        MemoryRef {
            path: VaultPath::root(),
            kind: ItemKind::Directory,
        }
    }

    async fn list(&self, dir: &MemoryRef) -> Result<Vec<MemoryRef>> {
        let storage = self.read_storage()?;
        Self::require_directory(&storage, &dir.path)?;

        let children: Vec<MemoryRef> = storage
            .range(dir.path.clone()..)
            .filter(|(path, _)| dir.path.is_parent_of(path))
            .map(|(path, entry)| MemoryRef {
                path: path.clone(),
                kind: entry.kind(),
            })
            .collect();

        debug!(dir = %dir.path, count = children.len(), "Listed memory directory");
        Ok(children)
    }

    async fn lookup(&self, dir: &MemoryRef, name: &str) -> Result<MemoryRef> {
        let path = dir.path.join(name)?;
        let storage = self.read_storage()?;
        Self::require_directory(&storage, &dir.path)?;

        match storage.get(&path) {
            Some(entry) => Ok(MemoryRef {
                kind: entry.kind(),
                path,
            }),
            None => Err(Error::NotFound(format!("Path not found: {}", path))),
        }
    }

    async fn create(&self, dir: &MemoryRef, name: &str, kind: ItemKind) -> Result<MemoryRef> {
        let path = dir.path.join(name)?;
        let mut storage = self.write_storage()?;
        Self::require_directory(&storage, &dir.path)?;

        if storage.contains_key(&path) {
            return Err(Error::AlreadyExists(format!(
                "Path already exists: {}",
                path
            )));
        }

        let entry = match kind {
            ItemKind::File => Entry::File { data: Vec::new() },
            ItemKind::Directory => Entry::Directory,
        };
        storage.insert(path.clone(), entry);

        Ok(MemoryRef { path, kind })
    }

    async fn read(&self, item: &MemoryRef) -> Result<Vec<u8>> {
        let storage = self.read_storage()?;

        match storage.get(&item.path) {
            Some(Entry::File { data }) => Ok(data.clone()),
            Some(Entry::Directory) => {
                Err(Error::InvalidInput("Cannot read a directory".to_string()))
            }
            None => Err(Error::NotFound(format!("File not found: {}", item.path))),
        }
    }

    async fn write(&self, item: &MemoryRef, data: Vec<u8>) -> Result<()> {
        let mut storage = self.write_storage()?;

        match storage.get_mut(&item.path) {
            Some(Entry::File { data: existing }) => {
                *existing = data;
                Ok(())
            }
            Some(Entry::Directory) => {
                Err(Error::InvalidInput("Cannot write a directory".to_string()))
            }
            None => Err(Error::NotFound(format!("File not found: {}", item.path))),
        }
    }

    async fn delete(&self, item: &MemoryRef) -> Result<()> {
        if item.path.is_root() {
            return Err(Error::InvalidInput(
                "Cannot delete the root directory".to_string(),
            ));
        }

        let mut storage = self.write_storage()?;
        match storage.get(&item.path) {
            Some(Entry::File { .. }) => {}
            Some(Entry::Directory) => {
                let has_children = storage
                    .range(item.path.clone()..)
                    .any(|(path, _)| item.path.is_parent_of(path));
                if has_children {
                    return Err(Error::InvalidInput(format!(
                        "Directory not empty: {}",
                        item.path
                    )));
                }
            }
            None => return Err(Error::NotFound(format!("Path not found: {}", item.path))),
        }

        storage.remove(&item.path);
        Ok(())
    }
}
