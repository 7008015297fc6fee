//! Vault file operations with encryption/decryption.
//!
//! [`Vault`] implements [`StorageProvider`] over any backend. Addressing is
//! delegated to the backend; names and contents are encrypted on the way in
//! and decrypted on the way out.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::CONFIG_FILENAME;
use crate::session::Vault;
use xela_common::{Error, Result};
use xela_storage::{ItemKind, ItemRef, StorageProvider};

/// Reference to an item inside a vault.
///
/// Wraps exactly one backend reference together with the item's decrypted
/// name.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultRef<R> {
    inner: R,
    name: String,
}

impl<R: ItemRef> VaultRef<R> {
    /// The backend reference, whose name is the encrypted name.
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: ItemRef> ItemRef for VaultRef<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ItemKind {
        self.inner.kind()
    }
}

impl<P: StorageProvider> Vault<P> {
    fn wrap(&self, inner: P::Ref) -> Result<VaultRef<P::Ref>> {
        let name = self.names.decrypt(inner.name())?;
        Ok(VaultRef { inner, name })
    }

    /// Explain a failed lookup in `dir`.
    ///
    /// A name encrypted under the wrong key never matches, so a miss in a
    /// directory whose siblings do not decrypt is reported as `Corruption`
    /// instead of `NotFound`.
    async fn lookup_miss(&self, dir: &VaultRef<P::Ref>, name: &str) -> Error {
        let siblings = match self.inner.list(&dir.inner).await {
            Ok(siblings) => siblings,
            Err(e) => return e,
        };

        let foreign = siblings
            .iter()
            .filter(|item| !self.is_config_item(&dir.inner, item))
            .find(|item| self.names.decrypt(item.name()).is_err());

        match foreign {
            Some(item) => {
                warn!(dir = %dir.name, "Lookup miss in directory with undecryptable names");
                Error::Corruption(format!(
                    "Cannot look up {:?}: stored name {:?} in directory {:?} does not \
                     decrypt under this key (wrong password?)",
                    name,
                    item.name(),
                    dir.name
                ))
            }
            None => Error::NotFound(format!("No item {:?} in directory {:?}", name, dir.name)),
        }
    }

    fn is_config_item(&self, dir: &P::Ref, item: &P::Ref) -> bool {
        item.kind() == ItemKind::File
            && item.name() == CONFIG_FILENAME
            && *dir == self.inner.root()
    }
}

#[async_trait]
impl<P: StorageProvider> StorageProvider for Vault<P> {
    type Ref = VaultRef<P::Ref>;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn root(&self) -> Self::Ref {
        VaultRef {
            inner: self.inner.root(),
            name: String::new(),
        }
    }

    async fn list(&self, dir: &Self::Ref) -> Result<Vec<Self::Ref>> {
        let children = self.inner.list(&dir.inner).await?;

        let mut results = Vec::with_capacity(children.len());
        for child in children {
            if self.is_config_item(&dir.inner, &child) {
                continue;
            }

            match self.wrap(child) {
                Ok(item) => results.push(item),
                Err(e) => {
                    warn!(dir = %dir.name, error = %e, "Undecryptable name, aborting listing");
                    return Err(e);
                }
            }
        }

        debug!(dir = %dir.name, count = results.len(), "Listed vault directory");
        Ok(results)
    }

    async fn lookup(&self, dir: &Self::Ref, name: &str) -> Result<Self::Ref> {
        let encrypted = self.names.encrypt(name)?;

        let inner = match self.inner.lookup(&dir.inner, &encrypted).await {
            Ok(inner) => inner,
            Err(Error::NotFound(_)) => return Err(self.lookup_miss(dir, name).await),
            Err(e) => return Err(e),
        };

        Ok(VaultRef {
            inner,
            name: name.to_string(),
        })
    }

    async fn create(&self, dir: &Self::Ref, name: &str, kind: ItemKind) -> Result<Self::Ref> {
        let encrypted = self.names.encrypt(name)?;

        let inner = self
            .inner
            .create(&dir.inner, &encrypted, kind)
            .await
            .map_err(|e| match e {
                Error::AlreadyExists(_) => Error::AlreadyExists(format!(
                    "Item {:?} already exists in directory {:?}",
                    name, dir.name
                )),
                other => other,
            })?;

        let item = self.wrap(inner)?;
        info!(kind = ?kind, "Vault item created");
        Ok(item)
    }

    async fn read(&self, item: &Self::Ref) -> Result<Vec<u8>> {
        let ciphertext = self.inner.read(&item.inner).await?;

        let plaintext = self.decrypter.decrypt(&ciphertext).map_err(|e| match e {
            Error::Corruption(msg) => Error::Corruption(format!("{:?}: {}", item.name, msg)),
            other => other,
        })?;

        debug!(size = plaintext.len(), "Read vault file");
        Ok(plaintext)
    }

    async fn write(&self, item: &Self::Ref, data: Vec<u8>) -> Result<()> {
        let ciphertext = if self.options.minimal_diff {
            let previous = self.inner.read(&item.inner).await?;
            self.encrypter.encrypt_minimal_diff(&data, &previous)?
        } else {
            self.encrypter.encrypt(&data)?
        };

        let stored = ciphertext.len();
        self.inner.write(&item.inner, ciphertext).await?;

        info!(
            size = data.len(),
            stored,
            minimal_diff = self.options.minimal_diff,
            "Vault file written"
        );
        Ok(())
    }

    async fn delete(&self, item: &Self::Ref) -> Result<()> {
        self.inner.delete(&item.inner).await?;

        info!(kind = ?item.kind(), "Vault item deleted");
        Ok(())
    }
}
