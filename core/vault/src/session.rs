//! Vault session management.
//!
//! A [`Vault`] is created by opening (or creating) the configuration object
//! in a backend. Opening derives the master key once and builds the codecs
//! from it; the codecs own the only copies of key material, which is
//! zeroized when the vault is dropped.

use tracing::{debug, info, warn};

use crate::config::{VaultConfig, CONFIG_FILENAME};
use xela_common::{Error, Result, SensitiveBytes};
use xela_crypto::{derive_key, FileDecrypter, FileEncrypter, FilenameCodec, KdfParams};
use xela_storage::{ItemKind, ItemRef, StorageProvider};

/// Session options that change how the vault writes data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VaultOptions {
    /// Re-use the previous ciphertext of every superblock whose plaintext
    /// did not change. Costs one extra backend read per write; leaks which
    /// superblocks changed.
    pub minimal_diff: bool,
}

/// An open vault over a storage provider.
///
/// `Vault<P>` implements [`StorageProvider`] itself (see the `operations`
/// module), so it can be used anywhere the wrapped backend could.
pub struct Vault<P: StorageProvider> {
    pub(crate) inner: P,
    pub(crate) config: VaultConfig,
    pub(crate) options: VaultOptions,
    pub(crate) encrypter: FileEncrypter,
    pub(crate) decrypter: FileDecrypter,
    pub(crate) names: FilenameCodec,
}

impl<P: StorageProvider> Vault<P> {
    /// Open an existing vault.
    ///
    /// There is no password check: a wrong password yields a vault whose
    /// operations fail with `Corruption` once they touch encrypted names.
    ///
    /// # Errors
    /// - `Error::Configuration` if the configuration object is missing,
    ///   unreadable or malformed
    /// - `Error::InvalidInput` if the password is empty
    /// - `Error::Key` if key derivation fails
    pub async fn open(inner: P, password: &[u8]) -> Result<Self> {
        let root = inner.root();
        let stored = match inner.lookup(&root, CONFIG_FILENAME).await {
            Ok(item) => inner.read(&item).await,
            Err(e) => Err(e),
        }
        .map_err(|e| {
            Error::Configuration(format!(
                "Cannot read {} from {} backend: {}",
                CONFIG_FILENAME,
                inner.name(),
                e
            ))
        })?;

        let config = VaultConfig::from_bytes(&stored)?;
        debug!(
            backend = inner.name(),
            version_major = config.version.major,
            version_minor = config.version.minor,
            "Loaded vault configuration"
        );

        Self::unlock(inner, config, password).await
    }

    /// Create a new vault in an empty backend and open it.
    ///
    /// # Errors
    /// - `Error::AlreadyExists` if the backend already holds a configuration
    /// - `Error::InvalidInput` if the backend root holds other items or the
    ///   password is empty
    /// - `Error::Configuration` if `kdf_parameters` are invalid
    /// - Backend errors while writing the configuration; the partially
    ///   written configuration is removed again
    pub async fn create(inner: P, password: &[u8], kdf_parameters: KdfParams) -> Result<Self> {
        if password.is_empty() {
            return Err(Error::InvalidInput("Password cannot be empty".to_string()));
        }

        let config = VaultConfig::new(kdf_parameters)?;
        let root = inner.root();

        let existing = inner.list(&root).await?;
        if existing.iter().any(|item| item.name() == CONFIG_FILENAME) {
            return Err(Error::AlreadyExists(format!(
                "A vault already exists in this {} backend",
                inner.name()
            )));
        }
        if !existing.is_empty() {
            return Err(Error::InvalidInput(format!(
                "The {} backend root is not empty ({} items)",
                inner.name(),
                existing.len()
            )));
        }

        let item = inner
            .create(&root, CONFIG_FILENAME, ItemKind::File)
            .await
            .map_err(|e| match e {
                Error::AlreadyExists(_) => Error::AlreadyExists(format!(
                    "A vault already exists in this {} backend",
                    inner.name()
                )),
                other => other,
            })?;

        let written = match config.to_bytes() {
            Ok(bytes) => inner.write(&item, bytes).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = inner.delete(&item).await {
                warn!(error = %cleanup, "Failed to remove partial vault configuration");
            }
            return Err(e);
        }

        info!(backend = inner.name(), "Vault created");
        Self::unlock(inner, config, password).await
    }

    async fn unlock(inner: P, config: VaultConfig, password: &[u8]) -> Result<Self> {
        let password = SensitiveBytes::from(password);
        let salt = config.salt.clone();
        let params = config.kdf_parameters.clone();

        let master_key =
            tokio::task::spawn_blocking(move || derive_key(password.as_bytes(), &salt, &params))
                .await
                .map_err(|e| Error::Key(format!("Key derivation task failed: {}", e)))??;

        let content_key = master_key.derive_content_key();
        let name_key = master_key.derive_name_key();
        drop(master_key);

        let vault = Self {
            encrypter: FileEncrypter::new(&content_key),
            decrypter: FileDecrypter::new(&content_key),
            names: FilenameCodec::new(&name_key)?,
            inner,
            config,
            options: VaultOptions::default(),
        };

        info!(backend = vault.inner.name(), "Vault opened");
        Ok(vault)
    }

    /// Replace the session options.
    pub fn with_options(mut self, options: VaultOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn options(&self) -> VaultOptions {
        self.options
    }

    /// The decorated backend.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use xela_storage::{MemoryProvider, MemoryRef};

    /// Memory backend whose writes always fail.
    struct ReadOnlyMemory(MemoryProvider);

    #[async_trait]
    impl StorageProvider for ReadOnlyMemory {
        type Ref = MemoryRef;

        fn name(&self) -> &str {
            "read-only"
        }

        fn root(&self) -> MemoryRef {
            self.0.root()
        }

        async fn list(&self, dir: &MemoryRef) -> Result<Vec<MemoryRef>> {
            self.0.list(dir).await
        }

        async fn lookup(&self, dir: &MemoryRef, name: &str) -> Result<MemoryRef> {
            self.0.lookup(dir, name).await
        }

        async fn create(&self, dir: &MemoryRef, name: &str, kind: ItemKind) -> Result<MemoryRef> {
            self.0.create(dir, name, kind).await
        }

        async fn read(&self, item: &MemoryRef) -> Result<Vec<u8>> {
            self.0.read(item).await
        }

        async fn write(&self, _item: &MemoryRef, _data: Vec<u8>) -> Result<()> {
            Err(Error::Storage("Disk full".to_string()))
        }

        async fn delete(&self, item: &MemoryRef) -> Result<()> {
            self.0.delete(item).await
        }
    }

    const PASSWORD: &[u8] = b"correct horse battery staple";

    fn fast_params() -> KdfParams {
        KdfParams {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[tokio::test]
    async fn test_create_then_open() {
        let backend = MemoryProvider::new();
        let created = Vault::create(backend.clone(), PASSWORD, fast_params())
            .await
            .unwrap();

        let opened = Vault::open(backend.clone(), PASSWORD).await.unwrap();
        assert_eq!(opened.config(), created.config());
        assert_eq!(opened.options(), VaultOptions::default());
    }

    #[tokio::test]
    async fn test_config_is_plain_json_in_root() {
        let backend = MemoryProvider::new();
        let vault = Vault::create(backend.clone(), PASSWORD, fast_params())
            .await
            .unwrap();

        let item = backend
            .lookup(&backend.root(), CONFIG_FILENAME)
            .await
            .unwrap();
        let stored: serde_json::Value =
            serde_json::from_slice(&backend.read(&item).await.unwrap()).unwrap();

        assert_eq!(stored["kdf_parameters"]["memory_cost"], 1024);
        assert_eq!(stored["version"]["major"], 1);
        assert_eq!(
            stored["salt"].as_array().map(|s| s.len()),
            Some(vault.config().salt.as_bytes().len())
        );
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let backend = MemoryProvider::new();
        Vault::create(backend.clone(), PASSWORD, fast_params())
            .await
            .unwrap();

        let err = Vault::create(backend, PASSWORD, fast_params())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_open_without_config_is_configuration_error() {
        let err = Vault::open(MemoryProvider::new(), PASSWORD)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_open_malformed_config_is_configuration_error() {
        let backend = MemoryProvider::new();
        let item = backend
            .create(&backend.root(), CONFIG_FILENAME, ItemKind::File)
            .await
            .unwrap();
        backend.write(&item, b"{\"salt\": ".to_vec()).await.unwrap();

        let err = Vault::open(backend, PASSWORD).await.err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_open_config_directory_is_configuration_error() {
        let backend = MemoryProvider::new();
        backend
            .create(&backend.root(), CONFIG_FILENAME, ItemKind::Directory)
            .await
            .unwrap();

        let err = Vault::open(backend, PASSWORD).await.err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_create_refuses_non_empty_root() {
        let backend = MemoryProvider::new();
        let photo = backend
            .create(&backend.root(), "holiday.jpg", ItemKind::File)
            .await
            .unwrap();

        let err = Vault::create(backend.clone(), PASSWORD, fast_params())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidInput(_)), "{:?}", err);

        // The existing item is untouched and no configuration was written
        assert_eq!(backend.list(&backend.root()).await.unwrap(), vec![photo]);
        assert!(matches!(
            Vault::open(backend, PASSWORD).await.err().unwrap(),
            Error::Configuration(_)
        ));
    }

    #[tokio::test]
    async fn test_failed_config_write_leaves_backend_empty() {
        let memory = MemoryProvider::new();

        let err = Vault::create(ReadOnlyMemory(memory.clone()), PASSWORD, fast_params())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Storage(_)), "{:?}", err);
        assert!(memory.list(&memory.root()).await.unwrap().is_empty());

        // The backend is still usable for a fresh vault
        Vault::create(memory.clone(), PASSWORD, fast_params())
            .await
            .unwrap();
        Vault::open(memory, PASSWORD).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_password_is_rejected() {
        let backend = MemoryProvider::new();
        let err = Vault::create(backend.clone(), b"", fast_params())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidInput(_)));

        // Nothing was written
        assert!(backend.list(&backend.root()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_password_still_opens() {
        let backend = MemoryProvider::new();
        Vault::create(backend.clone(), PASSWORD, fast_params())
            .await
            .unwrap();

        assert!(Vault::open(backend, b"wrong password").await.is_ok());
    }

    #[tokio::test]
    async fn test_with_options() {
        let backend = MemoryProvider::new();
        let vault = Vault::create(backend, PASSWORD, fast_params())
            .await
            .unwrap()
            .with_options(VaultOptions { minimal_diff: true });

        assert!(vault.options().minimal_diff);
        assert_eq!(vault.inner().name(), "memory");
    }
}
