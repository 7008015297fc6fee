//! Xela CLI - Command line interface for vault operations.
//!
//! Every command opens the vault in `--vault` (default: the current
//! directory), runs one operation and exits. Paths inside the vault are
//! `/`-separated and resolved one component at a time.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use xela_common::VaultPath;
use xela_crypto::KdfParams;
use xela_storage::{ItemKind, ItemRef, LocalProvider, StorageProvider};
use xela_vault::{Vault, VaultOptions, VaultRef};

#[derive(Parser)]
#[command(name = "xela")]
#[command(about = "Xela - Encrypted file vault")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the encrypted vault.
    #[arg(long, global = true, default_value = ".")]
    vault: PathBuf,

    /// Vault password; prompted for when not set.
    #[arg(long, global = true, env = "XELA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new vault in an empty directory.
    Init {
        /// KDF strength: "interactive", "moderate", or "sensitive".
        #[arg(short, long, default_value = "moderate")]
        strength: String,
    },

    /// List a vault directory.
    Ls {
        /// Directory within vault (default: root).
        #[arg(default_value = "/")]
        dir: String,
    },

    /// Store a local file in the vault, replacing any existing file.
    Put {
        /// Source file to add.
        source: PathBuf,

        /// Destination path in vault.
        dest: String,

        /// Keep unchanged superblocks of an existing file.
        #[arg(long)]
        minimal_diff: bool,
    },

    /// Extract a file from the vault.
    Get {
        /// Source path in vault.
        source: String,

        /// Destination file path.
        dest: PathBuf,
    },

    /// Create a directory in the vault.
    Mkdir {
        /// Directory path to create.
        dir: String,
    },

    /// Remove a file or an empty directory from the vault.
    Rm {
        /// Path to remove.
        path: String,
    },

    /// Show vault information.
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let password = cli.password.map(|p| Zeroizing::new(p.into_bytes()));

    match cli.command {
        Commands::Init { strength } => cmd_init(&cli.vault, password, &strength).await,
        Commands::Ls { dir } => cmd_ls(&cli.vault, password, &dir).await,
        Commands::Put {
            source,
            dest,
            minimal_diff,
        } => cmd_put(&cli.vault, password, &source, &dest, minimal_diff).await,
        Commands::Get { source, dest } => cmd_get(&cli.vault, password, &source, &dest).await,
        Commands::Mkdir { dir } => cmd_mkdir(&cli.vault, password, &dir).await,
        Commands::Rm { path } => cmd_rm(&cli.vault, password, &path).await,
        Commands::Info => cmd_info(&cli.vault, password).await,
    }
}

type Password = Zeroizing<Vec<u8>>;

/// Prompt for password securely.
fn prompt_password(prompt: &str) -> Result<Password> {
    let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
    Ok(Zeroizing::new(password.into_bytes()))
}

async fn open_vault(vault_dir: &Path, password: Option<Password>) -> Result<Vault<LocalProvider>> {
    let password = match password {
        Some(p) => p,
        None => prompt_password("Enter password: ")?,
    };

    let provider = LocalProvider::new(vault_dir)
        .with_context(|| format!("Cannot use {} as vault directory", vault_dir.display()))?;

    Vault::open(provider, &password)
        .await
        .with_context(|| format!("Failed to open vault at {}", vault_dir.display()))
}

/// Walk `path` from the vault root, one lookup per component.
async fn resolve<P: StorageProvider>(vault: &Vault<P>, path: &VaultPath) -> Result<VaultRef<P::Ref>> {
    let mut current = vault.root();
    for component in path.components() {
        current = vault
            .lookup(&current, component)
            .await
            .with_context(|| format!("Cannot resolve {}", path))?;
    }
    Ok(current)
}

/// Resolve the parent directory of `path` and return it with the final name.
async fn resolve_parent<'a, P: StorageProvider>(
    vault: &Vault<P>,
    path: &'a VaultPath,
) -> Result<(VaultRef<P::Ref>, &'a str)> {
    let name = path
        .name()
        .context("The vault root cannot be used here")?;
    let parent = path.parent().unwrap_or_else(VaultPath::root);

    let dir = resolve(vault, &parent).await?;
    if !dir.is_directory() {
        anyhow::bail!("{} is not a directory", parent);
    }
    Ok((dir, name))
}

/// Create a new vault.
async fn cmd_init(vault_dir: &Path, password: Option<Password>, strength: &str) -> Result<()> {
    info!("Creating new vault in {}", vault_dir.display());

    let kdf_params = KdfParams::preset(strength).with_context(|| {
        format!(
            "Invalid strength {:?}. Use: interactive, moderate, or sensitive",
            strength
        )
    })?;

    let password = match password {
        Some(p) => p,
        None => {
            let password = prompt_password("Enter password: ")?;
            let confirm = prompt_password("Confirm password: ")?;
            if password != confirm {
                anyhow::bail!("Passwords do not match");
            }
            password
        }
    };

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    let provider = LocalProvider::new(vault_dir)
        .with_context(|| format!("Cannot use {} as vault directory", vault_dir.display()))?;
    let vault = Vault::create(provider, &password, kdf_params)
        .await
        .context("Failed to create vault")?;

    println!("Vault created successfully!");
    println!("  Location: {}", vault_dir.display());
    println!("  Strength: {}", strength);
    println!(
        "  Version: {}.{}",
        vault.config().version.major,
        vault.config().version.minor
    );

    Ok(())
}

/// List directory contents.
async fn cmd_ls(vault_dir: &Path, password: Option<Password>, dir: &str) -> Result<()> {
    let vault = open_vault(vault_dir, password).await?;
    let dir_path = VaultPath::parse(dir).context("Invalid directory path")?;
    let dir_ref = resolve(&vault, &dir_path).await?;

    let mut contents = vault
        .list(&dir_ref)
        .await
        .context("Failed to list directory")?;
    contents.sort_by(|a, b| a.name().cmp(b.name()));

    if contents.is_empty() {
        println!("Directory is empty.");
    } else {
        println!("Contents of {}:", dir_path);
        for item in contents {
            match item.kind() {
                ItemKind::Directory => println!("  [DIR]  {}/", item.name()),
                ItemKind::File => println!("  [FILE] {}", item.name()),
            }
        }
    }

    Ok(())
}

/// Add a file to the vault.
async fn cmd_put(
    vault_dir: &Path,
    password: Option<Password>,
    source: &Path,
    dest: &str,
    minimal_diff: bool,
) -> Result<()> {
    info!("Adding file {} to vault as {}", source.display(), dest);

    let content = tokio::fs::read(source)
        .await
        .context("Failed to read source file")?;

    let vault = open_vault(vault_dir, password)
        .await?
        .with_options(VaultOptions { minimal_diff });
    let dest_path = VaultPath::parse(dest).context("Invalid destination path")?;
    let (dir, name) = resolve_parent(&vault, &dest_path).await?;

    let file = match vault.lookup(&dir, name).await {
        Ok(existing) if existing.is_directory() => {
            anyhow::bail!("{} is a directory", dest_path)
        }
        Ok(existing) => existing,
        Err(xela_common::Error::NotFound(_)) => vault
            .create(&dir, name, ItemKind::File)
            .await
            .context("Failed to create file")?,
        Err(e) => return Err(e).context("Failed to look up destination"),
    };

    let size = content.len();
    vault
        .write(&file, content)
        .await
        .context("Failed to write file")?;

    println!("File stored: {} ({} bytes)", dest_path, size);

    Ok(())
}

/// Extract a file from the vault.
async fn cmd_get(
    vault_dir: &Path,
    password: Option<Password>,
    source: &str,
    dest: &Path,
) -> Result<()> {
    info!("Extracting {} from vault to {}", source, dest.display());

    let vault = open_vault(vault_dir, password).await?;
    let source_path = VaultPath::parse(source).context("Invalid source path")?;
    let file = resolve(&vault, &source_path).await?;

    let content = vault
        .read(&file)
        .await
        .context("Failed to read file from vault")?;

    tokio::fs::write(dest, &content)
        .await
        .context("Failed to write output file")?;

    println!(
        "File extracted successfully: {} ({} bytes)",
        dest.display(),
        content.len()
    );

    Ok(())
}

/// Create a directory in the vault.
async fn cmd_mkdir(vault_dir: &Path, password: Option<Password>, dir: &str) -> Result<()> {
    info!("Creating directory: {}", dir);

    let vault = open_vault(vault_dir, password).await?;
    let dir_path = VaultPath::parse(dir).context("Invalid directory path")?;
    let (parent, name) = resolve_parent(&vault, &dir_path).await?;

    vault
        .create(&parent, name, ItemKind::Directory)
        .await
        .context("Failed to create directory")?;

    println!("Directory created: {}", dir_path);

    Ok(())
}

/// Remove a file or empty directory.
async fn cmd_rm(vault_dir: &Path, password: Option<Password>, path: &str) -> Result<()> {
    info!("Removing: {}", path);

    let vault = open_vault(vault_dir, password).await?;
    let item_path = VaultPath::parse(path).context("Invalid path")?;
    if item_path.is_root() {
        anyhow::bail!("The vault root cannot be removed");
    }
    let item = resolve(&vault, &item_path).await?;

    vault.delete(&item).await.context("Failed to remove")?;

    println!("Removed: {}", item_path);

    Ok(())
}

/// Show vault information.
async fn cmd_info(vault_dir: &Path, password: Option<Password>) -> Result<()> {
    info!("Getting vault info: {}", vault_dir.display());

    let vault = open_vault(vault_dir, password).await?;
    let config = vault.config();

    println!("Vault Information:");
    println!("  Location: {}", vault_dir.display());
    println!("  Version: {}.{}", config.version.major, config.version.minor);
    match config.created_at {
        Some(created) => println!("  Created: {}", created),
        None => println!("  Created: unknown"),
    }
    println!("  KDF Parameters:");
    println!("    Memory: {} KiB", config.kdf_parameters.memory_cost);
    println!("    Time: {} iterations", config.kdf_parameters.time_cost);
    println!("    Parallelism: {}", config.kdf_parameters.parallelism);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use xela_storage::MemoryProvider;

    fn fast_params() -> KdfParams {
        KdfParams {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["xela", "ls", "/docs", "--vault", "/tmp/v", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.vault, PathBuf::from("/tmp/v"));
        assert!(matches!(cli.command, Commands::Ls { ref dir } if dir == "/docs"));
    }

    #[tokio::test]
    async fn test_resolve_walks_components() {
        let vault = Vault::create(MemoryProvider::new(), b"pw", fast_params())
            .await
            .unwrap();
        let a = vault
            .create(&vault.root(), "a", ItemKind::Directory)
            .await
            .unwrap();
        let b = vault.create(&a, "b.txt", ItemKind::File).await.unwrap();

        let path = VaultPath::parse("/a/b.txt").unwrap();
        assert_eq!(resolve(&vault, &path).await.unwrap(), b);
        assert_eq!(resolve(&vault, &VaultPath::root()).await.unwrap(), vault.root());

        let (parent, name) = resolve_parent(&vault, &path).await.unwrap();
        assert_eq!(parent, a);
        assert_eq!(name, "b.txt");

        assert!(resolve(&vault, &VaultPath::parse("/a/missing").unwrap())
            .await
            .is_err());
        assert!(resolve_parent(&vault, &VaultPath::parse("/a/b.txt/c").unwrap())
            .await
            .is_err());
    }
}
