//! Root filesystem storage provider for fleetprov
//!
//! Hands out filesystems as directories on the machine's root filesystem.
//! Volumes are not supported and every filesystem must be attached to a
//! machine at a mount path.
//!
//! # Requirements
//!
//! - `df` supporting `--output=size` (GNU coreutils)
//!
//! # Example
//!
//! ```ignore
//! use fleetprov_provider::{
//!     CONFIG_STORAGE_DIR, ConfigValue, EnvironConfig, FilesystemParams, ProviderRegistry,
//!     ProviderType, StorageConfig,
//! };
//!
//! let mut registry = ProviderRegistry::new();
//! fleetprov_rootfs::register(&mut registry);
//!
//! let config = StorageConfig::new("rootfs", ProviderType::new("rootfs"))
//!     .with_attr(CONFIG_STORAGE_DIR, ConfigValue::String("/var/lib/storage".into()));
//! let source = registry.filesystem_source(&EnvironConfig::new("prod"), &config)?;
//!
//! let params = FilesystemParams::new("filesystem-0", 1024).attached_to("0", "/srv/data");
//! let (filesystem, attachment) = source.create_filesystem(&params).await?;
//! ```

pub mod dirs;
pub mod provider;

pub use dirs::{DirectoryOperations, EntryKind, OsDirectoryOperations};
pub use provider::{DIR_MODE, ROOTFS_PROVIDER_TYPE, RootfsFilesystemSource, RootfsProvider};

use fleetprov_provider::{ProviderRegistry, TokioCommandRunner};
use std::sync::Arc;

/// Register the rootfs provider backed by the local machine.
pub fn register(registry: &mut ProviderRegistry) {
    registry.register(Arc::new(RootfsProvider::new(Arc::new(TokioCommandRunner))));
}
