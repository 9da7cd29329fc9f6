//! Root filesystem storage provider
//!
//! Provides filesystems as plain directories on the machine's root
//! filesystem. Capacity is whatever `df` reports for the directory.

use crate::dirs::{DirectoryOperations, EntryKind, OsDirectoryOperations};
use async_trait::async_trait;
use fleetprov_provider::storage::not_supported;
use fleetprov_provider::{
    CommandRunner, EnvironConfig, Filesystem, FilesystemAttachment, FilesystemOutcome,
    FilesystemParams, FilesystemSource, ProviderType, ProvisionError, Result, StorageConfig,
    StorageProvider, VolumeSource,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ROOTFS_PROVIDER_TYPE: &str = "rootfs";

/// Permission mode for directories created by the source, owner only
pub const DIR_MODE: u32 = 0o700;

/// Storage provider handing out directories on the root filesystem
pub struct RootfsProvider {
    runner: Arc<dyn CommandRunner>,
    dirs: Arc<dyn DirectoryOperations>,
}

impl RootfsProvider {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            dirs: Arc::new(OsDirectoryOperations),
        }
    }

    /// Replace the directory operations sources are built with.
    pub fn with_directory_operations(mut self, dirs: Arc<dyn DirectoryOperations>) -> Self {
        self.dirs = dirs;
        self
    }

    /// Validate the user config together with the internally supplied keys.
    fn validate_full_config(&self, config: &StorageConfig) -> Result<()> {
        self.validate_config(config)?;
        if config.storage_dir().is_none() {
            return Err(ProvisionError::InvalidConfig(
                "storage directory not specified".to_string(),
            ));
        }
        Ok(())
    }
}

impl StorageProvider for RootfsProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::new(ROOTFS_PROVIDER_TYPE)
    }

    fn validate_config(&self, _config: &StorageConfig) -> Result<()> {
        // rootfs has no configuration of its own
        Ok(())
    }

    fn volume_source(
        &self,
        _environ: &EnvironConfig,
        _config: &StorageConfig,
    ) -> Result<Box<dyn VolumeSource>> {
        not_supported("volumes")
    }

    fn filesystem_source(
        &self,
        _environ: &EnvironConfig,
        config: &StorageConfig,
    ) -> Result<Box<dyn FilesystemSource>> {
        self.validate_full_config(config)?;
        let storage_dir = config.storage_dir().map(PathBuf::from).unwrap_or_default();

        Ok(Box::new(RootfsFilesystemSource {
            dirs: self.dirs.clone(),
            runner: self.runner.clone(),
            storage_dir,
        }))
    }
}

/// Filesystem source allocating directories
pub struct RootfsFilesystemSource {
    dirs: Arc<dyn DirectoryOperations>,
    runner: Arc<dyn CommandRunner>,
    storage_dir: PathBuf,
}

impl RootfsFilesystemSource {
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Relative mount paths live under the storage directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.storage_dir.join(path)
        }
    }

    /// Make sure `path` is an empty directory, creating it if missing.
    ///
    /// Returns the topmost directory that rollback may remove: the first
    /// ancestor created by this call, or `path` itself if it already existed.
    /// The storage provisioner is responsible for keeping shared paths
    /// apart; this is a sanity check, and a populated directory is never
    /// reused or cleared.
    async fn validate_path(&self, path: &Path) -> Result<PathBuf> {
        let inspect = |path: &Path, e: std::io::Error| {
            ProvisionError::execution(format!("inspecting {}", path.display()), e)
        };
        let kind = self.dirs.lstat(path).await.map_err(|e| inspect(path, e))?;

        match kind {
            None => {
                let mut created_root = path.to_path_buf();
                for ancestor in path.ancestors().skip(1) {
                    if ancestor.as_os_str().is_empty() {
                        break;
                    }
                    let existing = self
                        .dirs
                        .lstat(ancestor)
                        .await
                        .map_err(|e| inspect(ancestor, e))?;
                    if existing.is_some() {
                        break;
                    }
                    created_root = ancestor.to_path_buf();
                }

                self.dirs
                    .create_dir_all(path, DIR_MODE)
                    .await
                    .map_err(|e| ProvisionError::execution("could not create directory", e))?;
                tracing::debug!("Created filesystem directory: {}", path.display());
                Ok(created_root)
            }
            Some(EntryKind::Directory) => {
                let count = self
                    .dirs
                    .entry_count(path)
                    .await
                    .map_err(|e| ProvisionError::execution("could not read directory", e))?;
                if count > 0 {
                    return Err(ProvisionError::PathNotEmpty(path.to_path_buf()));
                }
                Ok(path.to_path_buf())
            }
            Some(_) => Err(ProvisionError::InvalidRequest(format!(
                "path {:?} must be a directory",
                path
            ))),
        }
    }

    /// Capacity available at `path` in MiB
    async fn measure(&self, path: &Path) -> Result<u64> {
        let path_arg = path.to_string_lossy();
        let output = self
            .runner
            .run("df", &["--output=size", path_arg.as_ref()])
            .await
            .map_err(|e| ProvisionError::execution("getting size", e))?;

        // header on the first line, 1K-blocks on the second
        let blocks = match output.splitn(2, '\n').nth(1) {
            Some(line) => line
                .trim()
                .parse::<u64>()
                .map_err(|e| ProvisionError::execution("parsing size", e))?,
            None => {
                return Err(ProvisionError::execution(
                    "parsing size",
                    format!("unexpected df output {:?}", output),
                ));
            }
        };
        Ok(blocks / 1024)
    }

    /// Best-effort removal of `path` and its parents up to `root`.
    ///
    /// Stops at the first directory that cannot be removed; a parent of a
    /// directory that is still there cannot be empty.
    async fn remove(&self, path: &Path, root: &Path) {
        for dir in path.ancestors() {
            if let Err(e) = self.dirs.remove_dir(dir).await {
                tracing::warn!("Failed to remove {}: {}", dir.display(), e);
                return;
            }
            if dir == root {
                return;
            }
        }
    }
}

#[async_trait]
impl FilesystemSource for RootfsFilesystemSource {
    fn validate_filesystem_params(&self, params: &FilesystemParams) -> Result<()> {
        // This may run on a machine other than the one the filesystem is
        // mounted on, so size is only checked in create_filesystem.
        if params.attachment.is_none() {
            return not_supported("creating filesystem without machine attachment");
        }
        Ok(())
    }

    async fn create_filesystem(&self, params: &FilesystemParams) -> FilesystemOutcome {
        self.validate_filesystem_params(params)?;
        let Some(attachment) = params.attachment.as_ref() else {
            return not_supported("creating filesystem without machine attachment");
        };
        if attachment.path.as_os_str().is_empty() {
            return Err(ProvisionError::InvalidRequest(
                "cannot create a filesystem mount without specifying a path".to_string(),
            ));
        }

        let path = self.resolve(&attachment.path);
        let created_root = self.validate_path(&path).await?;

        let size = match self.measure(&path).await {
            Ok(size) => size,
            Err(e) => {
                self.remove(&path, &created_root).await;
                return Err(e);
            }
        };
        if size < params.size {
            self.remove(&path, &created_root).await;
            return Err(ProvisionError::InsufficientCapacity {
                available: size,
                requested: params.size,
            });
        }

        tracing::info!(
            "Created filesystem {} at {} ({}M)",
            params.tag,
            path.display(),
            size
        );
        Ok((
            Filesystem {
                tag: params.tag.clone(),
                size,
            },
            FilesystemAttachment {
                filesystem: params.tag.clone(),
                machine: attachment.machine.clone(),
                path,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetprov_provider::{
        CONFIG_STORAGE_DIR, CommandError, ConfigValue, ErrorKind, TokioCommandRunner,
    };
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;

    /// Returns `df` output reporting `blocks` 1K-blocks.
    struct FakeDf {
        output: std::result::Result<String, String>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl FakeDf {
        fn blocks(blocks: u64) -> Arc<Self> {
            Self::output(format!("1K-blocks\n{:>9}\n", blocks))
        }

        fn output(output: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                output: Ok(output.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                output: Err("df: no file systems processed".to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CommandRunner for FakeDf {
        async fn run(
            &self,
            program: &str,
            args: &[&str],
        ) -> std::result::Result<String, CommandError> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|a| a.to_string()));
            self.calls.lock().unwrap().push(call);
            self.output.clone().map_err(|stderr| CommandError::Failed {
                program: program.to_string(),
                status: "exit status: 1".to_string(),
                stderr,
            })
        }
    }

    /// In-memory directory tree with injectable failures.
    #[derive(Default)]
    struct FakeDirs {
        entries: Mutex<HashMap<PathBuf, (EntryKind, usize)>>,
        fail_mkdir: bool,
        fail_lstat: bool,
        fail_count: bool,
        ops: Mutex<Vec<String>>,
    }

    impl FakeDirs {
        fn with_entry(self, path: &str, kind: EntryKind, count: usize) -> Self {
            self.entries
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), (kind, count));
            self
        }

        fn exists(&self, path: &str) -> bool {
            self.entries.lock().unwrap().contains_key(Path::new(path))
        }

        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DirectoryOperations for FakeDirs {
        async fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
            self.ops
                .lock()
                .unwrap()
                .push(format!("mkdir {} {:o}", path.display(), mode));
            if self.fail_mkdir {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            let mut entries = self.entries.lock().unwrap();
            for dir in path.ancestors() {
                entries
                    .entry(dir.to_path_buf())
                    .or_insert((EntryKind::Directory, 0));
            }
            Ok(())
        }

        async fn lstat(&self, path: &Path) -> io::Result<Option<EntryKind>> {
            if self.fail_lstat {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            if path == Path::new("/") {
                return Ok(Some(EntryKind::Directory));
            }
            Ok(self.entries.lock().unwrap().get(path).map(|(kind, _)| *kind))
        }

        async fn entry_count(&self, path: &Path) -> io::Result<usize> {
            if self.fail_count {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            self.entries
                .lock()
                .unwrap()
                .get(path)
                .map(|(_, count)| *count)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }

        async fn remove_dir(&self, path: &Path) -> io::Result<()> {
            self.ops
                .lock()
                .unwrap()
                .push(format!("rmdir {}", path.display()));
            self.entries.lock().unwrap().remove(path);
            Ok(())
        }
    }

    fn storage_config(dir: &str) -> StorageConfig {
        StorageConfig::new("rootfs-pool", ProviderType::new(ROOTFS_PROVIDER_TYPE))
            .with_attr(CONFIG_STORAGE_DIR, ConfigValue::String(dir.to_string()))
    }

    fn source(runner: Arc<FakeDf>, dirs: Arc<FakeDirs>) -> Box<dyn FilesystemSource> {
        RootfsProvider::new(runner)
            .with_directory_operations(dirs)
            .filesystem_source(&EnvironConfig::new("test"), &storage_config("/var/lib/storage"))
            .ok()
            .unwrap()
    }

    fn params(size: u64) -> FilesystemParams {
        FilesystemParams::new("filesystem-0", size).attached_to("0", "/mnt/x")
    }

    #[test]
    fn test_validate_config_is_noop() {
        let provider = RootfsProvider::new(Arc::new(TokioCommandRunner));
        let empty = StorageConfig::new("pool", provider.provider_type());
        assert!(provider.validate_config(&empty).is_ok());
    }

    #[test]
    fn test_volume_source_not_supported() {
        let provider = RootfsProvider::new(Arc::new(TokioCommandRunner));
        let err = provider
            .volume_source(&EnvironConfig::new("test"), &storage_config("/srv"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert_eq!(err.to_string(), "volumes not supported");
    }

    #[test]
    fn test_filesystem_source_requires_storage_dir() {
        let provider = RootfsProvider::new(Arc::new(TokioCommandRunner));
        let environ = EnvironConfig::new("test");

        let missing = StorageConfig::new("pool", provider.provider_type());
        let err = provider.filesystem_source(&environ, &missing).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert!(err.to_string().contains("storage directory not specified"));

        let err = provider
            .filesystem_source(&environ, &storage_config(""))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[tokio::test]
    async fn test_create_in_missing_directory() {
        let runner = FakeDf::blocks(20480);
        let dirs = Arc::new(FakeDirs::default());
        let source = source(runner.clone(), dirs.clone());

        let (filesystem, attachment) = source.create_filesystem(&params(10)).await.unwrap();

        assert_eq!(
            filesystem,
            Filesystem {
                tag: "filesystem-0".to_string(),
                size: 20,
            }
        );
        assert_eq!(
            attachment,
            FilesystemAttachment {
                filesystem: "filesystem-0".to_string(),
                machine: "0".to_string(),
                path: PathBuf::from("/mnt/x"),
            }
        );
        assert_eq!(dirs.ops(), vec!["mkdir /mnt/x 700"]);
        assert_eq!(
            *runner.calls.lock().unwrap(),
            vec![vec!["df", "--output=size", "/mnt/x"]]
        );
    }

    #[tokio::test]
    async fn test_insufficient_capacity_removes_directory() {
        let dirs = Arc::new(FakeDirs::default());
        let source = source(FakeDf::blocks(5120), dirs.clone());

        let err = source.create_filesystem(&params(10)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientCapacity);
        assert!(err.to_string().contains("5M < 10M"));
        assert!(!dirs.exists("/mnt/x"));
        assert!(!dirs.exists("/mnt"));
        assert_eq!(
            dirs.ops(),
            vec!["mkdir /mnt/x 700", "rmdir /mnt/x", "rmdir /mnt"]
        );

        // the next attempt takes the missing-directory branch again
        let _ = source.create_filesystem(&params(10)).await;
        assert_eq!(dirs.ops()[3], "mkdir /mnt/x 700");
    }

    #[test]
    fn test_created_directories_are_owner_only() {
        assert_eq!(DIR_MODE & 0o077, 0);
        assert_eq!(DIR_MODE & 0o700, 0o700);
    }

    #[tokio::test]
    async fn test_rollback_keeps_existing_parents() {
        let dirs = Arc::new(FakeDirs::default().with_entry("/mnt", EntryKind::Directory, 0));
        let source = source(FakeDf::blocks(5120), dirs.clone());

        let err = source.create_filesystem(&params(10)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientCapacity);
        assert_eq!(dirs.ops(), vec!["mkdir /mnt/x 700", "rmdir /mnt/x"]);
        assert!(dirs.exists("/mnt"));
    }

    #[tokio::test]
    async fn test_rollback_of_existing_empty_directory_stops_there() {
        let dirs = Arc::new(FakeDirs::default().with_entry("/mnt/x", EntryKind::Directory, 0));
        let source = source(FakeDf::blocks(5120), dirs.clone());

        let err = source.create_filesystem(&params(10)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientCapacity);
        assert_eq!(dirs.ops(), vec!["rmdir /mnt/x"]);
    }

    #[tokio::test]
    async fn test_missing_attachment_touches_nothing() {
        let runner = FakeDf::blocks(20480);
        let dirs = Arc::new(FakeDirs::default());
        let source = source(runner.clone(), dirs.clone());
        let params = FilesystemParams::new("filesystem-0", 10);

        let err = source.validate_filesystem_params(&params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);

        let err = source.create_filesystem(&params).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert!(dirs.ops().is_empty());
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_path_is_invalid() {
        let dirs = Arc::new(FakeDirs::default());
        let source = source(FakeDf::blocks(20480), dirs.clone());
        let params = FilesystemParams::new("filesystem-0", 10).attached_to("0", "");

        let err = source.create_filesystem(&params).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(dirs.ops().is_empty());
    }

    #[tokio::test]
    async fn test_non_empty_directory_is_refused() {
        let dirs = Arc::new(FakeDirs::default().with_entry("/mnt/x", EntryKind::Directory, 1));
        let runner = FakeDf::blocks(20480);
        let source = source(runner.clone(), dirs.clone());

        let err = source.create_filesystem(&params(10)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathNotEmpty);
        assert!(dirs.exists("/mnt/x"));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_at_path_is_invalid() {
        let dirs = Arc::new(FakeDirs::default().with_entry("/mnt/x", EntryKind::File, 0));
        let source = source(FakeDf::blocks(20480), dirs.clone());

        let err = source.create_filesystem(&params(10)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(err.to_string().contains("must be a directory"));
    }

    #[tokio::test]
    async fn test_empty_existing_directory_is_reused() {
        let dirs = Arc::new(FakeDirs::default().with_entry("/mnt/x", EntryKind::Directory, 0));
        let source = source(FakeDf::blocks(20480), dirs.clone());

        let first = source.create_filesystem(&params(10)).await.unwrap();
        let second = source.create_filesystem(&params(10)).await.unwrap();
        assert_eq!(first, second);
        assert!(dirs.ops().is_empty());
    }

    #[tokio::test]
    async fn test_df_failure_removes_directory() {
        let dirs = Arc::new(FakeDirs::default());
        let source = source(FakeDf::failing(), dirs.clone());

        let err = source.create_filesystem(&params(10)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionFailure);
        assert!(err.to_string().starts_with("getting size"));
        assert!(!dirs.exists("/mnt/x"));
    }

    #[tokio::test]
    async fn test_unparsable_df_output_removes_directory() {
        for output in ["1K-blocks\nlots\n", "1K-blocks"] {
            let dirs = Arc::new(FakeDirs::default());
            let source = source(FakeDf::output(output), dirs.clone());

            let err = source.create_filesystem(&params(10)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ExecutionFailure);
            assert!(err.to_string().starts_with("parsing size"));
            assert!(!dirs.exists("/mnt/x"));
        }
    }

    #[tokio::test]
    async fn test_directory_failures_are_execution_failures() {
        let cases = [
            FakeDirs {
                fail_mkdir: true,
                ..Default::default()
            },
            FakeDirs {
                fail_lstat: true,
                ..Default::default()
            },
            FakeDirs {
                fail_count: true,
                ..Default::default()
            }
            .with_entry("/mnt/x", EntryKind::Directory, 0),
        ];
        for dirs in cases {
            let source = source(FakeDf::blocks(20480), Arc::new(dirs));
            let err = source.create_filesystem(&params(10)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ExecutionFailure);
        }
    }

    #[tokio::test]
    async fn test_relative_path_resolves_under_storage_dir() {
        let dirs = Arc::new(FakeDirs::default());
        let source = source(FakeDf::blocks(2048), dirs.clone());
        let params = FilesystemParams::new("filesystem-1", 1).attached_to("3", "data/fs1");

        let (_, attachment) = source.create_filesystem(&params).await.unwrap();
        assert_eq!(attachment.path, PathBuf::from("/var/lib/storage/data/fs1"));
        assert_eq!(attachment.machine, "3");
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_failure() {
        let dirs = Arc::new(FakeDirs::default().with_entry("/mnt/b", EntryKind::Directory, 3));
        let source = source(FakeDf::blocks(20480), dirs.clone());
        let batch = vec![
            FilesystemParams::new("filesystem-a", 1).attached_to("0", "/mnt/a"),
            FilesystemParams::new("filesystem-b", 1).attached_to("0", "/mnt/b"),
            FilesystemParams::new("filesystem-c", 1).attached_to("0", "/mnt/c"),
        ];

        let err = source.create_filesystems(&batch).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathNotEmpty);
        assert!(err.to_string().starts_with("creating filesystem: "));
        // earlier successes stay, later requests are never attempted
        assert!(dirs.exists("/mnt/a"));
        assert!(!dirs.exists("/mnt/c"));
    }
}
