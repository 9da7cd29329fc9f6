//! Storage provider abstraction
//!
//! Every storage backend implements [`StorageProvider`], which hands out
//! [`VolumeSource`]s and [`FilesystemSource`]s bound to a [`StorageConfig`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::error::{ProvisionError, Result};

/// Config key holding the directory a storage source allocates under
pub const CONFIG_STORAGE_DIR: &str = "storage-dir";

/// Identifier of a storage backend kind (e.g. "rootfs")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderType(String);

impl ProviderType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single storage configuration value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    String(String),
}

/// Named storage configuration for one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub name: String,

    pub provider_type: ProviderType,

    #[serde(default)]
    pub attrs: HashMap<String, ConfigValue>,
}

impl StorageConfig {
    pub fn new(name: impl Into<String>, provider_type: ProviderType) -> Self {
        Self {
            name: name.into(),
            provider_type,
            attrs: HashMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    pub fn value_string(&self, key: &str) -> Option<&str> {
        match self.attrs.get(key)? {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn value_bool(&self, key: &str) -> Option<bool> {
        match self.attrs.get(key)? {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn value_int(&self, key: &str) -> Option<i64> {
        match self.attrs.get(key)? {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The storage directory, if set and non-empty
    pub fn storage_dir(&self) -> Option<&str> {
        self.value_string(CONFIG_STORAGE_DIR).filter(|dir| !dir.is_empty())
    }
}

/// Environment-wide settings handed to every provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironConfig {
    pub name: String,

    #[serde(default)]
    pub attrs: HashMap<String, ConfigValue>,
}

impl EnvironConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: HashMap::new(),
        }
    }
}

/// Where a filesystem is to be mounted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemAttachmentParams {
    pub machine: String,
    pub path: PathBuf,
}

/// One filesystem allocation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemParams {
    pub tag: String,

    /// Requested size in MiB
    pub size: u64,

    pub attachment: Option<FilesystemAttachmentParams>,
}

impl FilesystemParams {
    pub fn new(tag: impl Into<String>, size: u64) -> Self {
        Self {
            tag: tag.into(),
            size,
            attachment: None,
        }
    }

    pub fn attached_to(mut self, machine: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(FilesystemAttachmentParams {
            machine: machine.into(),
            path: path.into(),
        });
        self
    }
}

/// An allocated filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filesystem {
    pub tag: String,

    /// Measured capacity in MiB, not the requested size
    pub size: u64,
}

/// A filesystem bound to a machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemAttachment {
    pub filesystem: String,
    pub machine: String,
    pub path: PathBuf,
}

/// One block volume allocation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeParams {
    pub tag: String,

    /// Requested size in MiB
    pub size: u64,
}

/// An allocated block volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub tag: String,
    pub volume_id: String,
    pub size: u64,
}

/// Capability set every storage backend exposes
pub trait StorageProvider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    /// Static validation of backend-specific configuration.
    fn validate_config(&self, config: &StorageConfig) -> Result<()>;

    fn volume_source(
        &self,
        environ: &EnvironConfig,
        config: &StorageConfig,
    ) -> Result<Box<dyn VolumeSource>>;

    fn filesystem_source(
        &self,
        environ: &EnvironConfig,
        config: &StorageConfig,
    ) -> Result<Box<dyn FilesystemSource>>;
}

/// Allocates block volumes
#[async_trait]
pub trait VolumeSource: Send + Sync {
    fn validate_volume_params(&self, params: &VolumeParams) -> Result<()>;

    async fn create_volumes(&self, params: &[VolumeParams]) -> Result<Vec<Volume>>;
}

/// Result of a single filesystem request
pub type FilesystemOutcome = Result<(Filesystem, FilesystemAttachment)>;

/// Allocates filesystems
#[async_trait]
pub trait FilesystemSource: Send + Sync {
    fn validate_filesystem_params(&self, params: &FilesystemParams) -> Result<()>;

    async fn create_filesystem(&self, params: &FilesystemParams) -> FilesystemOutcome;

    /// Create filesystems in input order, stopping at the first failure.
    ///
    /// On error nothing is returned for the requests that succeeded before
    /// the failing one, and those are not rolled back.
    async fn create_filesystems(
        &self,
        params: &[FilesystemParams],
    ) -> Result<(Vec<Filesystem>, Vec<FilesystemAttachment>)> {
        let mut filesystems = Vec::with_capacity(params.len());
        let mut attachments = Vec::with_capacity(params.len());
        for arg in params {
            let (filesystem, attachment) = self
                .create_filesystem(arg)
                .await
                .map_err(|e| e.annotate("creating filesystem"))?;
            filesystems.push(filesystem);
            attachments.push(attachment);
        }
        Ok((filesystems, attachments))
    }

    /// Attempt every request in input order and report each outcome.
    async fn create_filesystems_each(&self, params: &[FilesystemParams]) -> Vec<FilesystemOutcome> {
        let mut outcomes = Vec::with_capacity(params.len());
        for arg in params {
            let outcome = self
                .create_filesystem(arg)
                .await
                .map_err(|e| e.annotate(format!("creating filesystem {}", arg.tag)));
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Shorthand for a [`ProvisionError::NotSupported`] result.
pub fn not_supported<T>(what: impl Into<String>) -> Result<T> {
    Err(ProvisionError::NotSupported(what.into()))
}
