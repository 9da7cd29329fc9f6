//! fleetprov provisioning contract
//!
//! This crate defines the backend-agnostic side of resource provisioning:
//! the constraint model and its validator, the parameter set backends encode
//! requests into, and the storage provider capability traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  orchestrator                    │
//! └────────┬───────────────────────────┬────────────┘
//!          │ constraints               │ storage
//! ┌────────▼─────────┐        ┌────────▼────────────┐
//! │    Validator     │        │  ProviderRegistry   │
//! └────────┬─────────┘        └────────┬────────────┘
//!          │                           │
//! ┌────────▼─────────┐        ┌────────▼────────────┐
//! │  maas backend    │        │  rootfs backend     │
//! │  (ParameterSet)  │        │  (FilesystemSource) │
//! └──────────────────┘        └─────────────────────┘
//! ```

pub mod command;
pub mod constraints;
pub mod error;
pub mod params;
pub mod registry;
pub mod storage;
pub mod validator;

// Re-exports
pub use command::{CommandError, CommandRunner, TokioCommandRunner};
pub use constraints::{ConstraintName, ConstraintSet, SignedValue, partition_signed};
pub use error::{ErrorKind, ProvisionError, Result};
pub use params::ParameterSet;
pub use registry::ProviderRegistry;
pub use storage::{
    CONFIG_STORAGE_DIR, ConfigValue, EnvironConfig, Filesystem, FilesystemAttachment,
    FilesystemAttachmentParams, FilesystemOutcome, FilesystemParams, FilesystemSource,
    ProviderType, StorageConfig, StorageProvider, Volume, VolumeParams, VolumeSource,
};
pub use validator::{Validated, Validator};
