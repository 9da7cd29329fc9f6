//! Provisioning error types

use std::path::PathBuf;
use thiserror::Error;

/// Provisioning errors
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("{0} not supported")]
    NotSupported(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unsupported constraint: {0}")]
    UnsupportedConstraint(String),

    #[error("invalid constraint value: {name}={value}\nvalid values are: {}", .allowed.join(", "))]
    InvalidConstraintValue {
        name: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("conflicting registration for constraint {0}")]
    ConflictingRegistration(String),

    #[error("invalid interface binding: {0}")]
    InvalidBinding(String),

    #[error("path {0:?} must be empty")]
    PathNotEmpty(PathBuf),

    #[error("filesystem is not big enough ({available}M < {requested}M)")]
    InsufficientCapacity { available: u64, requested: u64 },

    #[error("{context}: {source}")]
    ExecutionFailure {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("storage provider not found: {0}")]
    ProviderNotFound(String),

    #[error("{context}: {source}")]
    Annotated {
        context: String,
        #[source]
        source: Box<ProvisionError>,
    },
}

/// Classification of a [`ProvisionError`], ignoring any annotations around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotSupported,
    InvalidRequest,
    UnsupportedConstraint,
    InvalidConstraintValue,
    ConflictingRegistration,
    InvalidBinding,
    PathNotEmpty,
    InsufficientCapacity,
    ExecutionFailure,
    InvalidConfig,
    ProviderNotFound,
}

impl ProvisionError {
    pub fn execution(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ProvisionError::ExecutionFailure {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Wrap the error with the operation that failed.
    pub fn annotate(self, context: impl Into<String>) -> Self {
        ProvisionError::Annotated {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisionError::NotSupported(_) => ErrorKind::NotSupported,
            ProvisionError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ProvisionError::UnsupportedConstraint(_) => ErrorKind::UnsupportedConstraint,
            ProvisionError::InvalidConstraintValue { .. } => ErrorKind::InvalidConstraintValue,
            ProvisionError::ConflictingRegistration(_) => ErrorKind::ConflictingRegistration,
            ProvisionError::InvalidBinding(_) => ErrorKind::InvalidBinding,
            ProvisionError::PathNotEmpty(_) => ErrorKind::PathNotEmpty,
            ProvisionError::InsufficientCapacity { .. } => ErrorKind::InsufficientCapacity,
            ProvisionError::ExecutionFailure { .. } => ErrorKind::ExecutionFailure,
            ProvisionError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            ProvisionError::ProviderNotFound(_) => ErrorKind::ProviderNotFound,
            ProvisionError::Annotated { source, .. } => source.kind(),
        }
    }

    pub fn is_not_supported(&self) -> bool {
        self.kind() == ErrorKind::NotSupported
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
