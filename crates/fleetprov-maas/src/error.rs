//! MAAS backend error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaasError {
    #[error("maas CLI command failed: {0}")]
    CommandFailed(#[from] fleetprov_provider::CommandError),

    #[error("cannot get supported architectures: {0}")]
    Architectures(String),

    #[error("no machine matched the allocation request")]
    NoMatchingMachine,

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("provisioning error: {0}")]
    Provision(#[from] fleetprov_provider::ProvisionError),
}

pub type Result<T> = std::result::Result<T, MaasError>;
