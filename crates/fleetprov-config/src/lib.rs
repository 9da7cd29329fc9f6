//! Configuration for fleetprov
//!
//! One YAML file names the environment, the MAAS profile and the storage
//! pools handed to storage providers.

pub mod error;

pub use error::*;

use fleetprov_provider::{ConfigValue, EnvironConfig, ProviderType, StorageConfig};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "FLEETPROV_CONFIG";

const LOCAL_CONFIG_FILE: &str = "fleetprov.yaml";

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProvisionerConfig {
    #[serde(default)]
    pub environ: EnvironConfig,

    #[serde(default)]
    pub maas: Option<MaasSettings>,

    #[serde(default)]
    pub storage_pools: Vec<StoragePoolConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaasSettings {
    /// Logged-in `maas` CLI profile
    pub profile: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePoolConfig {
    pub name: String,

    /// Storage provider type, e.g. `rootfs`
    pub provider: String,

    #[serde(default)]
    pub attrs: HashMap<String, ConfigValue>,
}

impl ProvisionerConfig {
    /// Read and validate the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;
        tracing::debug!(
            "Loaded config from {} ({} storage pools)",
            path.display(),
            config.storage_pools.len()
        );
        Ok(config)
    }

    /// Locate the config file with [`find_config_file`] and load it.
    pub fn discover() -> Result<Self> {
        Self::load(find_config_file()?)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for pool in &self.storage_pools {
            if pool.name.is_empty() {
                return Err(ConfigError::Invalid(
                    "storage pool name cannot be empty".to_string(),
                ));
            }
            if pool.provider.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "storage pool {:?} has no provider",
                    pool.name
                )));
            }
            if !names.insert(pool.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicated storage pool {:?}",
                    pool.name
                )));
            }
        }
        if let Some(maas) = &self.maas
            && maas.profile.is_empty()
        {
            return Err(ConfigError::Invalid(
                "maas profile cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn environ_config(&self) -> EnvironConfig {
        self.environ.clone()
    }

    /// Storage configuration for the named pool
    pub fn storage_config(&self, pool: &str) -> Result<StorageConfig> {
        self.storage_pools
            .iter()
            .find(|p| p.name == pool)
            .map(StoragePoolConfig::to_storage_config)
            .ok_or_else(|| ConfigError::PoolNotFound(pool.to_string()))
    }
}

impl StoragePoolConfig {
    pub fn to_storage_config(&self) -> StorageConfig {
        StorageConfig {
            name: self.name.clone(),
            provider_type: ProviderType::new(self.provider.clone()),
            attrs: self.attrs.clone(),
        }
    }
}

/// Per-user config directory (`~/.config/fleetprov` on Linux)
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("fleetprov"))
}

/// Find the config file
///
/// Search order:
/// 1. `FLEETPROV_CONFIG` environment variable
/// 2. `./fleetprov.yaml`
/// 3. `<config dir>/fleetprov/config.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "{} points at missing file {}",
            CONFIG_ENV_VAR,
            path.display()
        );
    }

    let local = std::env::current_dir()?.join(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Ok(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("fleetprov").join("config.yaml");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}
