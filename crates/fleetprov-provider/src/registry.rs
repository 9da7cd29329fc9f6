//! Storage provider registry

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ProvisionError, Result};
use crate::storage::{
    EnvironConfig, FilesystemSource, ProviderType, StorageConfig, StorageProvider, VolumeSource,
};

/// Storage providers keyed by provider type
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderType, Arc<dyn StorageProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous one of the same type.
    pub fn register(&mut self, provider: Arc<dyn StorageProvider>) {
        let provider_type = provider.provider_type();
        tracing::info!("Registered storage provider: {}", provider_type);
        self.providers.insert(provider_type, provider);
    }

    pub fn get(&self, provider_type: &ProviderType) -> Result<Arc<dyn StorageProvider>> {
        self.providers
            .get(provider_type)
            .cloned()
            .ok_or_else(|| ProvisionError::ProviderNotFound(provider_type.to_string()))
    }

    pub fn provider_types(&self) -> Vec<&ProviderType> {
        let mut types: Vec<_> = self.providers.keys().collect();
        types.sort();
        types
    }

    /// Validate `config` with the provider it names.
    pub fn validate_config(&self, config: &StorageConfig) -> Result<()> {
        self.get(&config.provider_type)?.validate_config(config)
    }

    pub fn volume_source(
        &self,
        environ: &EnvironConfig,
        config: &StorageConfig,
    ) -> Result<Box<dyn VolumeSource>> {
        self.get(&config.provider_type)?.volume_source(environ, config)
    }

    pub fn filesystem_source(
        &self,
        environ: &EnvironConfig,
        config: &StorageConfig,
    ) -> Result<Box<dyn FilesystemSource>> {
        self.get(&config.provider_type)?.filesystem_source(environ, config)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_types())
            .finish()
    }
}
