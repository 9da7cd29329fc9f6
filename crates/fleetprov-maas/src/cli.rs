//! maas CLI wrapper
//!
//! Wraps the `maas <profile> ...` commands used to inspect and acquire nodes.

use crate::error::{MaasError, Result};
use fleetprov_provider::{CommandError, CommandRunner, ParameterSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

const MAAS_BIN: &str = "maas";

/// maas CLI wrapper bound to a logged-in profile
#[derive(Clone)]
pub struct MaasCli {
    profile: String,
    runner: Arc<dyn CommandRunner>,
}

impl MaasCli {
    pub fn new(profile: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            profile: profile.into(),
            runner,
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Run a maas command under the profile and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut full_args = vec![self.profile.as_str()];
        full_args.extend_from_slice(args);
        Ok(self.runner.run(MAAS_BIN, &full_args).await?)
    }

    /// List boot resources known to the region controller
    pub async fn boot_resources(&self) -> Result<Vec<BootResource>> {
        let output = self.run_command(&["boot-resources", "read"]).await?;

        if output.trim().is_empty() || output.trim() == "[]" {
            return Ok(Vec::new());
        }

        let resources: Vec<BootResource> = serde_json::from_str(&output)?;
        Ok(resources)
    }

    /// Architectures nodes can be deployed with, e.g. `amd64`, `arm64`
    ///
    /// Subarchitectures (`amd64/generic`, `armhf/highbank`) collapse onto
    /// their base architecture.
    pub async fn supported_architectures(&self) -> Result<BTreeSet<String>> {
        let resources = self.boot_resources().await?;
        let arches: BTreeSet<String> = resources
            .iter()
            .filter_map(|r| r.base_architecture())
            .map(str::to_string)
            .collect();

        if arches.is_empty() {
            return Err(MaasError::Architectures(
                "no boot resources have been imported".to_string(),
            ));
        }

        tracing::debug!("Supported architectures: {:?}", arches);
        Ok(arches)
    }

    /// Acquire a machine matching `params`
    pub async fn allocate_machine(&self, params: &ParameterSet) -> Result<MachineInfo> {
        let args = params.to_args();
        let mut cmd_args = vec!["machines", "allocate"];
        cmd_args.extend(args.iter().map(String::as_str));

        let output = match self.run_command(&cmd_args).await {
            Ok(output) => output,
            Err(MaasError::CommandFailed(CommandError::Failed { stderr, .. }))
                if stderr.contains("409") || stderr.contains("No machine available") =>
            {
                return Err(MaasError::NoMatchingMachine);
            }
            Err(e) => return Err(e),
        };

        let machine: MachineInfo = serde_json::from_str(&output)?;
        Ok(machine)
    }

    /// Release a previously acquired machine
    pub async fn release_machine(&self, system_id: &str) -> Result<()> {
        self.run_command(&["machine", "release", system_id]).await?;
        Ok(())
    }
}

/// Boot resource as reported by `boot-resources read`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootResource {
    pub id: u64,

    pub name: String,

    /// `arch/subarch`, e.g. `amd64/generic`
    pub architecture: String,

    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
}

impl BootResource {
    pub fn base_architecture(&self) -> Option<&str> {
        self.architecture
            .split('/')
            .next()
            .filter(|arch| !arch.is_empty())
    }
}

/// Machine information returned by an allocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInfo {
    pub system_id: String,

    pub hostname: String,

    #[serde(default)]
    pub architecture: Option<String>,

    #[serde(default)]
    pub cpu_count: Option<u64>,

    /// Memory in MiB
    #[serde(default)]
    pub memory: Option<u64>,

    #[serde(default)]
    pub tag_names: Vec<String>,

    #[serde(default)]
    pub zone: Option<ZoneInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub name: String,
}
