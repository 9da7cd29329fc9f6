//! MAAS environ: validator seeding and node acquisition

use crate::cli::{MachineInfo, MaasCli};
use crate::constraints::{AcquireNodeArgs, ConstraintObserver, TracingObserver, acquire_params};
use crate::error::Result;
use fleetprov_provider::{ConstraintName, ProvisionError, Validator};
use std::sync::Arc;

/// Constraints MAAS can never honor
pub const UNSUPPORTED_CONSTRAINTS: [ConstraintName; 2] =
    [ConstraintName::CpuPower, ConstraintName::InstanceType];

/// A MAAS region reached through the `maas` CLI
pub struct MaasEnviron {
    cli: MaasCli,
    observer: Arc<dyn ConstraintObserver>,
}

impl MaasEnviron {
    pub fn new(cli: MaasCli) -> Self {
        Self {
            cli,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the observer told about dropped constraints.
    pub fn with_observer(mut self, observer: Arc<dyn ConstraintObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn cli(&self) -> &MaasCli {
        &self.cli
    }

    /// Build a validator for this region.
    ///
    /// The `arch` vocabulary comes from the boot resources the region has
    /// imported, so this calls out to MAAS.
    pub async fn constraints_validator(&self) -> Result<Validator> {
        let mut validator = Validator::new();
        validator.register_unsupported(UNSUPPORTED_CONSTRAINTS)?;
        let arches = self.cli.supported_architectures().await?;
        validator.register_vocabulary(ConstraintName::Arch, arches)?;
        Ok(validator)
    }

    /// Validate the request and acquire a matching machine.
    pub async fn acquire_node(&self, args: &AcquireNodeArgs) -> Result<MachineInfo> {
        let validator = self.constraints_validator().await?;
        let validated = validator.validate(&args.constraints)?;
        for name in &validated.unsupported {
            self.observer.ignored_constraint(*name);
        }

        let args = AcquireNodeArgs {
            constraints: validated.effective,
            ..args.clone()
        };
        let params = acquire_params(&args, self.observer.as_ref())?;

        tracing::info!("Acquiring node: {}", args.constraints);
        let machine = self.cli.allocate_machine(&params).await?;
        tracing::info!("Acquired node {} ({})", machine.hostname, machine.system_id);
        Ok(machine)
    }

    /// Give a machine back to the pool.
    pub async fn release_node(&self, system_id: &str) -> Result<()> {
        if system_id.is_empty() {
            return Err(ProvisionError::InvalidRequest(
                "cannot release a machine without a system ID".to_string(),
            )
            .into());
        }
        self.cli.release_machine(system_id).await
    }
}
