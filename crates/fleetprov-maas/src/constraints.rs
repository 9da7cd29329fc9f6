//! Constraint translation into MAAS acquire arguments

use fleetprov_provider::{
    ConstraintName, ConstraintSet, ParameterSet, Result, SignedValue, partition_signed,
};

use crate::interfaces::{InterfaceBinding, add_interfaces};
use crate::volumes::{VolumeInfo, add_storage};

/// Receives constraints the translation had to drop
pub trait ConstraintObserver: Send + Sync {
    fn ignored_constraint(&self, name: ConstraintName);
}

/// Reports dropped constraints as `tracing` warnings
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ConstraintObserver for TracingObserver {
    fn ignored_constraint(&self, name: ConstraintName) {
        tracing::warn!("ignoring unsupported constraint '{}'", name);
    }
}

/// Convert constraints into acquire arguments.
///
/// Architecture names are shared with MAAS and pass through unchanged. MAAS
/// has no notion of CPU power or instance types, so those are dropped and
/// reported to `observer`. Spaces are not handled here, see
/// [`spaces_to_bindings`].
pub fn convert_constraints(
    cons: &ConstraintSet,
    observer: &dyn ConstraintObserver,
) -> ParameterSet {
    let mut params = ParameterSet::new();
    if let Some(arch) = &cons.arch {
        params.add("arch", arch.as_str());
    }
    if let Some(cores) = cons.cpu_cores {
        params.add("cpu_count", cores.to_string());
    }
    if let Some(mem) = cons.mem {
        params.add("mem", mem.to_string());
    }
    if let Some(tags) = &cons.tags {
        add_tags(&mut params, tags);
    }
    if cons.cpu_power.is_some() {
        observer.ignored_constraint(ConstraintName::CpuPower);
    }
    if cons.instance_type.is_some() {
        observer.ignored_constraint(ConstraintName::InstanceType);
    }
    params
}

/// Positive tags go to `tags`, negative ones to `not_tags`; either is
/// omitted when empty.
fn add_tags(params: &mut ParameterSet, tags: &[SignedValue]) {
    let (positives, negatives) = partition_signed(tags);
    if !positives.is_empty() {
        params.add("tags", positives.join(","));
    }
    if !negatives.is_empty() {
        params.add("not_tags", negatives.join(","));
    }
}

/// Expand a signed space list into bindings named `"0"`, `"1"`, ...
///
/// All positive spaces come first, then the excluded ones, each in
/// encounter order.
pub fn spaces_to_bindings(spaces: &[SignedValue]) -> Vec<InterfaceBinding> {
    let (positives, negatives) = partition_signed(spaces);
    let positives = positives.into_iter().map(|space| (space, false));
    let negatives = negatives.into_iter().map(|space| (space, true));
    positives
        .chain(negatives)
        .enumerate()
        .map(|(index, (space, excluded))| InterfaceBinding {
            name: index.to_string(),
            space_provider_id: space.to_string(),
            excluded,
        })
        .collect()
}

/// Everything needed to acquire one node
#[derive(Debug, Clone, Default)]
pub struct AcquireNodeArgs {
    pub constraints: ConstraintSet,

    /// Bindings supplied by the caller, encoded before those derived from
    /// the spaces constraint
    pub interfaces: Vec<InterfaceBinding>,

    pub volumes: Vec<VolumeInfo>,

    /// Availability zone to place the node in
    pub zone: Option<String>,

    /// Agent name MAAS records as the node owner
    pub agent_name: Option<String>,
}

/// Build the full acquire argument set.
///
/// Returns no parameters at all if the interface bindings are invalid.
pub fn acquire_params(
    args: &AcquireNodeArgs,
    observer: &dyn ConstraintObserver,
) -> Result<ParameterSet> {
    let mut params = convert_constraints(&args.constraints, observer);

    let mut bindings = args.interfaces.clone();
    if let Some(spaces) = &args.constraints.spaces {
        bindings.extend(spaces_to_bindings(spaces));
    }
    add_interfaces(&mut params, &bindings)?;
    add_storage(&mut params, &args.volumes);

    if let Some(zone) = &args.zone {
        params.add("zone", zone.as_str());
    }
    if let Some(agent_name) = &args.agent_name {
        params.add("agent_name", agent_name.as_str());
    }
    Ok(params)
}
