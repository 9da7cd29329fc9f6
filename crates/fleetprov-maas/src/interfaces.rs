//! Interface bindings for the acquire call

use fleetprov_provider::{ParameterSet, ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Requirement a node interface must satisfy for the node to be selected,
/// derived from deploy-time space bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceBinding {
    pub name: String,

    pub space_provider_id: String,

    /// The interface must not be in this space
    pub excluded: bool,
}

impl InterfaceBinding {
    pub fn new(name: impl Into<String>, space_provider_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            space_provider_id: space_provider_id.into(),
            excluded: false,
        }
    }

    pub fn excluding(name: impl Into<String>, space_provider_id: impl Into<String>) -> Self {
        Self {
            excluded: true,
            ..Self::new(name, space_provider_id)
        }
    }
}

/// Encode bindings as the `interfaces` and `not_networks` acquire arguments.
///
/// Fails without touching `params` if a binding has an empty name or space,
/// or if two bindings share a name.
pub fn add_interfaces(params: &mut ParameterSet, bindings: &[InterfaceBinding]) -> Result<()> {
    if bindings.is_empty() {
        return Ok(());
    }

    let mut positives = Vec::new();
    let mut negatives = Vec::new();
    let mut names = HashSet::new();
    for binding in bindings {
        if binding.name.is_empty() {
            return Err(ProvisionError::InvalidBinding(
                "interface bindings cannot have empty names".to_string(),
            ));
        }
        if binding.space_provider_id.is_empty() {
            return Err(ProvisionError::InvalidBinding(format!(
                "invalid interface binding {:?}: space provider ID is required",
                binding.name
            )));
        }
        if !names.insert(binding.name.as_str()) {
            return Err(ProvisionError::InvalidBinding(format!(
                "duplicated interface binding {:?}",
                binding.name
            )));
        }

        if binding.excluded {
            negatives.push(format!("space:{}", binding.space_provider_id));
        } else {
            positives.push(format!("{}:space={}", binding.name, binding.space_provider_id));
        }
    }

    if !positives.is_empty() {
        params.add("interfaces", positives.join(";"));
    }
    if !negatives.is_empty() {
        params.add("not_networks", negatives.join(","));
    }
    Ok(())
}
