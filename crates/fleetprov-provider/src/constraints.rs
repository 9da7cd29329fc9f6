//! Backend-agnostic resource constraints

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProvisionError;

/// Prefix marking an excluded entry in the string form of a signed list.
pub const EXCLUSION_MARKER: char = '^';

/// Names of the constraints a [`ConstraintSet`] can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintName {
    Arch,
    CpuCores,
    CpuPower,
    Mem,
    InstanceType,
    Tags,
    Spaces,
}

impl ConstraintName {
    pub const ALL: [ConstraintName; 7] = [
        ConstraintName::Arch,
        ConstraintName::CpuCores,
        ConstraintName::CpuPower,
        ConstraintName::Mem,
        ConstraintName::InstanceType,
        ConstraintName::Tags,
        ConstraintName::Spaces,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintName::Arch => "arch",
            ConstraintName::CpuCores => "cpu-cores",
            ConstraintName::CpuPower => "cpu-power",
            ConstraintName::Mem => "mem",
            ConstraintName::InstanceType => "instance-type",
            ConstraintName::Tags => "tags",
            ConstraintName::Spaces => "spaces",
        }
    }
}

impl fmt::Display for ConstraintName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstraintName {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConstraintName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ProvisionError::UnsupportedConstraint(s.to_string()))
    }
}

/// One entry of a signed list: a value selected for or excluded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SignedValue {
    value: String,
    excluded: bool,
}

impl SignedValue {
    pub fn include(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            excluded: false,
        }
    }

    pub fn exclude(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            excluded: true,
        }
    }

    /// Parse the marker-prefixed form (`"ssd"`, `"^ssd"`).
    ///
    /// Returns `None` for empty and marker-only entries.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.strip_prefix(EXCLUSION_MARKER) {
            Some("") => None,
            Some(value) => Some(Self::exclude(value)),
            None if raw.is_empty() => None,
            None => Some(Self::include(raw)),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }
}

impl fmt::Display for SignedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.excluded {
            write!(f, "{}{}", EXCLUSION_MARKER, self.value)
        } else {
            f.write_str(&self.value)
        }
    }
}

impl TryFrom<String> for SignedValue {
    type Error = ProvisionError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        SignedValue::parse(&raw)
            .ok_or_else(|| ProvisionError::InvalidRequest(format!("empty signed value {raw:?}")))
    }
}

impl From<SignedValue> for String {
    fn from(value: SignedValue) -> Self {
        value.to_string()
    }
}

/// Parse a marker-prefixed list, dropping empty and marker-only entries.
pub fn parse_signed_list<I, S>(raw: I) -> Vec<SignedValue>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|value| SignedValue::parse(value.as_ref()))
        .collect()
}

/// Split a signed list into (positives, negatives), keeping encounter order.
///
/// Entries with an empty value are dropped.
pub fn partition_signed(values: &[SignedValue]) -> (Vec<&str>, Vec<&str>) {
    let mut positives = Vec::new();
    let mut negatives = Vec::new();
    for value in values.iter().filter(|v| !v.value.is_empty()) {
        if value.excluded {
            negatives.push(value.value.as_str());
        } else {
            positives.push(value.value.as_str());
        }
    }
    (positives, negatives)
}

/// Abstract resource request
///
/// Every field is independently optional; `None` means "no preference",
/// which is different from `Some(0)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConstraintSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u64>,

    /// Relative CPU power
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_power: Option<u64>,

    /// Memory in MiB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<SignedValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spaces: Option<Vec<SignedValue>>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    pub fn with_cpu_cores(mut self, cores: u64) -> Self {
        self.cpu_cores = Some(cores);
        self
    }

    pub fn with_cpu_power(mut self, power: u64) -> Self {
        self.cpu_power = Some(power);
        self
    }

    pub fn with_mem(mut self, mem: u64) -> Self {
        self.mem = Some(mem);
        self
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    /// Set tags from their marker-prefixed string form.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = Some(parse_signed_list(tags));
        self
    }

    /// Set spaces from their marker-prefixed string form.
    pub fn with_spaces<I, S>(mut self, spaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.spaces = Some(parse_signed_list(spaces));
        self
    }

    /// Whether `name` carries a non-empty value.
    pub fn has(&self, name: ConstraintName) -> bool {
        !self.values(name).is_empty()
    }

    /// The string values held for `name`, for vocabulary checks.
    ///
    /// Scalars yield at most one value, signed lists yield their bare values.
    pub fn values(&self, name: ConstraintName) -> Vec<String> {
        let signed = |list: &Option<Vec<SignedValue>>| -> Vec<String> {
            list.iter()
                .flatten()
                .map(|v| v.value().to_string())
                .collect()
        };
        match name {
            ConstraintName::Arch => self.arch.iter().cloned().collect(),
            ConstraintName::CpuCores => self.cpu_cores.iter().map(u64::to_string).collect(),
            ConstraintName::CpuPower => self.cpu_power.iter().map(u64::to_string).collect(),
            ConstraintName::Mem => self.mem.iter().map(u64::to_string).collect(),
            ConstraintName::InstanceType => self.instance_type.iter().cloned().collect(),
            ConstraintName::Tags => signed(&self.tags),
            ConstraintName::Spaces => signed(&self.spaces),
        }
    }

    /// Clear `name`, as if it had never been set.
    pub fn without(mut self, name: ConstraintName) -> Self {
        match name {
            ConstraintName::Arch => self.arch = None,
            ConstraintName::CpuCores => self.cpu_cores = None,
            ConstraintName::CpuPower => self.cpu_power = None,
            ConstraintName::Mem => self.mem = None,
            ConstraintName::InstanceType => self.instance_type = None,
            ConstraintName::Tags => self.tags = None,
            ConstraintName::Spaces => self.spaces = None,
        }
        self
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |list: &[SignedValue]| {
            list.iter()
                .map(SignedValue::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        let mut parts = Vec::new();
        if let Some(arch) = &self.arch {
            parts.push(format!("arch={arch}"));
        }
        if let Some(cores) = self.cpu_cores {
            parts.push(format!("cpu-cores={cores}"));
        }
        if let Some(power) = self.cpu_power {
            parts.push(format!("cpu-power={power}"));
        }
        if let Some(mem) = self.mem {
            parts.push(format!("mem={mem}M"));
        }
        if let Some(instance_type) = &self.instance_type {
            parts.push(format!("instance-type={instance_type}"));
        }
        if let Some(tags) = &self.tags {
            parts.push(format!("tags={}", join(tags)));
        }
        if let Some(spaces) = &self.spaces {
            parts.push(format!("spaces={}", join(spaces)));
        }
        f.write_str(&parts.join(" "))
    }
}
