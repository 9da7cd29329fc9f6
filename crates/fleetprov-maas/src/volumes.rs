//! Storage argument for the acquire call

use fleetprov_provider::ParameterSet;
use serde::{Deserialize, Serialize};

/// Extra disk requested together with a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub name: Option<String>,

    pub size_gb: u64,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl VolumeInfo {
    pub fn new(size_gb: u64) -> Self {
        Self {
            size_gb,
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// `[name:]size[(tag,tag)]`
    fn to_param(&self) -> String {
        let mut param = String::new();
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            param.push_str(name);
            param.push(':');
        }
        param.push_str(&self.size_gb.to_string());
        if !self.tags.is_empty() {
            param.push_str(&format!("({})", self.tags.join(",")));
        }
        param
    }
}

/// Encode volumes as the `storage` acquire argument.
///
/// e.g. `storage=root:0(ssd),data:20(magnetic,5400rpm),45`
pub fn add_storage(params: &mut ParameterSet, volumes: &[VolumeInfo]) {
    if volumes.is_empty() {
        return;
    }
    let encoded: Vec<String> = volumes.iter().map(VolumeInfo::to_param).collect();
    params.add("storage", encoded.join(","));
}
