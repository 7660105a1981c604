use serde::{Deserialize, Serialize};

/// Identifies a class of cluster resources: group, version, resource
/// (the plural, lower-case kind used by the cluster API, e.g. `pods`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gvr {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl Gvr {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// `group/version`, or just `version` for the core group (empty group string).
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl std::fmt::Display for Gvr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_version_joins_group_and_version() {
        let gvr = Gvr::new("batch", "v1", "jobs");
        assert_eq!(gvr.api_version(), "batch/v1");
        assert_eq!(gvr.to_string(), "batch/v1/jobs");
    }

    #[test]
    fn api_version_omits_empty_core_group() {
        let gvr = Gvr::new("", "v1", "pods");
        assert_eq!(gvr.api_version(), "v1");
    }
}
