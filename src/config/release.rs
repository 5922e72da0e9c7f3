//! Release description (release.json) loading and validation.
//!
//! The document is parsed strictly: unknown keys are rejected so that a typo in
//! a field that gates side effects (`upgrade_to_release`, `is_service_firmware`)
//! fails the run instead of silently selecting the wrong mode.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::release::ReleaseMode;
use crate::domain::target::TargetKey;
use crate::error::{ConfigError, ReleaseError, ValidationError};

/// Branch prefixes a release may be cut from
pub const ALLOWED_BRANCH_PREFIXES: [&str; 2] = ["release", "hotfix"];

/// Hosting project identifier; accepted as a JSON number or string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRepositoryId", into = "String")]
pub struct RepositoryId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRepositoryId {
    Number(u64),
    Text(String),
}

impl From<RawRepositoryId> for RepositoryId {
    fn from(raw: RawRepositoryId) -> Self {
        match raw {
            RawRepositoryId::Number(n) => Self(n.to_string()),
            RawRepositoryId::Text(s) => Self(s),
        }
    }
}

impl From<RepositoryId> for String {
    fn from(id: RepositoryId) -> Self {
        id.0
    }
}

impl RepositoryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One entry of the `targets` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetTemplate {
    pub hard_num: u32,
    pub variant_num: u32,

    /// Per-target revision override (takes precedence over the version source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_ver: Option<i64>,
}

impl TargetTemplate {
    #[cfg(test)]
    pub fn new(hard_num: u32, variant_num: u32) -> Self {
        Self {
            hard_num,
            variant_num,
            revision_ver: None,
        }
    }

    pub fn key(&self) -> TargetKey {
        TargetKey::new(self.hard_num, self.variant_num)
    }
}

/// Version constants embedded in the release document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentVersion {
    pub product_id: i64,
    pub major_ver: i64,
    pub minor_ver: i64,
    #[serde(default)]
    pub revision_ver: Option<i64>,
}

/// Validated release description
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseConfig {
    #[serde(rename = "cmake_project_name")]
    pub project_name: String,

    #[serde(rename = "git_project_id")]
    pub repository_id: RepositoryId,

    pub branch_name: String,

    pub targets: Vec<TargetTemplate>,

    #[serde(default)]
    pub is_service_firmware: bool,

    #[serde(default)]
    pub upgrade_to_release: bool,

    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub bug_fixes: Vec<String>,

    /// Cache-buster: bumped to force a re-run, carries no meaning
    #[serde(default)]
    pub release_count: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<DocumentVersion>,
}

impl ReleaseConfig {
    /// Load and validate a release description from disk
    pub fn load(path: &Path) -> Result<Self, ReleaseError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&content)
    }

    /// Parse (schema) then validate (project rules), first violation wins
    pub fn from_json(content: &str) -> Result<Self, ReleaseError> {
        let config: ReleaseConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })?;

        if config.project_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cmake_project_name".to_string(),
                value: config.project_name,
            }
            .into());
        }

        config.validate()?;
        Ok(config)
    }

    /// Cross-field rules: branch prefix, then target list shape
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !ALLOWED_BRANCH_PREFIXES
            .iter()
            .any(|prefix| self.branch_name.starts_with(prefix))
        {
            return Err(ValidationError::BadBranch {
                branch: self.branch_name.clone(),
            });
        }

        let keys: Vec<TargetKey> = self.targets.iter().map(TargetTemplate::key).collect();
        crate::domain::target::ensure_unique_keys(&keys)?;

        Ok(())
    }

    pub fn mode(&self) -> ReleaseMode {
        if self.upgrade_to_release {
            ReleaseMode::Promote
        } else {
            ReleaseMode::Standard
        }
    }

    /// `hotfix` or `release`, used in release notes
    pub fn branch_kind(&self) -> &'static str {
        if self.branch_name.starts_with("hotfix") {
            "hotfix"
        } else {
            "release"
        }
    }
}
