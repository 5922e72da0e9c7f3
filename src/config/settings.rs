//! Runner settings (fwrelease.yaml)
//!
//! Deployment-level knobs that are not part of a release description: where
//! the version constants come from, which remote to push to, where artifacts
//! land. Every key has a default so the file is optional.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Default settings file looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "fwrelease.yaml";

/// Where the firmware version constants are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSourceKind {
    /// C header passed next to the release description
    #[default]
    Defs,
    /// `version` block inside the release description
    Document,
}

impl std::str::FromStr for VersionSourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "defs" => Ok(Self::Defs),
            "document" => Ok(Self::Document),
            other => Err(ConfigError::InvalidValue {
                field: "version_source".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Identity used for automated commits and annotated tags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotIdentity {
    #[serde(default = "default_bot_name")]
    pub name: String,
    #[serde(default = "default_bot_email")]
    pub email: String,
}

impl Default for BotIdentity {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            email: default_bot_email(),
        }
    }
}

fn default_bot_name() -> String {
    "release_bot".to_string()
}

fn default_bot_email() -> String {
    "release_bot@localhost".to_string()
}

/// Runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Git remote that receives artifact commits and tags
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Remote URL; combined with RELEASE_TOKEN into an authenticated remote
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Branch the changelog proposal is based on
    #[serde(default = "default_integration_branch")]
    pub integration_branch: String,

    #[serde(default = "default_changelog_path")]
    pub changelog_path: PathBuf,

    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    #[serde(default)]
    pub version_source: VersionSourceKind,

    /// Web URL of the repository, used for links in notes and changelog
    #[serde(default)]
    pub repository_url: Option<String>,

    /// Issue tracker browse URL; task ids become links when set
    #[serde(default)]
    pub task_tracker_url: Option<String>,

    #[serde(default)]
    pub bot: BotIdentity,

    #[serde(default = "default_artifact_commit_message")]
    pub artifact_commit_message: String,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_integration_branch() -> String {
    "dev".to_string()
}

fn default_changelog_path() -> PathBuf {
    PathBuf::from("CHANGELOG.md")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("build/artifacts")
}

fn default_artifact_commit_message() -> String {
    "feat(btl.bin): add firmware binaries".to_string()
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            remote_url: None,
            integration_branch: default_integration_branch(),
            changelog_path: default_changelog_path(),
            build_dir: default_build_dir(),
            artifacts_dir: default_artifacts_dir(),
            version_source: VersionSourceKind::default(),
            repository_url: None,
            task_tracker_url: None,
            bot: BotIdentity::default(),
            artifact_commit_message: default_artifact_commit_message(),
        }
    }
}

impl RunnerSettings {
    /// Load settings
    ///
    /// Priority:
    /// 1. Explicit path (must exist)
    /// 2. fwrelease.yaml in the working directory
    /// 3. Built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound {
                        path: path.to_path_buf(),
                    });
                }
                Self::from_file(path)?
            }
            None => {
                let default_path = Path::new(DEFAULT_SETTINGS_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "remote".to_string(),
                value: self.remote.clone(),
            });
        }
        if self.integration_branch.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "integration_branch".to_string(),
                value: self.integration_branch.clone(),
            });
        }
        if self.artifact_commit_message.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "artifact_commit_message".to_string(),
                value: self.artifact_commit_message.clone(),
            });
        }
        Ok(())
    }
}
