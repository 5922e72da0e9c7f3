//! # Release Configuration
//!
//! Three inputs feed a release run:
//!
//! 1. **Release description** (`release.json`)
//!    - What to release: project, branch, target matrix, mode, notes
//!
//! 2. **Version source** (`defs.h` or the description's `version` block)
//!    - Product id, major/minor version, revision
//!
//! 3. **Runner settings** (`fwrelease.yaml`, optional) plus the
//!    `EXPECTED_TARGETS` allow-list
//!    - Where and how: remote, branches, output directories
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let config = ReleaseConfig::load(Path::new("release.json"))?;
//! let raw = load_raw_version(&VersionSource::Defs("defs.h".into()), &config)?;
//! ```

pub mod defs;
pub mod release;
mod settings;

pub use release::ReleaseConfig;
pub use settings::{BotIdentity, RunnerSettings, VersionSourceKind};

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::domain::version::RawVersion;
use crate::error::{ConfigError, VersionExtractionError};

/// Concrete version source for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    Defs(PathBuf),
    Document,
}

impl VersionSource {
    /// Combine the configured kind with the header path given on the command line
    pub fn select(kind: VersionSourceKind, defs_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match (kind, defs_path) {
            (VersionSourceKind::Defs, Some(path)) => Ok(Self::Defs(path)),
            (VersionSourceKind::Defs, None) => Err(ConfigError::InvalidValue {
                field: "defs_path".to_string(),
                value: "<missing> (required when version_source = defs)".to_string(),
            }),
            (VersionSourceKind::Document, _) => Ok(Self::Document),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Defs(path) => path.display().to_string(),
            Self::Document => "release description".to_string(),
        }
    }
}

/// Read version constants from the configured source
pub fn load_raw_version(
    source: &VersionSource,
    config: &ReleaseConfig,
) -> Result<RawVersion, VersionExtractionError> {
    match source {
        VersionSource::Defs(path) => defs::load_defs(path),
        VersionSource::Document => {
            let version =
                config
                    .version
                    .as_ref()
                    .ok_or_else(|| VersionExtractionError::MissingSymbol {
                        symbol: "version".to_string(),
                        source_name: source.describe(),
                    })?;
            Ok(RawVersion {
                product_id: version.product_id,
                major: version.major_ver,
                minor: version.minor_ver,
                revision: version.revision_ver,
            })
        }
    }
}

/// Whitelist of permitted target names (`EXPECTED_TARGETS`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedTargetSet {
    names: BTreeSet<String>,
}

impl AllowedTargetSet {
    /// Parse a comma-separated list; a set-but-empty list is a configuration error
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let names: BTreeSet<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            return Err(ConfigError::EmptyAllowList {
                raw: raw.to_string(),
            });
        }

        Ok(Self { names })
    }

    pub fn contains(&self, target_name: &str) -> bool {
        self.names.contains(target_name)
    }

    pub fn names(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}
