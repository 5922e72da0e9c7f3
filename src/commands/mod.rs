//! Command handlers
//!
//! Each handler turns parsed CLI arguments into calls on the config, domain
//! and service layers and reports the outcome on the terminal.

pub mod plan;
pub mod run;
pub mod tag_check;

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::ReleaseInputs;
use crate::config::{
    load_raw_version, AllowedTargetSet, ReleaseConfig, RunnerSettings, VersionSource,
    VersionSourceKind,
};
use crate::domain::version::RawVersion;

/// Everything read from disk and the environment before a run starts
pub struct LoadedRelease {
    pub config: ReleaseConfig,
    pub settings: RunnerSettings,
    pub source: VersionSource,
    pub raw_version: RawVersion,
    pub allowed: Option<AllowedTargetSet>,
}

/// Load settings, the release description, the version constants and the allow-list
pub fn load_release(inputs: &ReleaseInputs) -> Result<LoadedRelease> {
    let mut settings = RunnerSettings::load(inputs.settings.as_deref())
        .context("Failed to load runner settings")?;

    if let Some(kind) = &inputs.version_source {
        settings.version_source = kind
            .parse::<VersionSourceKind>()
            .context("Invalid --version-source")?;
    }

    let config = ReleaseConfig::load(&inputs.release).with_context(|| {
        format!(
            "Failed to load release description {}",
            inputs.release.display()
        )
    })?;

    let source = VersionSource::select(settings.version_source, inputs.defs.clone())?;
    debug!("Reading version constants from {}", source.describe());
    let raw_version = load_raw_version(&source, &config)?;

    let allowed = inputs
        .expected_targets
        .as_deref()
        .map(AllowedTargetSet::parse)
        .transpose()?;

    Ok(LoadedRelease {
        config,
        settings,
        source,
        raw_version,
        allowed,
    })
}
