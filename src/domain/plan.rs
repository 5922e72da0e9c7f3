//! Validation gate and target matrix expansion
//!
//! `plan_release` runs every pre-flight check and returns the fully named
//! target list. It performs no I/O, so the `plan` command and the release
//! service share exactly the same gate.

use crate::config::{AllowedTargetSet, ReleaseConfig};
use crate::domain::naming;
use crate::domain::release::ReleaseMode;
use crate::domain::target::{ensure_distinct_names, ResolvedTarget, TargetKey};
use crate::domain::version::{RawVersion, VersionConstants, VersionResolver};
use crate::error::{ReleaseError, ValidationError, VersionExtractionError};

/// One entry of the expanded matrix, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTarget {
    pub key: TargetKey,
    pub target_name: String,
    /// Err when a per-target revision override could not be resolved
    pub resolution: Result<ResolvedTarget, VersionExtractionError>,
}

impl PlannedTarget {
    pub fn resolved(&self) -> Option<&ResolvedTarget> {
        self.resolution.as_ref().ok()
    }
}

/// Output of the validation gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePlan {
    pub mode: ReleaseMode,
    pub project_name: String,
    pub branch_name: String,
    pub targets: Vec<PlannedTarget>,
}

impl ReleasePlan {
    pub fn resolved_targets(&self) -> impl Iterator<Item = &ResolvedTarget> {
        self.targets.iter().filter_map(PlannedTarget::resolved)
    }

    pub fn unresolved_count(&self) -> usize {
        self.targets.iter().filter(|t| t.resolution.is_err()).count()
    }
}

/// Run the validation gate
///
/// Order: document rules, run-global version, per-target revisions, naming,
/// name collisions, allow-list. Every error returned here is fatal for the
/// run; per-target override failures are kept in the plan instead.
pub fn plan_release(
    config: &ReleaseConfig,
    raw_version: RawVersion,
    source_name: &str,
    allowed: Option<&AllowedTargetSet>,
) -> Result<ReleasePlan, ReleaseError> {
    config.validate()?;

    let resolver = VersionResolver::new(raw_version, config.is_service_firmware, source_name)?;
    let version = resolver.constants();

    // The source revision is run-global: if any target relies on it, it must resolve
    if config.targets.iter().any(|t| t.revision_ver.is_none()) {
        resolver.resolve(None)?;
    }

    let mode = config.mode();
    let mut targets = Vec::with_capacity(config.targets.len());
    for template in &config.targets {
        targets.push(plan_target(
            &config.project_name,
            template.key(),
            template.revision_ver,
            &resolver,
            &version,
            mode,
        )?);
    }

    let resolved: Vec<ResolvedTarget> = targets
        .iter()
        .filter_map(PlannedTarget::resolved)
        .cloned()
        .collect();
    ensure_distinct_names(&resolved)?;

    if let Some(allowed) = allowed {
        check_allowed(&targets, allowed)?;
    }

    Ok(ReleasePlan {
        mode,
        project_name: config.project_name.clone(),
        branch_name: config.branch_name.clone(),
        targets,
    })
}

fn plan_target(
    project_name: &str,
    key: TargetKey,
    revision_override: Option<i64>,
    resolver: &VersionResolver,
    version: &VersionConstants,
    mode: ReleaseMode,
) -> Result<PlannedTarget, ValidationError> {
    // Key constraints apply even when the revision fails
    naming::check_key(key, version)?;

    let resolution = match resolver.resolve(revision_override) {
        Ok(revision) => {
            let names = naming::target_names(project_name, key, version, revision)?;
            Ok(ResolvedTarget::new(key, revision, names, mode))
        }
        Err(err) => Err(err),
    };

    Ok(PlannedTarget {
        key,
        target_name: naming::target_name(project_name, key),
        resolution,
    })
}

fn check_allowed(targets: &[PlannedTarget], allowed: &AllowedTargetSet) -> Result<(), ValidationError> {
    match targets.iter().find(|t| !allowed.contains(&t.target_name)) {
        Some(target) => Err(ValidationError::UnexpectedTarget {
            target: target.target_name.clone(),
            allowed: allowed.names(),
        }),
        None => Ok(()),
    }
}
