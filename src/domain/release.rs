//! Release domain types
//!
//! Defines a release run as a state machine with explicit phases. The mode
//! decides the per-target step sequence; outcomes are recorded per target and
//! never stop sibling targets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::changelog::ChangelogProposal;
use crate::domain::plan::{PlannedTarget, ReleasePlan};
use crate::domain::target::{ResolvedTarget, TargetKey};
use crate::error::{ChangelogError, TargetFailure};

/// Run mode, selected by `upgrade_to_release`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseMode {
    /// Build, commit artifacts, create beta tags
    Standard,
    /// Promote existing beta tags to release tags, then compose a changelog
    Promote,
}

impl ReleaseMode {
    /// Step sequence every target goes through in this mode
    pub fn target_steps(&self) -> &'static [ReleaseStep] {
        match self {
            Self::Standard => &[
                ReleaseStep::Build,
                ReleaseStep::CommitArtifact,
                ReleaseStep::TagBeta,
            ],
            Self::Promote => &[ReleaseStep::ResolveBeta, ReleaseStep::TagRelease],
        }
    }

    /// Whether the run-level changelog phase follows the targets
    pub fn composes_changelog(&self) -> bool {
        matches!(self, Self::Promote)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Promote => "promote",
        }
    }
}

impl fmt::Display for ReleaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Individual per-target steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseStep {
    /// Revision resolution (only fails for per-target overrides)
    Resolve,
    /// Run the build executor
    Build,
    /// Commit and push built artifacts
    CommitArtifact,
    /// Create the beta tag on the artifact commit
    TagBeta,
    /// Look up the commit behind the beta tag
    ResolveBeta,
    /// Create the release tag on the beta commit
    TagRelease,
}

impl ReleaseStep {
    /// Get human-readable name for the step
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resolve => "Resolve",
            Self::Build => "Build",
            Self::CommitArtifact => "Commit Artifact",
            Self::TagBeta => "Tag Beta",
            Self::ResolveBeta => "Resolve Beta",
            Self::TagRelease => "Tag Release",
        }
    }

    /// Get emoji for the step
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Resolve => "🔢",
            Self::Build => "🔨",
            Self::CommitArtifact => "📦",
            Self::TagBeta => "🏷️",
            Self::ResolveBeta => "🔍",
            Self::TagRelease => "🚀",
        }
    }
}

/// Why a run did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// At least one target failed; all of them were attempted
    TargetsFailed { failed: usize, total: usize },
    /// Tags were created but the changelog could not be composed or published
    Changelog(ChangelogError),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetsFailed { failed, total } => {
                write!(f, "{failed} of {total} targets failed")
            }
            Self::Changelog(err) => write!(f, "changelog: {err}"),
        }
    }
}

/// Current phase of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Validating,
    Processing,
    Changelog,
    Completed,
    Aborted(AbortReason),
}

/// Files produced by one target's build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactSet {
    pub files: Vec<PathBuf>,
}

impl ArtifactSet {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// File names without directories, for notes and links
    pub fn file_names(&self) -> Vec<String> {
        self.files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }
}

/// Result of processing one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    Pending,
    Built(ArtifactSet),
    Tagged {
        tag: String,
        commit: String,
        /// False when the tag already pointed at `commit`
        created: bool,
    },
    Failed {
        step: ReleaseStep,
        failure: TargetFailure,
    },
}

impl TargetOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One target of a run: the immutable plan entry plus its outcome
#[derive(Debug, Clone)]
pub struct TargetRun {
    pub key: TargetKey,
    pub target_name: String,
    /// None when the revision could not be resolved
    pub target: Option<ResolvedTarget>,
    /// Artifacts built in this run, kept after tagging for notes
    pub artifacts: Option<ArtifactSet>,
    pub outcome: TargetOutcome,
}

impl TargetRun {
    fn from_plan(planned: PlannedTarget) -> Self {
        let (target, outcome) = match planned.resolution {
            Ok(target) => (Some(target), TargetOutcome::Pending),
            Err(err) => (
                None,
                TargetOutcome::Failed {
                    step: ReleaseStep::Resolve,
                    failure: err.into(),
                },
            ),
        };

        Self {
            key: planned.key,
            target_name: planned.target_name,
            target,
            artifacts: None,
            outcome,
        }
    }
}

/// Aggregate for one invocation; never persisted
#[derive(Debug, Clone)]
pub struct ReleaseRun {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub mode: ReleaseMode,
    pub project_name: String,
    pub branch_name: String,
    pub targets: Vec<TargetRun>,
    pub status: RunStatus,
    pub changelog: Option<Result<ChangelogProposal, ChangelogError>>,
}

impl ReleaseRun {
    /// Start a run from a validated plan
    pub fn new(plan: ReleasePlan, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            mode: plan.mode,
            project_name: plan.project_name,
            branch_name: plan.branch_name,
            targets: plan.targets.into_iter().map(TargetRun::from_plan).collect(),
            status: RunStatus::Validating,
            changelog: None,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.targets.iter().filter(|t| t.outcome.is_failed()).count()
    }

    /// Targets that reached their tag in this run, in input order
    pub fn tagged_targets(&self) -> Vec<&ResolvedTarget> {
        self.targets
            .iter()
            .filter(|t| matches!(t.outcome, TargetOutcome::Tagged { .. }))
            .filter_map(|t| t.target.as_ref())
            .collect()
    }

    /// Settle the terminal status once targets (and the changelog) are done
    ///
    /// Target failures take precedence over a changelog failure.
    pub fn finish(&mut self) {
        let failed = self.failed_count();
        self.status = if failed > 0 {
            RunStatus::Aborted(AbortReason::TargetsFailed {
                failed,
                total: self.targets.len(),
            })
        } else if let Some(Err(err)) = &self.changelog {
            RunStatus::Aborted(AbortReason::Changelog(err.clone()))
        } else {
            RunStatus::Completed
        };
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            id: self.id.to_string(),
            started_at: self.started_at,
            mode: self.mode,
            project_name: self.project_name.clone(),
            branch_name: self.branch_name.clone(),
            status: match &self.status {
                RunStatus::Validating => "validating".to_string(),
                RunStatus::Processing => "processing".to_string(),
                RunStatus::Changelog => "changelog".to_string(),
                RunStatus::Completed => "completed".to_string(),
                RunStatus::Aborted(reason) => format!("aborted: {reason}"),
            },
            targets: self.targets.iter().map(TargetReport::from).collect(),
            changelog_branch: match &self.changelog {
                Some(Ok(proposal)) => Some(proposal.branch.clone()),
                _ => None,
            },
            changelog_error: match &self.changelog {
                Some(Err(err)) => Some(err.to_string()),
                _ => None,
            },
        }
    }
}

/// Serializable run summary written by `--report`
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub mode: ReleaseMode,
    pub project_name: String,
    pub branch_name: String,
    pub status: String,
    pub targets: Vec<TargetReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TargetReport {
    pub target_name: String,
    pub key: TargetKey,
    pub revision: Option<u8>,
    pub tag: Option<String>,
    pub container_name: Option<String>,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
}

impl From<&TargetRun> for TargetReport {
    fn from(run: &TargetRun) -> Self {
        let mut report = TargetReport {
            target_name: run.target_name.clone(),
            key: run.key,
            revision: run.target.as_ref().map(|t| t.revision),
            tag: run.target.as_ref().map(|t| t.tag_name.clone()),
            container_name: run.target.as_ref().map(|t| t.container_name().to_string()),
            outcome: "pending",
            commit: None,
            created: None,
            failed_step: None,
            error: None,
            artifacts: run
                .artifacts
                .as_ref()
                .map(ArtifactSet::file_names)
                .unwrap_or_default(),
        };

        match &run.outcome {
            TargetOutcome::Pending => {}
            TargetOutcome::Built(_) => report.outcome = "built",
            TargetOutcome::Tagged {
                commit, created, ..
            } => {
                report.outcome = "tagged";
                report.commit = Some(commit.clone());
                report.created = Some(*created);
            }
            TargetOutcome::Failed { step, failure } => {
                report.outcome = "failed";
                report.failed_step = Some(step.name());
                report.error = Some(failure.to_string());
            }
        }

        report
    }
}
