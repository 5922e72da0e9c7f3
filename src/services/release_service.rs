//! Release service - orchestrates a release run
//!
//! The validation gate runs for every target before any side effect. Targets
//! are then processed one at a time in input order, each through the step
//! sequence of the run mode. A failing target records its failure and the run
//! moves on to the next one.

use chrono::{NaiveDate, Utc};
use colored::Colorize;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{AllowedTargetSet, ReleaseConfig, RunnerSettings};
use crate::domain::changelog::{compose_changelog, merge_into_changelog, ChangelogInput, ChangelogProposal};
use crate::domain::notes::{notes_file_name, render_release_notes, NotesInput};
use crate::domain::plan::{plan_release, ReleasePlan};
use crate::domain::release::{
    ArtifactSet, ReleaseMode, ReleaseRun, ReleaseStep, RunStatus, TargetOutcome,
};
use crate::domain::target::ResolvedTarget;
use crate::domain::version::RawVersion;
use crate::error::{ChangelogError, ReleaseError, TargetFailure};
use crate::infrastructure::artifacts::{ArtifactDigest, ArtifactStore};
use crate::services::build_orchestrator::{BuildExecutor, BuildOrchestrator, BuildRequest};
use crate::services::tag_resolver::{tag_message, FilePublication, TagCreation, TagResolver, VersionControl};
use crate::ui;

pub const CHANGELOG_FRAGMENT_FILE: &str = "changelog_fragment.md";

/// Intermediate results handed from one step to the next
#[derive(Debug, Default)]
struct StepContext {
    artifacts: Option<ArtifactSet>,
    commit: Option<String>,
    tag: Option<TagCreation>,
}

/// Service for orchestrating releases
pub struct ReleaseService<B, G> {
    builds: BuildOrchestrator<B>,
    tags: TagResolver<G>,
    store: ArtifactStore,
    settings: RunnerSettings,
}

impl<B: BuildExecutor, G: VersionControl> ReleaseService<B, G> {
    pub fn new(builder: B, vcs: G, settings: RunnerSettings) -> Self {
        Self {
            builds: BuildOrchestrator::new(builder),
            tags: TagResolver::new(vcs),
            store: ArtifactStore::new(settings.artifacts_dir.clone()),
            settings,
        }
    }

    #[cfg(test)]
    pub fn builds(&self) -> &BuildOrchestrator<B> {
        &self.builds
    }

    #[cfg(test)]
    pub fn tags(&self) -> &TagResolver<G> {
        &self.tags
    }

    /// Validate, then process every target
    ///
    /// Errors returned here are pre-flight failures: nothing was built,
    /// committed or tagged. Per-target failures live in the returned run.
    pub async fn execute(
        &self,
        config: &ReleaseConfig,
        raw_version: RawVersion,
        source_name: &str,
        allowed: Option<&AllowedTargetSet>,
        today: NaiveDate,
    ) -> Result<ReleaseRun, ReleaseError> {
        let plan = plan_release(config, raw_version, source_name, allowed)?;
        info!(
            "Validation passed: {} targets, mode {}",
            plan.targets.len(),
            plan.mode
        );

        Ok(self.run_plan(config, plan, today).await)
    }

    /// Process a validated plan
    pub async fn run_plan(&self, config: &ReleaseConfig, plan: ReleasePlan, today: NaiveDate) -> ReleaseRun {
        let mut run = ReleaseRun::new(plan, Utc::now());
        self.print_header(&run);

        run.status = RunStatus::Processing;
        let mut digests = Vec::new();

        for index in 0..run.targets.len() {
            let Some(target) = run.targets[index].target.clone() else {
                warn!(
                    "Skipping {}: revision could not be resolved",
                    run.targets[index].target_name
                );
                continue;
            };

            let start = Instant::now();
            let (outcome, artifacts) = self.process_target(config, run.mode, &target).await;
            match &outcome {
                TargetOutcome::Failed { step, failure } => {
                    info!(
                        "{} {} failed at {}: {}",
                        "❌".red(),
                        target.target_name(),
                        step.name(),
                        failure
                    );
                }
                _ => {
                    info!(
                        "{} {} done in {:.1}s",
                        "✅".green(),
                        target.target_name(),
                        start.elapsed().as_secs_f64()
                    );
                    self.record_outputs(config, run.mode, &target, artifacts.as_ref(), &mut digests)
                        .await;
                }
            }

            run.targets[index].outcome = outcome;
            run.targets[index].artifacts = artifacts;
        }

        if !digests.is_empty() {
            if let Err(e) = self.store.write_checksums(&digests).await {
                warn!("Failed to write checksums: {}", e);
            }
        }

        if run.mode.composes_changelog() {
            run.status = RunStatus::Changelog;
            let result = self.publish_changelog(config, &run, today).await;
            if let Err(e) = &result {
                warn!("Changelog not published: {}", e);
            }
            run.changelog = Some(result);
        }

        run.finish();
        self.print_summary(&run);
        run
    }

    /// Run the mode's step sequence for one target
    async fn process_target(
        &self,
        config: &ReleaseConfig,
        mode: ReleaseMode,
        target: &ResolvedTarget,
    ) -> (TargetOutcome, Option<ArtifactSet>) {
        let mut ctx = StepContext::default();

        // A published beta tag means this target was released by an earlier run
        if mode == ReleaseMode::Standard {
            match self.tags.existing(target.beta_tag()).await {
                Ok(Some(commit)) => {
                    info!(
                        "{} already tagged as {}, skipping build",
                        target.target_name(),
                        target.beta_tag()
                    );
                    let outcome = TargetOutcome::Tagged {
                        tag: target.tag_name.clone(),
                        commit,
                        created: false,
                    };
                    return (outcome, None);
                }
                Ok(None) => {}
                Err(e) => {
                    let outcome = TargetOutcome::Failed {
                        step: ReleaseStep::TagBeta,
                        failure: e.into(),
                    };
                    return (outcome, None);
                }
            }
        }

        for step in mode.target_steps() {
            info!("{} {}: {}", step.emoji(), step.name(), target.target_name());
            if let Err(failure) = self.execute_step(config, target, *step, &mut ctx).await {
                let outcome = TargetOutcome::Failed {
                    step: *step,
                    failure,
                };
                return (outcome, ctx.artifacts);
            }
        }

        let outcome = match (ctx.tag, &ctx.artifacts) {
            (Some(creation), _) => TargetOutcome::Tagged {
                tag: creation.tag,
                commit: creation.commit,
                created: creation.created,
            },
            (None, Some(artifacts)) => TargetOutcome::Built(artifacts.clone()),
            (None, None) => TargetOutcome::Pending,
        };
        (outcome, ctx.artifacts)
    }

    /// Execute a single step
    async fn execute_step(
        &self,
        config: &ReleaseConfig,
        target: &ResolvedTarget,
        step: ReleaseStep,
        ctx: &mut StepContext,
    ) -> Result<(), TargetFailure> {
        match step {
            // Resolution happens in the validation gate
            ReleaseStep::Resolve => Ok(()),
            ReleaseStep::Build => {
                let request =
                    BuildRequest::for_target(&config.project_name, target, config.is_service_firmware);
                ctx.artifacts = Some(self.builds.build_target(&request).await?);
                Ok(())
            }
            ReleaseStep::CommitArtifact => {
                let artifacts = ctx
                    .artifacts
                    .as_ref()
                    .ok_or_else(|| precondition(step, "built artifacts"))?;
                let commit = self
                    .tags
                    .commit_artifacts(&artifacts.files, &self.settings.artifact_commit_message)
                    .await?;
                ctx.commit = Some(commit);
                Ok(())
            }
            ReleaseStep::ResolveBeta => {
                ctx.commit = Some(self.tags.resolve_beta(target.beta_tag()).await?);
                Ok(())
            }
            ReleaseStep::TagBeta | ReleaseStep::TagRelease => {
                let missing = if step == ReleaseStep::TagBeta {
                    "artifact commit"
                } else {
                    "beta tag commit"
                };
                let commit = ctx
                    .commit
                    .as_deref()
                    .ok_or_else(|| precondition(step, missing))?;
                let message = tag_message(&target.tag_name, &config.features, &config.bug_fixes);
                ctx.tag = Some(self.tags.ensure_tag(&target.tag_name, commit, &message).await?);
                Ok(())
            }
        }
    }

    /// Copy artifacts and write notes for a tagged target
    ///
    /// These are hand-over conveniences; failures are logged, not recorded.
    async fn record_outputs(
        &self,
        config: &ReleaseConfig,
        mode: ReleaseMode,
        target: &ResolvedTarget,
        artifacts: Option<&ArtifactSet>,
        digests: &mut Vec<ArtifactDigest>,
    ) {
        if let Some(artifacts) = artifacts {
            match self.store.collect(&artifacts.files).await {
                Ok(collected) => digests.extend(collected),
                Err(e) => warn!("Failed to collect artifacts of {}: {}", target.target_name(), e),
            }
        }

        let changelog_path = self.settings.changelog_path.to_string_lossy();
        let notes = render_release_notes(&NotesInput {
            mode,
            target,
            features: &config.features,
            bug_fixes: &config.bug_fixes,
            branch_kind: config.branch_kind(),
            repository_url: self.settings.repository_url.as_deref(),
            integration_branch: &self.settings.integration_branch,
            changelog_path: &changelog_path,
        });

        match self.store.write_text(&notes_file_name(&target.tag_name), &notes).await {
            Ok(path) => info!("Release notes: {}", path.display()),
            Err(e) => warn!("Failed to write release notes for {}: {}", target.tag_name, e),
        }
    }

    /// Compose the changelog for promoted targets and publish it on a new branch
    async fn publish_changelog(
        &self,
        config: &ReleaseConfig,
        run: &ReleaseRun,
        today: NaiveDate,
    ) -> Result<ChangelogProposal, ChangelogError> {
        let proposal = compose_changelog(&ChangelogInput {
            features: &config.features,
            bug_fixes: &config.bug_fixes,
            targets: run.tagged_targets(),
            branch_name: &config.branch_name,
            date: today,
            repository_url: self.settings.repository_url.as_deref(),
            task_tracker_url: self.settings.task_tracker_url.as_deref(),
        })?;

        if let Err(e) = self
            .store
            .write_text(CHANGELOG_FRAGMENT_FILE, &proposal.fragment)
            .await
        {
            warn!("Failed to write changelog fragment: {}", e);
        }

        let branch = proposal.branch.clone();
        let publish_error = |source| ChangelogError::Publish {
            branch: branch.clone(),
            source,
        };

        let vcs = self.tags.vcs();
        let base = vcs
            .branch_tip(&self.settings.integration_branch)
            .await
            .map_err(publish_error)?;
        let existing = vcs
            .read_file(&base, &self.settings.changelog_path)
            .await
            .map_err(publish_error)?;
        let content = merge_into_changelog(existing.as_deref(), &proposal.fragment);

        let commit = vcs
            .publish_file(&FilePublication {
                branch: &proposal.branch,
                base: &base,
                path: &self.settings.changelog_path,
                content: &content,
                message: &proposal.commit_message,
            })
            .await
            .map_err(publish_error)?;

        info!("Changelog published to {} ({})", proposal.branch, commit);
        Ok(proposal)
    }

    fn print_header(&self, run: &ReleaseRun) {
        ui::print_header(&format!("Release: {} ({})", run.project_name, run.mode));
        ui::print_field("Run", &run.id.to_string());
        ui::print_field("Branch", &run.branch_name);
        ui::print_field("Targets", &run.targets.len().to_string());
        println!();
    }

    fn print_summary(&self, run: &ReleaseRun) {
        println!();
        println!(
            "{}",
            "════════════════════════════════════════════════════════════".bright_blue()
        );

        match &run.status {
            RunStatus::Completed => {
                println!(
                    "{}",
                    format!("✅ Release completed: {} ({})", run.project_name, run.mode)
                        .bright_green()
                        .bold()
                );
            }
            RunStatus::Aborted(reason) => {
                println!(
                    "{}",
                    format!("❌ Release aborted: {}", reason).bright_red().bold()
                );
            }
            _ => {}
        }

        println!();
        for target in &run.targets {
            let line = match &target.outcome {
                TargetOutcome::Tagged {
                    tag,
                    commit,
                    created,
                } => format!(
                    "✅ {} {} @ {}{}",
                    target.target_name,
                    tag,
                    commit.get(..8).unwrap_or(commit),
                    if *created { "" } else { " (existing)" }
                ),
                TargetOutcome::Failed { step, failure } => {
                    format!("❌ {} at {}: {}", target.target_name, step.name(), failure)
                }
                TargetOutcome::Built(_) => format!("🔨 {} built", target.target_name),
                TargetOutcome::Pending => format!("⏸️  {} not processed", target.target_name),
            };
            println!("   {}", line);
        }

        if let Some(Ok(proposal)) = &run.changelog {
            println!();
            println!("   📝 Changelog branch: {}", proposal.branch);
        }
        println!();
    }
}

fn precondition(step: ReleaseStep, missing: &str) -> TargetFailure {
    TargetFailure::Precondition {
        step: step.name().to_string(),
        missing: missing.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::release::AbortReason;
    use crate::error::{BuildError, GitError, ValidationError};
    use crate::services::tag_resolver::tests::MemoryRepo;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes real artifact files so the artifacts directory can be checked
    struct FakeBuilder {
        dir: PathBuf,
        failing: HashSet<String>,
        requests: Mutex<Vec<BuildRequest>>,
    }

    impl FakeBuilder {
        fn new(dir: &Path) -> Self {
            Self {
                dir: dir.to_path_buf(),
                failing: HashSet::new(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, target_name: &str) -> Self {
            self.failing.insert(target_name.to_string());
            self
        }

        fn built(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.target_name.clone())
                .collect()
        }
    }

    #[async_trait]
    impl BuildExecutor for FakeBuilder {
        async fn build(&self, request: &BuildRequest) -> Result<ArtifactSet, BuildError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.failing.contains(&request.target_name) {
                return Err(BuildError::Failed {
                    target: request.target_name.clone(),
                    reason: "ninja: build stopped".to_string(),
                });
            }

            let bin = self.dir.join(format!("{}.bin", request.target_name));
            let container = self.dir.join(&request.container_name);
            std::fs::write(&bin, request.target_name.as_bytes()).unwrap();
            std::fs::write(&container, request.container_name.as_bytes()).unwrap();
            Ok(ArtifactSet::new(vec![bin, container]))
        }
    }

    struct Fixture {
        _build: TempDir,
        out: TempDir,
        build_dir: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let build = tempfile::tempdir().unwrap();
            let out = tempfile::tempdir().unwrap();
            let build_dir = build.path().to_path_buf();
            Self {
                _build: build,
                out,
                build_dir,
            }
        }

        fn settings(&self) -> RunnerSettings {
            RunnerSettings {
                artifacts_dir: self.out.path().join("artifacts"),
                repository_url: Some("https://git.example.com/fw/meter".to_string()),
                ..RunnerSettings::default()
            }
        }

        fn artifacts(&self) -> PathBuf {
            self.out.path().join("artifacts")
        }
    }

    fn config(targets: &str, extra: &str) -> ReleaseConfig {
        ReleaseConfig::from_json(&format!(
            r#"{{
                "cmake_project_name": "meter",
                "git_project_id": 412,
                "branch_name": "release/v3",
                "targets": {targets},
                "features": ["[FW-12] Add pulse output"],
                "bug_fixes": ["[FW-15] Fix RTC drift"]{extra}
            }}"#
        ))
        .unwrap()
    }

    const THREE_TARGETS: &str = r#"[
        {"hard_num": 2, "variant_num": 1},
        {"hard_num": 2, "variant_num": 2},
        {"hard_num": 3, "variant_num": 1}
    ]"#;

    fn raw() -> RawVersion {
        RawVersion {
            product_id: 12,
            major: 3,
            minor: 2,
            revision: Some(7),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn repo() -> MemoryRepo {
        let repo = MemoryRepo::default();
        repo.branches
            .lock()
            .unwrap()
            .insert("dev".to_string(), "base01".to_string());
        repo
    }

    fn tagged_commit(outcome: &TargetOutcome) -> Option<&str> {
        match outcome {
            TargetOutcome::Tagged { commit, .. } => Some(commit),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_standard_run_tags_every_target() {
        let fx = Fixture::new();
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), repo(), fx.settings());
        let config = config(THREE_TARGETS, "");

        let run = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();

        assert!(run.is_success());
        assert_eq!(
            service.builds().executor().built(),
            vec!["meter_hard2_var1", "meter_hard2_var2", "meter_hard3_var1"]
        );

        let vcs = service.tags().vcs();
        assert_eq!(vcs.commits.lock().unwrap().len(), 3);
        for target in &run.targets {
            let resolved = target.target.as_ref().unwrap();
            let commit = tagged_commit(&target.outcome).unwrap();
            assert_eq!(vcs.tag(resolved.beta_tag()).as_deref(), Some(commit));
        }
        assert_eq!(vcs.tag("v12.3.2.2-Rev7").as_deref(), Some("c0ffee01"));

        // Tag annotations carry the notes
        let created = vcs.created_tags.lock().unwrap();
        assert!(created[0].2.starts_with("Features:\n[FW-12] Add pulse output"));

        let artifacts = fx.artifacts();
        assert!(artifacts.join("meter_hard2_var1.bin").exists());
        assert!(artifacts.join("12.003.018.002.btl.bin").exists());
        assert!(artifacts.join("release_notes_v12.3.2.2-Rev7.txt").exists());
        let checksums = std::fs::read_to_string(artifacts.join("checksums.txt")).unwrap();
        assert_eq!(checksums.lines().count(), 6);
        assert!(run.changelog.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_targets_rejected_before_build() {
        let fx = Fixture::new();
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), repo(), fx.settings());
        let mut config = config(THREE_TARGETS, "");
        config.targets.push(config.targets[0].clone());

        let err = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReleaseError::Validation(ValidationError::DuplicateTarget {
                hard_num: 2,
                variant_num: 1
            })
        ));
        assert!(service.builds().executor().built().is_empty());
        assert!(service.tags().vcs().tags.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_target_rejected_before_build() {
        let fx = Fixture::new();
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), repo(), fx.settings());
        let config = config(THREE_TARGETS, "");
        let allowed = AllowedTargetSet::parse("meter_hard2_var1,meter_hard2_var2").unwrap();

        let err = service
            .execute(&config, raw(), "defs.h", Some(&allowed), today())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReleaseError::Validation(ValidationError::UnexpectedTarget { .. })
        ));
        assert!(service.builds().executor().built().is_empty());
    }

    #[tokio::test]
    async fn test_service_firmware_builds_with_revision_255() {
        let fx = Fixture::new();
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), repo(), fx.settings());
        let config = config(
            r#"[{"hard_num": 2, "variant_num": 1}]"#,
            r#", "is_service_firmware": true"#,
        );

        let run = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();

        assert!(run.is_success());
        let requests = service.builds().executor().requests.lock().unwrap().clone();
        assert_eq!(requests[0].revision, 255);
        assert!(requests[0].is_service_firmware);
        assert!(service.tags().vcs().tag("v12.3.2.2-Rev255").is_some());
    }

    #[tokio::test]
    async fn test_build_failure_does_not_stop_siblings() {
        let fx = Fixture::new();
        let builder = FakeBuilder::new(&fx.build_dir).failing("meter_hard2_var2");
        let service = ReleaseService::new(builder, repo(), fx.settings());
        let config = config(THREE_TARGETS, "");

        let run = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();

        assert_eq!(
            run.status,
            RunStatus::Aborted(AbortReason::TargetsFailed { failed: 1, total: 3 })
        );
        assert_eq!(service.builds().executor().built().len(), 3);
        assert!(matches!(
            run.targets[1].outcome,
            TargetOutcome::Failed {
                step: ReleaseStep::Build,
                failure: TargetFailure::Build(_)
            }
        ));
        assert!(tagged_commit(&run.targets[0].outcome).is_some());
        assert!(tagged_commit(&run.targets[2].outcome).is_some());

        // No commit or tag for the failed target
        let vcs = service.tags().vcs();
        assert_eq!(vcs.commits.lock().unwrap().len(), 2);
        assert!(vcs.tag("v12.3.18.2-Rev7").is_none());
    }

    #[tokio::test]
    async fn test_commit_failure_creates_no_tag() {
        let fx = Fixture::new();
        let vcs = repo();
        *vcs.fail_commit.lock().unwrap() = true;
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), vcs, fx.settings());
        let config = config(r#"[{"hard_num": 2, "variant_num": 1}]"#, "");

        let run = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();

        assert!(matches!(
            run.targets[0].outcome,
            TargetOutcome::Failed {
                step: ReleaseStep::CommitArtifact,
                failure: TargetFailure::Git(GitError::PushRejected { .. })
            }
        ));
        assert!(service.tags().vcs().tags.lock().unwrap().is_empty());
        // Built artifacts are kept on the target for inspection
        assert!(run.targets[0].artifacts.is_some());
    }

    #[tokio::test]
    async fn test_existing_beta_tag_skips_build_and_commit() {
        let fx = Fixture::new();
        let vcs = repo().with_tag("v12.3.2.2-Rev7", "deadbeef");
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), vcs, fx.settings());
        let config = config(THREE_TARGETS, "");

        let run = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();

        assert!(run.is_success());
        assert_eq!(
            run.targets[0].outcome,
            TargetOutcome::Tagged {
                tag: "v12.3.2.2-Rev7".to_string(),
                commit: "deadbeef".to_string(),
                created: false,
            }
        );
        assert_eq!(
            service.builds().executor().built(),
            vec!["meter_hard2_var2", "meter_hard3_var1"]
        );
        let vcs = service.tags().vcs();
        assert_eq!(vcs.commits.lock().unwrap().len(), 2);
        assert_eq!(vcs.tag("v12.3.2.2-Rev7").as_deref(), Some("deadbeef"));
    }

    #[tokio::test]
    async fn test_standard_rerun_has_no_side_effects() {
        let fx = Fixture::new();
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), repo(), fx.settings());
        let config = config(THREE_TARGETS, "");

        let first = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();
        assert!(first.is_success());

        let second = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();

        assert!(second.is_success());
        assert_eq!(service.builds().executor().built().len(), 3);
        let vcs = service.tags().vcs();
        assert_eq!(vcs.commits.lock().unwrap().len(), 3);
        assert_eq!(vcs.created_tags.lock().unwrap().len(), 3);

        for (before, after) in first.targets.iter().zip(&second.targets) {
            assert!(matches!(after.outcome, TargetOutcome::Tagged { created: false, .. }));
            assert_eq!(tagged_commit(&after.outcome), tagged_commit(&before.outcome));
        }
    }

    #[tokio::test]
    async fn test_release_tag_conflict_fails_only_that_target() {
        let fx = Fixture::new();
        let vcs = repo()
            .with_tag("v12.3.2.2-Rev7", "aaaa1111")
            .with_tag("v12.3.18.2-Rev7", "bbbb2222")
            .with_tag("v12.3.2.2-Rev7-release", "deadbeef");
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), vcs, fx.settings());
        let config = config(
            r#"[{"hard_num": 2, "variant_num": 1}, {"hard_num": 2, "variant_num": 2}]"#,
            r#", "upgrade_to_release": true"#,
        );

        let run = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();

        assert!(matches!(
            run.targets[0].outcome,
            TargetOutcome::Failed {
                step: ReleaseStep::TagRelease,
                failure: TargetFailure::Git(GitError::TagConflict { .. })
            }
        ));
        assert_eq!(tagged_commit(&run.targets[1].outcome), Some("bbbb2222"));
        assert_eq!(
            run.status,
            RunStatus::Aborted(AbortReason::TargetsFailed { failed: 1, total: 2 })
        );
        assert_eq!(
            service.tags().vcs().tag("v12.3.2.2-Rev7-release").as_deref(),
            Some("deadbeef")
        );
    }

    #[tokio::test]
    async fn test_per_target_revision_failure() {
        let fx = Fixture::new();
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), repo(), fx.settings());
        let targets = r#"[
            {"hard_num": 2, "variant_num": 1},
            {"hard_num": 2, "variant_num": 2, "revision_ver": 255}
        ]"#;
        let config = config(targets, "");

        let run = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();

        assert!(matches!(
            run.targets[1].outcome,
            TargetOutcome::Failed {
                step: ReleaseStep::Resolve,
                failure: TargetFailure::Version(_)
            }
        ));
        assert_eq!(service.builds().executor().built(), vec!["meter_hard2_var1"]);
        assert_eq!(run.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_promote_missing_beta_still_attempts_others() {
        let fx = Fixture::new();
        let vcs = repo()
            .with_tag("v12.3.2.2-Rev7", "aaaa1111")
            .with_tag("v12.3.2.3-Rev7", "cccc3333");
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), vcs, fx.settings());
        let config = config(THREE_TARGETS, r#", "upgrade_to_release": true"#);

        let run = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();

        assert_eq!(
            run.status,
            RunStatus::Aborted(AbortReason::TargetsFailed { failed: 1, total: 3 })
        );
        assert!(matches!(
            &run.targets[1].outcome,
            TargetOutcome::Failed {
                step: ReleaseStep::ResolveBeta,
                failure: TargetFailure::Git(GitError::BetaTagMissing { tag })
            } if tag == "v12.3.18.2-Rev7"
        ));

        // Release tags point at exactly the beta commits; nothing was built
        let vcs = service.tags().vcs();
        assert_eq!(vcs.tag("v12.3.2.2-Rev7-release").as_deref(), Some("aaaa1111"));
        assert_eq!(vcs.tag("v12.3.2.3-Rev7-release").as_deref(), Some("cccc3333"));
        assert!(vcs.tag("v12.3.18.2-Rev7-release").is_none());
        assert!(service.builds().executor().built().is_empty());

        // The changelog covers the promoted subset only
        let proposal = run.changelog.as_ref().unwrap().as_ref().unwrap();
        assert!(proposal.fragment.contains("v12.3.2.2-Rev7-release"));
        assert!(!proposal.fragment.contains("v12.3.18.2-Rev7-release"));
    }

    #[tokio::test]
    async fn test_promote_rerun_is_idempotent() {
        let fx = Fixture::new();
        let vcs = repo()
            .with_tag("v12.3.2.2-Rev7", "aaaa1111")
            .with_tag("v12.3.2.2-Rev7-release", "aaaa1111");
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), vcs, fx.settings());
        let config = config(
            r#"[{"hard_num": 2, "variant_num": 1}]"#,
            r#", "upgrade_to_release": true"#,
        );

        let run = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();

        assert!(run.is_success());
        assert!(matches!(
            run.targets[0].outcome,
            TargetOutcome::Tagged { created: false, .. }
        ));
        assert!(service.tags().vcs().created_tags.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_changelog_merged_into_existing_file() {
        let fx = Fixture::new();
        let vcs = repo().with_tag("v12.3.2.2-Rev7", "aaaa1111");
        vcs.files.lock().unwrap().insert(
            ("base01".to_string(), PathBuf::from("CHANGELOG.md")),
            "# Changelog\n\n## Version `v12.3.2.2-Rev6-release` - 01-02-2024\n".to_string(),
        );
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), vcs, fx.settings());
        let config = config(
            r#"[{"hard_num": 2, "variant_num": 1}]"#,
            r#", "upgrade_to_release": true"#,
        );

        let run = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();
        assert!(run.is_success());

        let published = service.tags().vcs().published.lock().unwrap().clone();
        assert_eq!(published.len(), 1);
        let (branch, base, path, content, message) = &published[0];
        assert_eq!(branch, "feature/changelog-update-v12.3.2.2-Rev7-release");
        assert_eq!(base, "base01");
        assert_eq!(path, &PathBuf::from("CHANGELOG.md"));
        assert_eq!(message, "docs(changelog): update for release v12.3.2.2-Rev7-release");
        assert!(content.starts_with("# Changelog\n\n## Version `v12.3.2.2-Rev7-release` - 05-03-2024"));
        assert!(content.contains("## Version `v12.3.2.2-Rev6-release` - 01-02-2024"));

        assert!(fx.artifacts().join(CHANGELOG_FRAGMENT_FILE).exists());
        assert!(fx
            .artifacts()
            .join("release_notes_v12.3.2.2-Rev7-release.txt")
            .exists());
    }

    #[tokio::test]
    async fn test_changelog_failure_keeps_release_tags() {
        let fx = Fixture::new();
        let vcs = repo().with_tag("v12.3.2.2-Rev7", "aaaa1111");
        *vcs.fail_publish.lock().unwrap() = true;
        let service = ReleaseService::new(FakeBuilder::new(&fx.build_dir), vcs, fx.settings());
        let config = config(
            r#"[{"hard_num": 2, "variant_num": 1}]"#,
            r#", "upgrade_to_release": true"#,
        );

        let run = service
            .execute(&config, raw(), "defs.h", None, today())
            .await
            .unwrap();

        assert!(matches!(
            run.status,
            RunStatus::Aborted(AbortReason::Changelog(ChangelogError::Publish { .. }))
        ));
        assert_eq!(
            service.tags().vcs().tag("v12.3.2.2-Rev7-release").as_deref(),
            Some("aaaa1111")
        );
    }

    #[tokio::test]
    async fn test_standard_then_promote() {
        let fx = Fixture::new();
        let targets = r#"[{"hard_num": 2, "variant_num": 1}, {"hard_num": 2, "variant_num": 2}]"#;

        let standard = ReleaseService::new(FakeBuilder::new(&fx.build_dir), repo(), fx.settings());
        let run = standard
            .execute(&config(targets, ""), raw(), "defs.h", None, today())
            .await
            .unwrap();
        assert!(run.is_success());
        let beta_commits: Vec<String> = run
            .targets
            .iter()
            .map(|t| tagged_commit(&t.outcome).unwrap().to_string())
            .collect();

        // Hand the same repository state to a promote run
        let repo_after = MemoryRepo::default();
        *repo_after.tags.lock().unwrap() = standard.tags().vcs().tags.lock().unwrap().clone();
        repo_after
            .branches
            .lock()
            .unwrap()
            .insert("dev".to_string(), "base01".to_string());

        let promote = ReleaseService::new(FakeBuilder::new(&fx.build_dir), repo_after, fx.settings());
        let run = promote
            .execute(
                &config(targets, r#", "upgrade_to_release": true"#),
                raw(),
                "defs.h",
                None,
                today(),
            )
            .await
            .unwrap();

        assert!(run.is_success());
        let vcs = promote.tags().vcs();
        assert_eq!(
            vcs.tag("v12.3.2.2-Rev7-release").as_deref(),
            Some(beta_commits[0].as_str())
        );
        assert_eq!(
            vcs.tag("v12.3.18.2-Rev7-release").as_deref(),
            Some(beta_commits[1].as_str())
        );
        assert!(promote.builds().executor().built().is_empty());

        let proposal = run.changelog.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(
            proposal.branch,
            "feature/changelog-update-v12.3.2.2-Rev7-release"
        );
        assert_eq!(vcs.published.lock().unwrap().len(), 1);
    }
}
