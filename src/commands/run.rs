//! Release run command.
//!
//! Loads the inputs, wires the CMake builder and the git client into the
//! release service and turns an aborted run into a non-zero exit.

use anyhow::{bail, Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::ReleaseInputs;
use crate::domain::release::{ReleaseRun, RunStatus};
use crate::infrastructure::{CmakeBuilder, GitClient};
use crate::services::ReleaseService;
use crate::ui;

use super::load_release;

/// Overrides for the runner settings given on the command line
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub build_dir: Option<PathBuf>,
    pub artifacts_dir: Option<PathBuf>,
    pub remote: Option<String>,
    pub token: Option<String>,
    pub report: Option<PathBuf>,
}

/// Execute the run command.
pub async fn execute(inputs: ReleaseInputs, overrides: RunOverrides) -> Result<()> {
    let mut loaded = load_release(&inputs)?;

    if let Some(dir) = overrides.build_dir {
        loaded.settings.build_dir = dir;
    }
    if let Some(dir) = overrides.artifacts_dir {
        loaded.settings.artifacts_dir = dir;
    }
    if let Some(remote) = overrides.remote {
        loaded.settings.remote = remote;
    }

    info!(
        "Releasing {} from {} (repository {})",
        loaded.config.project_name,
        loaded.config.branch_name,
        loaded.config.repository_id.as_str()
    );

    let settings = loaded.settings;
    let mut git = GitClient::new(
        settings.remote.clone(),
        loaded.config.branch_name.clone(),
        settings.bot.clone(),
    );

    match (&overrides.token, &settings.remote_url) {
        (Some(token), Some(url)) => {
            git = git
                .with_token_remote(url, token)
                .await
                .context("Failed to configure authenticated remote")?;
            info!("Pushing through authenticated remote {}", git.remote());
        }
        (Some(_), None) => {
            ui::print_warning("RELEASE_TOKEN is set but remote_url is not; using the plain remote");
        }
        _ => {}
    }

    let builder = CmakeBuilder::new(".", settings.build_dir.clone());
    let service = ReleaseService::new(builder, git, settings);

    let run = service
        .execute(
            &loaded.config,
            loaded.raw_version,
            &loaded.source.describe(),
            loaded.allowed.as_ref(),
            Local::now().date_naive(),
        )
        .await?;

    if let Some(path) = &overrides.report {
        write_report(&run, path)?;
        ui::print_info(&format!("Run report written to {}", path.display()));
    }

    if run.is_success() {
        ui::print_success(&format!(
            "Release {} completed ({} targets)",
            run.id,
            run.targets.len()
        ));
        return Ok(());
    }

    match &run.status {
        RunStatus::Aborted(reason) => {
            ui::print_error(&format!("Release {} aborted: {}", run.id, reason));
            bail!("Release aborted: {}", reason)
        }
        other => bail!("Release ended in non-terminal state {:?}", other),
    }
}

fn write_report(run: &ReleaseRun, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&run.report()).context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write run report {}", path.display()))
}
