//! Dry-run of the validation gate: resolve the target matrix and print it.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::cli::ReleaseInputs;
use crate::domain::plan::{plan_release, ReleasePlan};
use crate::domain::release::ReleaseMode;
use crate::ui;

use super::load_release;

#[derive(Debug, Serialize)]
struct PlanView {
    mode: ReleaseMode,
    project_name: String,
    branch_name: String,
    targets: Vec<PlanEntry>,
}

#[derive(Debug, Serialize)]
struct PlanEntry {
    target_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    beta_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    container_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<&ReleasePlan> for PlanView {
    fn from(plan: &ReleasePlan) -> Self {
        let targets = plan
            .targets
            .iter()
            .map(|planned| match &planned.resolution {
                Ok(target) => PlanEntry {
                    target_name: planned.target_name.clone(),
                    revision: Some(target.revision),
                    beta_tag: Some(target.names.beta_tag.clone()),
                    release_tag: Some(target.names.release_tag.clone()),
                    container_name: Some(target.names.container_name.clone()),
                    error: None,
                },
                Err(e) => PlanEntry {
                    target_name: planned.target_name.clone(),
                    revision: None,
                    beta_tag: None,
                    release_tag: None,
                    container_name: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();

        Self {
            mode: plan.mode,
            project_name: plan.project_name.clone(),
            branch_name: plan.branch_name.clone(),
            targets,
        }
    }
}

/// Execute the plan command.
pub async fn execute(inputs: ReleaseInputs, json: bool) -> Result<()> {
    let loaded = load_release(&inputs)?;
    let plan = plan_release(
        &loaded.config,
        loaded.raw_version,
        &loaded.source.describe(),
        loaded.allowed.as_ref(),
    )?;
    let view = PlanView::from(&plan);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&view).context("Failed to serialize plan")?
        );
        return Ok(());
    }

    ui::print_header(&format!("Release plan: {}", view.project_name));
    ui::print_field("Branch", &view.branch_name);
    ui::print_field("Mode", view.mode.name());
    println!();

    for entry in &view.targets {
        match &entry.error {
            None => println!(
                "  {:<28} rev {:<3}  {} -> {}  {}",
                entry.target_name.bold(),
                entry.revision.unwrap_or_default(),
                entry.beta_tag.as_deref().unwrap_or_default(),
                entry.release_tag.as_deref().unwrap_or_default(),
                entry.container_name.as_deref().unwrap_or_default().dimmed(),
            ),
            Some(error) => println!("  {:<28} {}", entry.target_name.bold(), error.red()),
        }
    }
    println!();

    let unresolved = plan.unresolved_count();
    if unresolved > 0 {
        ui::print_warning(&format!(
            "{} of {} targets cannot be released as configured",
            unresolved,
            plan.targets.len()
        ));
    } else {
        ui::print_success(&format!("{} targets ready", plan.resolved_targets().count()));
    }

    Ok(())
}
