//! Changelog composition
//!
//! Pure transformation of a promotion into a markdown fragment, the branch
//! that carries it, and the commit message. Publishing is done by the release
//! service through `VersionControl`.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::domain::target::ResolvedTarget;
use crate::error::ChangelogError;

pub const CHANGELOG_HEADING: &str = "# Changelog";
pub const CHANGELOG_BRANCH_PREFIX: &str = "feature/changelog-update-";

fn task_regex() -> &'static Regex {
    static TASK_RE: OnceLock<Regex> = OnceLock::new();
    TASK_RE.get_or_init(|| Regex::new(r"\[([\w\-]+)\]").expect("task pattern is a valid regex"))
}

/// Tracker task ids (`[FW-12]`) referenced by the given items, sorted
///
/// Only the first reference of each item counts.
pub fn task_ids<'a>(items: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
    items
        .into_iter()
        .filter_map(|item| task_regex().captures(item))
        .map(|c| c[1].to_string())
        .collect()
}

/// Everything the composer needs; no clock, no I/O
#[derive(Debug, Clone)]
pub struct ChangelogInput<'a> {
    pub features: &'a [String],
    pub bug_fixes: &'a [String],
    /// Targets promoted in this run, in input order
    pub targets: Vec<&'a ResolvedTarget>,
    pub branch_name: &'a str,
    pub date: NaiveDate,
    pub repository_url: Option<&'a str>,
    pub task_tracker_url: Option<&'a str>,
}

/// Proposed changelog update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangelogProposal {
    pub fragment: String,
    pub branch: String,
    pub commit_message: String,
    pub first_release_tag: String,
}

pub fn compose_changelog(input: &ChangelogInput<'_>) -> Result<ChangelogProposal, ChangelogError> {
    let first = input
        .targets
        .first()
        .ok_or(ChangelogError::NoPromotedTargets)?;
    let first_release_tag = first.names.release_tag.clone();

    let tasks = task_ids(input.features.iter().chain(input.bug_fixes));
    let date = input.date.format("%d-%m-%Y").to_string();

    let mut fragment = String::from("\n");
    for target in &input.targets {
        fragment.push_str(&version_section(input, target, &tasks, &date));
    }

    Ok(ChangelogProposal {
        fragment,
        branch: format!("{CHANGELOG_BRANCH_PREFIX}{first_release_tag}"),
        commit_message: format!("docs(changelog): update for release {first_release_tag}"),
        first_release_tag,
    })
}

fn version_section(
    input: &ChangelogInput<'_>,
    target: &ResolvedTarget,
    tasks: &BTreeSet<String>,
    date: &str,
) -> String {
    let tag = &target.names.release_tag;
    let mut out = format!("## Version `{tag}` - {date}\n\n");

    if !tasks.is_empty() {
        let list: Vec<String> = tasks.iter().map(|t| format!("`{t}`")).collect();
        out.push_str(&format!("Related tasks: {}\n\n", list.join(", ")));
    }
    out.push_str(&format!("Released from `{}`.\n\n", input.branch_name));

    out.push_str("### Firmware files:\n\n");
    let binary = format!("build/{}.bin", target.target_name());
    let container = format!("build/{}", target.container_name());
    match input.repository_url {
        Some(url) => {
            let base = format!("{}/-/blob/{tag}", url.trim_end_matches('/'));
            out.push_str(&format!("- [{tag}]({base}/{binary})\n"));
            out.push_str(&format!("- [container]({base}/{container})\n\n"));
        }
        None => {
            out.push_str(&format!("- `{binary}`\n"));
            out.push_str(&format!("- `{container}`\n\n"));
        }
    }

    if !input.features.is_empty() {
        out.push_str("### New Features:\n\n");
        for feature in input.features {
            out.push_str(&bullet(feature, input.task_tracker_url));
        }
        out.push('\n');
    }

    if !input.bug_fixes.is_empty() {
        out.push_str("### Bug Fixes:\n\n");
        for fix in input.bug_fixes {
            out.push_str(&bullet(fix, input.task_tracker_url));
        }
        out.push('\n');
    }

    out
}

/// Render a list item, linking its task id when a tracker is configured
fn bullet(item: &str, tracker_url: Option<&str>) -> String {
    let (Some(url), Some(captures)) = (tracker_url, task_regex().captures(item)) else {
        return format!("- {item}\n");
    };

    let id = &captures[1];
    let text = item.replacen(&format!("[{id}]"), "", 1);
    format!(
        "- [[{id}]({}/{id})] {}\n",
        url.trim_end_matches('/'),
        text.trim()
    )
}

/// Insert a fragment directly below the `# Changelog` heading
///
/// A missing file or a file without the heading gets one.
pub fn merge_into_changelog(existing: Option<&str>, fragment: &str) -> String {
    let Some(existing) = existing else {
        return format!("{CHANGELOG_HEADING}\n{fragment}");
    };

    let mut offset = 0;
    for line in existing.split_inclusive('\n') {
        if line.starts_with(CHANGELOG_HEADING) {
            let split = offset + line.len();
            let (head, tail) = existing.split_at(split);
            let newline = if head.ends_with('\n') { "" } else { "\n" };
            return format!("{head}{newline}{fragment}{tail}");
        }
        offset += line.len();
    }

    format!("{CHANGELOG_HEADING}\n{fragment}\n{existing}")
}
