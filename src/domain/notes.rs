//! Release notes handed over with each tagged target

use crate::domain::changelog::task_ids;
use crate::domain::release::ReleaseMode;
use crate::domain::target::ResolvedTarget;

/// Inputs for one target's notes
#[derive(Debug, Clone)]
pub struct NotesInput<'a> {
    pub mode: ReleaseMode,
    pub target: &'a ResolvedTarget,
    pub features: &'a [String],
    pub bug_fixes: &'a [String],
    /// `release` or `hotfix`
    pub branch_kind: &'a str,
    pub repository_url: Option<&'a str>,
    pub integration_branch: &'a str,
    pub changelog_path: &'a str,
}

/// File name the notes are written to inside the artifacts directory
pub fn notes_file_name(tag: &str) -> String {
    format!("release_notes_{tag}.txt")
}

pub fn render_release_notes(input: &NotesInput<'_>) -> String {
    let target = input.target;
    let tag = &target.tag_name;
    let product = target
        .target_name()
        .split("_hard")
        .next()
        .unwrap_or_default()
        .to_uppercase();

    let intro = match input.mode {
        ReleaseMode::Standard => "Handed over for testing",
        ReleaseMode::Promote => "Handed over to customer",
    };

    let mut out = format!("{intro}. {product} {tag}.\n\n");
    out.push_str(&format!("New Features:\n{}\n", list_or_none(input.features)));
    out.push_str(&format!("Bug Fixes:\n{}\n\n", list_or_none(input.bug_fixes)));
    out.push_str(&format!(
        "Firmware is delivered from a {} branch.\n\n",
        input.branch_kind
    ));

    match input.repository_url {
        Some(url) => {
            let url = url.trim_end_matches('/');
            if input.mode == ReleaseMode::Promote {
                out.push_str(&format!(
                    "Changelog:\n{url}/-/blob/{}/{}\n\n",
                    input.integration_branch, input.changelog_path
                ));
            }
            out.push_str(&format!("Tag:\n{url}/-/tags/{tag}\n\n"));
            out.push_str(&format!(
                "Firmware binary (*.bin):\n{url}/-/blob/{tag}/build/{}.bin\n\n",
                target.target_name()
            ));
            out.push_str(&format!(
                "Firmware update container (*.btl.bin):\n{url}/-/blob/{tag}/build/{}\n\n",
                target.container_name()
            ));
        }
        None => {
            out.push_str(&format!("Tag: {tag}\n"));
            out.push_str(&format!("Firmware binary (*.bin): {}.bin\n", target.target_name()));
            out.push_str(&format!(
                "Firmware update container (*.btl.bin): {}\n\n",
                target.container_name()
            ));
        }
    }

    let tasks: Vec<String> = task_ids(input.features.iter().chain(input.bug_fixes))
        .into_iter()
        .collect();
    out.push_str(&format!("Tasks covered by this firmware:\n{}\n", tasks.join(", ")));

    out
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "- none".to_string()
    } else {
        items.join("\n")
    }
}
