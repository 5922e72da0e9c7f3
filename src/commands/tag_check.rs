use anyhow::{bail, Result};

use crate::domain::naming::{validate_tag, RELEASE_SUFFIX};
use crate::ui;

/// Execute the tag-check command.
pub fn execute(tag: &str) -> Result<()> {
    if !validate_tag(tag) {
        ui::print_error(&format!("Not a firmware tag: {}", tag));
        bail!(
            "Tag '{}' does not match v<product>.<major>.<minor>.<hw>-Rev<revision>[{}]",
            tag,
            RELEASE_SUFFIX
        );
    }

    let kind = if tag.ends_with(RELEASE_SUFFIX) {
        "release"
    } else {
        "beta"
    };
    ui::print_success(&format!("{} is a valid {} tag", tag, kind));
    Ok(())
}
