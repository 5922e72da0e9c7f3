//! Target matrix types
//!
//! A target is one `(hard_num, variant_num)` cell of the release matrix.
//! Expansion is 1:1 and order-preserving; names are filled in by the naming
//! engine and never change afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::domain::naming::TargetNames;
use crate::domain::release::ReleaseMode;
use crate::error::ValidationError;

/// Matrix key of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetKey {
    pub hard_num: u32,
    pub variant_num: u32,
}

impl TargetKey {
    pub fn new(hard_num: u32, variant_num: u32) -> Self {
        Self {
            hard_num,
            variant_num,
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hard{}_var{}", self.hard_num, self.variant_num)
    }
}

/// One fully resolved matrix cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub key: TargetKey,
    /// 255 for service firmware
    pub revision: u8,
    pub names: TargetNames,
    /// Tag this run creates (beta in standard mode, release in promote mode)
    pub tag_name: String,
}

impl ResolvedTarget {
    pub fn new(key: TargetKey, revision: u8, names: TargetNames, mode: ReleaseMode) -> Self {
        let tag_name = names.tag_for(mode).to_string();
        Self {
            key,
            revision,
            names,
            tag_name,
        }
    }

    pub fn target_name(&self) -> &str {
        &self.names.target_name
    }

    pub fn beta_tag(&self) -> &str {
        &self.names.beta_tag
    }

    pub fn container_name(&self) -> &str {
        &self.names.container_name
    }
}

/// Templates must be non-empty and unique by key
pub fn ensure_unique_keys(keys: &[TargetKey]) -> Result<(), ValidationError> {
    if keys.is_empty() {
        return Err(ValidationError::NoTargets);
    }

    let mut seen = HashSet::with_capacity(keys.len());
    for key in keys {
        if !seen.insert(*key) {
            return Err(ValidationError::DuplicateTarget {
                hard_num: key.hard_num,
                variant_num: key.variant_num,
            });
        }
    }

    Ok(())
}

/// Re-check after naming: distinct keys may still pack into the same tag
/// (variants 15 and 16 share a minor field)
pub fn ensure_distinct_names(targets: &[ResolvedTarget]) -> Result<(), ValidationError> {
    let mut tags = HashSet::with_capacity(targets.len());
    let mut containers = HashSet::with_capacity(targets.len());

    for target in targets {
        let tag_clash = !tags.insert(target.beta_tag());
        let container_clash = !containers.insert(target.container_name());
        if tag_clash || container_clash {
            return Err(ValidationError::DuplicateTarget {
                hard_num: target.key.hard_num,
                variant_num: target.key.variant_num,
            });
        }
    }

    Ok(())
}
