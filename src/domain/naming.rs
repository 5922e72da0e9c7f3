//! Deterministic target, tag and container naming
//!
//! Names are a pure function of project, target key, version constants and
//! revision. No timestamps, no counters: promotion finds the beta tag of an
//! earlier run by recomputing its name.
//!
//! ```text
//! target     {project}_hard{H}_var{V}
//! beta tag   v{P}.{M}.{m}.{H}-Rev{R}
//! release    v{P}.{M}.{m}.{H}-Rev{R}-release
//! container  {P}.{M:03}.{m:03}.{H:03}.btl.bin
//! ```
//!
//! where `m = ((min(V, 15) - 1) << 4) | minor`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::domain::release::ReleaseMode;
use crate::domain::target::TargetKey;
use crate::domain::version::VersionConstants;
use crate::error::ValidationError;

pub const RELEASE_SUFFIX: &str = "-release";
pub const CONTAINER_SUFFIX: &str = ".btl.bin";

const MAX_VARIANT: u32 = 16;
const MAX_MINOR: u8 = 15;
const MAX_COMPONENT: u32 = 255;

/// All names derived for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetNames {
    pub target_name: String,
    pub beta_tag: String,
    pub release_tag: String,
    pub container_name: String,
}

impl TargetNames {
    /// Tag a run in the given mode creates
    pub fn tag_for(&self, mode: ReleaseMode) -> &str {
        match mode {
            ReleaseMode::Standard => &self.beta_tag,
            ReleaseMode::Promote => &self.release_tag,
        }
    }
}

/// Build-system target name; independent of version so the allow-list can be
/// checked even for targets whose revision failed to resolve
pub fn target_name(project_name: &str, key: TargetKey) -> String {
    format!(
        "{}_hard{}_var{}",
        project_name, key.hard_num, key.variant_num
    )
}

/// Pack variant and minor version into the third version component
pub fn packed_minor(variant_num: u32, minor: u8) -> Result<u8, String> {
    if !(1..=MAX_VARIANT).contains(&variant_num) {
        return Err(format!("variant_num must be in range [1, {MAX_VARIANT}]"));
    }
    if !(1..=MAX_MINOR).contains(&minor) {
        return Err(format!("minor version must be in range [1, {MAX_MINOR}]"));
    }

    // Variants 15 and 16 share a slot; the 4-bit field tops out at 14
    let packed_variant = (variant_num.min(MAX_VARIANT - 1) - 1) as u8;
    Ok((packed_variant << 4) | minor)
}

/// Check a key against the naming constraints, returning the packed minor
pub fn check_key(key: TargetKey, version: &VersionConstants) -> Result<u8, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidTarget {
        hard_num: key.hard_num,
        variant_num: key.variant_num,
        reason,
    };

    if !(1..=MAX_COMPONENT).contains(&key.hard_num) {
        return Err(invalid(format!(
            "hard_num must be in range [1, {MAX_COMPONENT}]"
        )));
    }
    packed_minor(key.variant_num, version.minor).map_err(invalid)
}

/// Compute every name for a target
pub fn target_names(
    project_name: &str,
    key: TargetKey,
    version: &VersionConstants,
    revision: u8,
) -> Result<TargetNames, ValidationError> {
    let minor = check_key(key, version)?;

    let beta_tag = format!(
        "v{}.{}.{}.{}-Rev{}",
        version.product_id, version.major, minor, key.hard_num, revision
    );
    let release_tag = release_tag_for(&beta_tag);
    let container_name = format!(
        "{}.{:03}.{:03}.{:03}{}",
        version.product_id, version.major, minor, key.hard_num, CONTAINER_SUFFIX
    );

    Ok(TargetNames {
        target_name: target_name(project_name, key),
        beta_tag,
        release_tag,
        container_name,
    })
}

/// Release tag promoted from a beta tag
pub fn release_tag_for(beta_tag: &str) -> String {
    format!("{beta_tag}{RELEASE_SUFFIX}")
}

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| {
        Regex::new(r"^v(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})-Rev(\d{1,3})(-release)?$")
            .expect("tag pattern is a valid regex")
    })
}

/// Check a tag against the canonical grammar `vP.M.m.H-RevR[-release]`
///
/// P, M, m and H must be in 1..=255, R in 0..=255, no leading zeros.
pub fn validate_tag(tag: &str) -> bool {
    let Some(captures) = tag_regex().captures(tag) else {
        return false;
    };

    let component = |index: usize, min: u32| {
        let digits = &captures[index];
        let canonical = digits == "0" || !digits.starts_with('0');
        canonical
            && digits
                .parse::<u32>()
                .map(|v| (min..=MAX_COMPONENT).contains(&v))
                .unwrap_or(false)
    };

    (1..=4).all(|i| component(i, 1)) && component(5, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version() -> VersionConstants {
        VersionConstants {
            product_id: 12,
            major: 3,
            minor: 2,
        }
    }

    #[test]
    fn test_packed_minor() {
        assert_eq!(packed_minor(1, 2), Ok(2));
        assert_eq!(packed_minor(2, 2), Ok(18));
        assert_eq!(packed_minor(15, 15), Ok(239));
        assert_eq!(packed_minor(16, 15), Ok(239));
        assert!(packed_minor(0, 2).is_err());
        assert!(packed_minor(17, 2).is_err());
        assert!(packed_minor(1, 0).is_err());
        assert!(packed_minor(1, 16).is_err());
    }

    #[test]
    fn test_target_names() {
        let names = target_names("l2_radio_energymeter", TargetKey::new(2, 1), &version(), 7).unwrap();

        assert_eq!(names.target_name, "l2_radio_energymeter_hard2_var1");
        assert_eq!(names.beta_tag, "v12.3.2.2-Rev7");
        assert_eq!(names.release_tag, "v12.3.2.2-Rev7-release");
        assert_eq!(names.container_name, "12.003.002.002.btl.bin");
    }

    #[test]
    fn test_naming_is_deterministic() {
        let key = TargetKey::new(4, 3);
        let first = target_names("meter", key, &version(), 9).unwrap();
        for _ in 0..10 {
            assert_eq!(target_names("meter", key, &version(), 9).unwrap(), first);
        }
    }

    #[test]
    fn test_variants_produce_distinct_tags() {
        let a = target_names("meter", TargetKey::new(2, 1), &version(), 7).unwrap();
        let b = target_names("meter", TargetKey::new(2, 2), &version(), 7).unwrap();
        assert_ne!(a.beta_tag, b.beta_tag);
        assert_ne!(a.container_name, b.container_name);
    }

    #[test]
    fn test_tag_for_mode() {
        let names = target_names("meter", TargetKey::new(1, 1), &version(), 0).unwrap();
        assert_eq!(names.tag_for(ReleaseMode::Standard), "v12.3.2.1-Rev0");
        assert_eq!(names.tag_for(ReleaseMode::Promote), "v12.3.2.1-Rev0-release");
    }

    #[test]
    fn test_invalid_hard_num() {
        let err = target_names("meter", TargetKey::new(0, 1), &version(), 1).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTarget { hard_num: 0, .. }));

        let err = target_names("meter", TargetKey::new(256, 1), &version(), 1).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTarget { hard_num: 256, .. }));
    }

    #[test]
    fn test_invalid_variant() {
        let err = target_names("meter", TargetKey::new(1, 0), &version(), 1).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTarget { variant_num: 0, .. }));
    }

    #[test]
    fn test_generated_tags_pass_validation() {
        let names = target_names("meter", TargetKey::new(255, 16), &version(), 255).unwrap();
        assert!(validate_tag(&names.beta_tag));
        assert!(validate_tag(&names.release_tag));
    }

    #[test]
    fn test_validate_tag() {
        assert!(validate_tag("v1.2.3.4-Rev5"));
        assert!(validate_tag("v1.2.3.4-Rev0"));
        assert!(validate_tag("v255.255.255.255-Rev255-release"));

        assert!(!validate_tag("v0.2.3.4-Rev5"));
        assert!(!validate_tag("v1.2.3.256-Rev5"));
        assert!(!validate_tag("v1.2.3.4-Rev256"));
        assert!(!validate_tag("v01.2.3.4-Rev5"));
        assert!(!validate_tag("v1.2.3-Rev5"));
        assert!(!validate_tag("v1.2.3.4-Rev5-beta"));
        assert!(!validate_tag("1.2.3.4-Rev5"));
    }
}
