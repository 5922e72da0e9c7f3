//! Centralized error types for fwrelease
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.
//!
//! Pre-flight errors (`ConfigError`, `ValidationError`, run-global
//! `VersionExtractionError`) stop a run before any side effect. Build and git
//! errors are recorded per target and never abort sibling targets.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Version extraction error: {0}")]
    Version(#[from] VersionExtractionError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Changelog error: {0}")]
    Changelog(#[from] ChangelogError),
}

/// Malformed input: the release document or runner settings could not be read
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Expected targets allow-list is set but empty: {raw:?}")]
    EmptyAllowList { raw: String },
}

/// Release description violates a project rule
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid branch: {branch}. Allowed branches must start with 'release' or 'hotfix'")]
    BadBranch { branch: String },

    #[error("'targets' array cannot be empty")]
    NoTargets,

    #[error("Duplicate target hard{hard_num}_var{variant_num}")]
    DuplicateTarget { hard_num: u32, variant_num: u32 },

    #[error("Target '{target}' is not in allowed list: {allowed:?}")]
    UnexpectedTarget { target: String, allowed: Vec<String> },

    #[error("Invalid target hard{hard_num}_var{variant_num}: {reason}")]
    InvalidTarget {
        hard_num: u32,
        variant_num: u32,
        reason: String,
    },
}

/// Firmware version constants could not be determined
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionExtractionError {
    #[error("Define '{symbol}' not found in {source_name}")]
    MissingSymbol { symbol: String, source_name: String },

    #[error("{symbol} must be between {min} and {max} (inclusive), got {value}")]
    OutOfRange {
        symbol: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Version source {path} is unreadable: {message}")]
    Unreadable { path: PathBuf, message: String },
}

/// Build executor failures (per target)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Build failed for {target}: {reason}")]
    Failed { target: String, reason: String },

    #[error("Build for {target} reported success but produced no artifacts")]
    NoArtifacts { target: String },

    #[error("Failed to launch {program}: {message}")]
    Spawn { program: String, message: String },
}

/// Git operation errors (per target unless noted)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepository,

    #[error("Beta tag '{tag}' not found")]
    BetaTagMissing { tag: String },

    #[error("Tag '{tag}' already exists at {existing}, refusing to point it at {requested}")]
    TagConflict {
        tag: String,
        existing: String,
        requested: String,
    },

    #[error("Push of {refspec} to {remote} rejected: {reason}")]
    PushRejected {
        remote: String,
        refspec: String,
        reason: String,
    },

    #[error("Git command failed: {command}: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

/// Changelog step failures; never undo already-created release tags
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangelogError {
    #[error("No targets were promoted, nothing to record in the changelog")]
    NoPromotedTargets,

    #[error("Failed to publish changelog to {branch}: {source}")]
    Publish {
        branch: String,
        #[source]
        source: GitError,
    },
}

/// Why a single target did not reach its final step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetFailure {
    #[error(transparent)]
    Version(#[from] VersionExtractionError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("Step {step} ran without its prerequisite: {missing}")]
    Precondition { step: String, missing: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::BadBranch {
            branch: "main".to_string(),
        };
        assert!(err.to_string().contains("'release' or 'hotfix'"));
    }

    #[test]
    fn test_error_conversion() {
        let err = ValidationError::NoTargets;
        let release_err: ReleaseError = err.into();
        assert!(matches!(release_err, ReleaseError::Validation(_)));
    }

    #[test]
    fn test_target_failure_is_transparent() {
        let failure: TargetFailure = GitError::BetaTagMissing {
            tag: "v1.2.3.4-Rev5".to_string(),
        }
        .into();
        assert_eq!(failure.to_string(), "Beta tag 'v1.2.3.4-Rev5' not found");
    }
}
