//! Tag resolution over version control
//!
//! Tags are created idempotently: an existing tag on the requested commit is a
//! success, an existing tag anywhere else is a conflict. Release tags always
//! point at the commit behind their beta tag.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::GitError;

/// A file to publish on a fresh branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePublication<'a> {
    pub branch: &'a str,
    /// Commit the branch starts from
    pub base: &'a str,
    pub path: &'a Path,
    pub content: &'a str,
    pub message: &'a str,
}

/// Version-control operations the release engine relies on
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Commit a tag points at, if the tag exists
    async fn find_tag(&self, name: &str) -> Result<Option<String>, GitError>;

    /// Create (and publish) an annotated tag
    async fn create_tag(&self, name: &str, commit: &str, message: &str) -> Result<(), GitError>;

    /// Commit and publish build artifacts, returning the new commit
    async fn commit_artifacts(&self, paths: &[PathBuf], message: &str) -> Result<String, GitError>;

    async fn branch_tip(&self, branch: &str) -> Result<String, GitError>;

    async fn read_file(&self, commit: &str, path: &Path) -> Result<Option<String>, GitError>;

    /// Commit `content` to `path` on a branch created from `base`; returns the commit
    async fn publish_file(&self, publication: &FilePublication<'_>) -> Result<String, GitError>;
}

/// Result of an idempotent tag request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCreation {
    pub tag: String,
    pub commit: String,
    /// False when the tag already existed on the same commit
    pub created: bool,
}

/// Annotated tag message listing features and fixes
pub fn tag_message(tag: &str, features: &[String], bug_fixes: &[String]) -> String {
    let mut lines: Vec<&str> = Vec::new();
    if !features.is_empty() {
        lines.push("Features:");
        lines.extend(features.iter().map(String::as_str));
    }
    if !bug_fixes.is_empty() {
        lines.push("Bug Fixes:");
        lines.extend(bug_fixes.iter().map(String::as_str));
    }

    if lines.is_empty() {
        format!("Release {tag}")
    } else {
        lines.join("\n")
    }
}

pub struct TagResolver<G> {
    vcs: G,
}

impl<G: VersionControl> TagResolver<G> {
    pub fn new(vcs: G) -> Self {
        Self { vcs }
    }

    pub fn vcs(&self) -> &G {
        &self.vcs
    }

    /// Create `tag` on `commit` unless it already points there
    pub async fn ensure_tag(&self, tag: &str, commit: &str, message: &str) -> Result<TagCreation, GitError> {
        match self.vcs.find_tag(tag).await? {
            Some(existing) if existing == commit => {
                info!("Tag {} already exists on {}", tag, short(commit));
                Ok(TagCreation {
                    tag: tag.to_string(),
                    commit: commit.to_string(),
                    created: false,
                })
            }
            Some(existing) => {
                warn!(
                    "Tag {} exists on {}, expected {}",
                    tag,
                    short(&existing),
                    short(commit)
                );
                Err(GitError::TagConflict {
                    tag: tag.to_string(),
                    existing,
                    requested: commit.to_string(),
                })
            }
            None => {
                self.vcs.create_tag(tag, commit, message).await?;
                info!("Created tag {} on {}", tag, short(commit));
                Ok(TagCreation {
                    tag: tag.to_string(),
                    commit: commit.to_string(),
                    created: true,
                })
            }
        }
    }

    /// Commit an already published tag points at
    pub async fn existing(&self, tag: &str) -> Result<Option<String>, GitError> {
        self.vcs.find_tag(tag).await
    }

    /// Commit behind a beta tag
    pub async fn resolve_beta(&self, beta_tag: &str) -> Result<String, GitError> {
        self.vcs
            .find_tag(beta_tag)
            .await?
            .ok_or_else(|| GitError::BetaTagMissing {
                tag: beta_tag.to_string(),
            })
    }

    pub async fn commit_artifacts(&self, paths: &[PathBuf], message: &str) -> Result<String, GitError> {
        let commit = self.vcs.commit_artifacts(paths, message).await?;
        info!("Artifacts committed as {}", short(&commit));
        Ok(commit)
    }
}

fn short(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}
