//! Build orchestration
//!
//! One build per target, no retries. The executor behind the trait does the
//! actual work; the orchestrator enforces that a successful build produced
//! something.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::release::ArtifactSet;
use crate::domain::target::{ResolvedTarget, TargetKey};
use crate::error::BuildError;

/// Everything a build executor needs to know about a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub project_name: String,
    pub key: TargetKey,
    pub target_name: String,
    pub container_name: String,
    pub revision: u8,
    pub is_service_firmware: bool,
}

impl BuildRequest {
    pub fn for_target(project_name: &str, target: &ResolvedTarget, is_service_firmware: bool) -> Self {
        Self {
            project_name: project_name.to_string(),
            key: target.key,
            target_name: target.target_name().to_string(),
            container_name: target.container_name().to_string(),
            revision: target.revision,
            is_service_firmware,
        }
    }
}

/// Turns a target into firmware artifacts
#[async_trait]
pub trait BuildExecutor: Send + Sync {
    async fn build(&self, request: &BuildRequest) -> Result<ArtifactSet, BuildError>;
}

/// Drives the build executor for one target at a time
pub struct BuildOrchestrator<B> {
    executor: B,
}

impl<B: BuildExecutor> BuildOrchestrator<B> {
    pub fn new(executor: B) -> Self {
        Self { executor }
    }

    #[cfg(test)]
    pub fn executor(&self) -> &B {
        &self.executor
    }

    /// Build a single target
    pub async fn build_target(&self, request: &BuildRequest) -> Result<ArtifactSet, BuildError> {
        info!(
            "Building {} (revision {})",
            request.target_name, request.revision
        );

        let artifacts = self.executor.build(request).await?;
        if artifacts.is_empty() {
            return Err(BuildError::NoArtifacts {
                target: request.target_name.clone(),
            });
        }

        debug!(
            "{} produced {} artifacts",
            request.target_name,
            artifacts.files.len()
        );
        Ok(artifacts)
    }
}
