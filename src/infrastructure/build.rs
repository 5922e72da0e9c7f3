//! CMake/Ninja build executor
//!
//! Configures and cleans the build tree once per run, then builds one CMake
//! target per request and collects whatever of `{target}.bin`,
//! `{target}.map` and the container the build left behind.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::domain::release::ArtifactSet;
use crate::error::BuildError;
use crate::services::build_orchestrator::{BuildExecutor, BuildRequest};

const CMAKE: &str = "cmake";

/// Lines of build output kept in a failure reason
const FAILURE_TAIL_LINES: usize = 20;

pub struct CmakeBuilder {
    source_dir: PathBuf,
    build_dir: PathBuf,
    configured: OnceCell<()>,
}

impl CmakeBuilder {
    pub fn new(source_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            build_dir: build_dir.into(),
            configured: OnceCell::new(),
        }
    }

    async fn cmake(&self, target: &str, args: &[String]) -> Result<(), BuildError> {
        debug!("{} {}", CMAKE, args.join(" "));

        let output = Command::new(CMAKE)
            .args(args)
            .current_dir(&self.source_dir)
            .output()
            .await
            .map_err(|e| BuildError::Spawn {
                program: CMAKE.to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
            log.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(BuildError::Failed {
                target: target.to_string(),
                reason: tail(&log, FAILURE_TAIL_LINES),
            });
        }

        Ok(())
    }

    /// Configure once; SERVICE_FIRMWARE is set explicitly so a cached value
    /// from an earlier configuration never leaks into this run
    async fn configure(&self, request: &BuildRequest) -> Result<(), BuildError> {
        self.configured
            .get_or_try_init(|| async {
                let build_dir = self.build_dir.to_string_lossy().into_owned();
                let service = if request.is_service_firmware { "ON" } else { "OFF" };

                info!("Configuring CMake in {}", build_dir);
                self.cmake(
                    &request.target_name,
                    &configure_args(&build_dir, service),
                )
                .await?;

                info!("Cleaning previous build");
                self.cmake(
                    &request.target_name,
                    &[
                        "--build".to_string(),
                        build_dir,
                        "--target=clean".to_string(),
                    ],
                )
                .await
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl BuildExecutor for CmakeBuilder {
    async fn build(&self, request: &BuildRequest) -> Result<ArtifactSet, BuildError> {
        debug!(
            "{}: building {} ({})",
            request.project_name, request.target_name, request.key
        );
        self.configure(request).await?;

        self.cmake(
            &request.target_name,
            &[
                "--build".to_string(),
                self.build_dir.to_string_lossy().into_owned(),
                format!("--target={}", request.target_name),
            ],
        )
        .await?;

        let mut files = Vec::new();
        for path in expected_artifacts(&self.build_dir, request) {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                files.push(path);
            }
        }
        Ok(ArtifactSet::new(files))
    }
}

fn configure_args(build_dir: &str, service: &str) -> Vec<String> {
    vec![
        "-S".to_string(),
        ".".to_string(),
        "-B".to_string(),
        build_dir.to_string(),
        "-G".to_string(),
        "Ninja".to_string(),
        format!("-DSERVICE_FIRMWARE={service}"),
    ]
}

/// Files a build is expected to leave behind for a target
pub fn expected_artifacts(build_dir: &Path, request: &BuildRequest) -> Vec<PathBuf> {
    vec![
        build_dir.join(format!("{}.bin", request.target_name)),
        build_dir.join(format!("{}.map", request.target_name)),
        build_dir.join(&request.container_name),
    ]
}

fn tail(log: &str, lines: usize) -> String {
    let all: Vec<&str> = log.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
