//! CLI definitions for fwrelease
//!
//! This module contains all CLI argument parsing structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fwrelease",
    version,
    about = "Firmware release orchestrator",
    long_about = "Builds a firmware target matrix, commits the artifacts and manages\nbeta and release tags. Promotion runs also propose a changelog update."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Inputs shared by every command that reads a release description
#[derive(Args, Debug, Clone)]
pub struct ReleaseInputs {
    /// Release description (release.json)
    pub release: PathBuf,

    /// Firmware definitions header (required when the version source is defs)
    pub defs: Option<PathBuf>,

    /// Runner settings file (defaults to ./fwrelease.yaml when present)
    #[arg(long, env = "FWRELEASE_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Comma-separated list of target names this runner may release
    #[arg(long, env = "EXPECTED_TARGETS")]
    pub expected_targets: Option<String>,

    /// Where version constants come from: defs or document
    #[arg(long, env = "RELEASE_VERSION_SOURCE")]
    pub version_source: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a release: build and beta-tag, or promote to release tags
    Run {
        #[command(flatten)]
        inputs: ReleaseInputs,

        /// CMake build directory
        #[arg(long)]
        build_dir: Option<PathBuf>,

        /// Directory for copied artifacts, checksums and release notes
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,

        /// Git remote to push commits and tags to
        #[arg(long)]
        remote: Option<String>,

        /// Access token for an authenticated push remote (needs remote_url in settings)
        #[arg(long, env = "RELEASE_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Validate a release description and show the resolved target matrix
    Plan {
        #[command(flatten)]
        inputs: ReleaseInputs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a tag against the release tag grammar
    TagCheck {
        /// Tag name, e.g. v12.3.2.2-Rev7
        tag: String,
    },
}
