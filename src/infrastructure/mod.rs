//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - Git operations (system git)
//! - CMake/Ninja builds
//! - The artifacts directory

pub mod artifacts;
pub mod build;
pub mod git;

// Re-export commonly used types
pub use build::CmakeBuilder;
pub use git::GitClient;
