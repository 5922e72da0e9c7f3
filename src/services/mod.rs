//! Services layer - orchestration logic
//!
//! This module coordinates between domain logic and infrastructure.
//! Collaborators are reached through the `BuildExecutor` and `VersionControl`
//! traits so the orchestration runs against fakes in tests.

pub mod build_orchestrator;
pub mod release_service;
pub mod tag_resolver;

// Re-export commonly used types
pub use release_service::ReleaseService;
