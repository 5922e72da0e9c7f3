//! Domain layer - pure business logic
//!
//! This module contains business logic with no external I/O.
//! Types and functions here can be unit tested without mocking.

pub mod changelog;
pub mod naming;
pub mod notes;
pub mod plan;
pub mod release;
pub mod target;
pub mod version;

