//! dyfi-fetch library interface
//!
//! Exposes the pipeline stages for the binary and for integration testing.

pub mod error;
pub mod http;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{FetchError, FetchResult};
pub use crate::http::{HttpSession, RetryPolicy};
pub use crate::workflow::{run_pipeline, RunReport};

/// Version, commit and build time, as stamped by the build script
pub fn build_id() -> String {
    format!(
        "{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    )
}
