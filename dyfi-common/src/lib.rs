//! # DYFI Common Library
//!
//! Shared code for the South Carolina DYFI data tools including:
//! - Pipeline configuration and its resolution (env, TOML, defaults)
//! - The persisted per-event data layout
//! - Event catalogue loading for the dashboard side
//! - Map view heuristics
//! - Utility functions

pub mod catalogue;
pub mod config;
pub mod error;
pub mod human_time;
pub mod layout;
pub mod map_view;

pub use config::PipelineConfig;
pub use error::{Error, Result};
