//! Run orchestration
//!
//! [`pipeline::run_pipeline`] drives the stages in order; [`fan_out`] is the
//! bounded-concurrency primitive the fan-out stages share and [`statistics`]
//! collects what each stage did.

pub mod fan_out;
pub mod pipeline;
pub mod statistics;

pub use pipeline::run_pipeline;
pub use statistics::{PhaseReport, RunReport, TaskFailure};
