//! Run statistics
//!
//! Each persist phase returns a [`PhaseReport`]; the pipeline gathers them,
//! with the discovery and resolution counts, into a [`RunReport`] that is
//! logged at the end of the run.

use dyfi_common::human_time::format_elapsed;
use serde::Serialize;
use std::time::Duration;

/// One task that failed inside a phase
#[derive(Debug, Clone, Serialize)]
pub struct TaskFailure {
    pub event_id: String,
    pub url: String,
    pub error: String,
}

/// Outcome counts of one persist phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseReport {
    /// Phase label, e.g. `zip_summary` or `geo_1km`
    pub phase: String,
    /// Events that had a URL for this phase
    pub attempted: usize,
    /// Files written
    pub written: usize,
    pub failures: Vec<TaskFailure>,
    /// Events without a URL for this phase
    pub missing: usize,
    /// Tasks abandoned at the phase deadline
    pub timed_out: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl PhaseReport {
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            ..Default::default()
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn display_string(&self) -> String {
        let mut line = format!(
            "{}: {} of {} written, {} failed",
            self.phase,
            self.written,
            self.attempted,
            self.failed()
        );
        if self.missing > 0 {
            line.push_str(&format!(", {} without URL", self.missing));
        }
        if self.timed_out > 0 {
            line.push_str(&format!(", {} timed out", self.timed_out));
        }
        line.push_str(&format!(" ({})", format_elapsed(self.elapsed)));
        line
    }
}

/// Whole-run summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub discovered: usize,
    pub resolved: usize,
    pub skipped: usize,
    pub resolution_failed: usize,
    pub resolution_timed_out: usize,
    pub phases: Vec<PhaseReport>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunReport {
    pub fn files_written(&self) -> usize {
        self.phases.iter().map(|p| p.written).sum()
    }

    pub fn task_failures(&self) -> usize {
        self.phases.iter().map(|p| p.failed()).sum()
    }

    /// True when no event or file was lost to an error or the deadline
    pub fn is_clean(&self) -> bool {
        self.resolution_failed == 0
            && self.resolution_timed_out == 0
            && self.phases.iter().all(|p| p.failures.is_empty() && p.timed_out == 0)
    }

    pub fn display_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "events: {} discovered, {} with DYFI data, {} skipped, {} failed, {} timed out",
            self.discovered,
            self.resolved,
            self.skipped,
            self.resolution_failed,
            self.resolution_timed_out
        )];
        lines.extend(self.phases.iter().map(PhaseReport::display_string));
        lines.push(format!(
            "total: {} files written, {} task failures in {}",
            self.files_written(),
            self.task_failures(),
            format_elapsed(self.elapsed)
        ));
        lines
    }
}
