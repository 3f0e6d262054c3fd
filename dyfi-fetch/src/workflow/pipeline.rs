//! End-to-end run
//!
//! Stages run strictly in sequence; each fan-out stage drains completely
//! (or hits its deadline) before the next one starts:
//!
//! 1. Discovery, fatal on failure
//! 2. Detail resolution
//! 3. Summary CSVs
//! 4. The four JSON resources, one phase per kind
//!
//! Only session construction and discovery abort the run; the session is
//! closed on that path too. Everything after discovery is isolated per event
//! and shows up in the [`RunReport`].

use crate::error::FetchResult;
use crate::http::HttpSession;
use crate::models::ResourceKind;
use crate::services::{discover_events, persist_resource_kind, persist_summaries, resolve_details};
use crate::workflow::statistics::RunReport;
use dyfi_common::human_time::format_elapsed;
use dyfi_common::PipelineConfig;
use tracing::{info, warn};

/// Run discovery, resolution and every persist phase with `config`
pub async fn run_pipeline(config: &PipelineConfig) -> FetchResult<RunReport> {
    let started = std::time::Instant::now();
    let session = HttpSession::new(&config.http)?;
    let mut report = RunReport::default();

    info!("Processing USGS API request - part 1");
    info!(data_dir = %config.data_dir.display(), "Retrieving earthquake events");
    let events = match discover_events(&session, config).await {
        Ok(events) => events,
        Err(e) => {
            session.close();
            return Err(e);
        }
    };
    report.discovered = events.len();

    info!("Processing USGS API request - part 2");
    let outcome = resolve_details(&session, &events, config).await;
    report.resolved = outcome.resolved.len();
    report.skipped = outcome.skipped.len();
    report.resolution_failed = outcome.failed.len();
    report.resolution_timed_out = outcome.timed_out.len();

    info!("Processing USGS API request - part 3");
    report
        .phases
        .push(persist_summaries(&session, &outcome.resolved, config).await);

    info!("Processing USGS API request - part 4");
    for kind in ResourceKind::JSON_KINDS {
        report
            .phases
            .push(persist_resource_kind(&session, &outcome.resolved, kind, config).await);
    }

    session.close();
    report.elapsed = started.elapsed();

    for line in report.display_lines() {
        info!("{}", line);
    }
    if !report.is_clean() {
        warn!(
            failed_events = report.resolution_failed,
            failed_files = report.task_failures(),
            "Run completed with failures"
        );
    }
    info!(
        elapsed = %format_elapsed(report.elapsed),
        "Processing USGS API request - finished"
    );

    Ok(report)
}
