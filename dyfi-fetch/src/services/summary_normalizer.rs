//! Response summary (cdi_zip) normalization and persistence
//!
//! The upstream `cdi_zip.txt` is a CSV whose header carries a comment prefix
//! and free-form column names:
//!
//! ```text
//! # Columns: ZIP/Location,CDI,No. of responses,Hypocentral distance,Latitude,Longitude,Standard deviation,Suspect?,City,State[,cityid]
//! ```
//!
//! Normalization renames the columns the dashboard uses, drops the ones it
//! does not, fills blank states and copies every other cell verbatim.

use crate::error::{FetchError, FetchResult};
use crate::http::HttpSession;
use crate::models::EventResources;
use crate::services::resource_persister::{prepare_event_dir, write_artifact};
use crate::workflow::statistics::{PhaseReport, TaskFailure};
use dyfi_common::human_time::format_elapsed;
use dyfi_common::layout::{DataLayout, SUMMARY_CSV_FILE};
use dyfi_common::PipelineConfig;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Placeholder for responses without a state
pub const NO_STATE: &str = "No State";

/// Source header → canonical header
const COLUMN_RENAMES: [(&str, &str); 5] = [
    ("# Columns: ZIP/Location", "ZIP/Location"),
    ("No. of responses", "Response_Count"),
    ("Hypocentral distance", "Hypocentral_Distance"),
    ("Standard deviation", "Std_Dev"),
    ("State[", "State"),
];

/// Canonical columns not needed downstream
const DROPPED_COLUMNS: [&str; 2] = ["Suspect?", "Std_Dev"];

/// Canonical name for a source header
pub fn canonical_header(raw: &str) -> String {
    let trimmed = raw.trim();
    COLUMN_RENAMES
        .iter()
        .find(|(from, _)| *from == trimmed)
        .map(|(_, to)| to.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Empty names and names with unbalanced brackets, e.g. `cityid]`
fn is_malformed_header(name: &str) -> bool {
    name.is_empty() || name.matches('[').count() != name.matches(']').count()
}

/// Rewrite a raw summary CSV into the canonical layout
pub fn normalize_summary_csv(raw: &[u8]) -> FetchResult<Vec<u8>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(raw);

    let canonical: Vec<String> = reader.headers()?.iter().map(canonical_header).collect();
    let keep: Vec<usize> = canonical
        .iter()
        .enumerate()
        .filter(|(_, name)| !DROPPED_COLUMNS.contains(&name.as_str()) && !is_malformed_header(name))
        .map(|(i, _)| i)
        .collect();
    let state_column = keep.iter().position(|&i| canonical[i] == "State");

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(keep.iter().map(|&i| canonical[i].as_str()))?;

    for record in reader.records() {
        let record = record?;
        let row: Vec<&str> = keep
            .iter()
            .enumerate()
            .map(|(out, &i)| {
                let cell = record.get(i).unwrap_or("");
                if Some(out) == state_column && cell.trim().is_empty() {
                    NO_STATE
                } else {
                    cell
                }
            })
            .collect();
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| FetchError::Csv(csv::Error::from(e.into_error())))
}

async fn persist_summary(
    session: &HttpSession,
    layout: &DataLayout,
    resources: &EventResources,
) -> FetchResult<PathBuf> {
    let raw = session.get_bytes(&resources.zip_summary_url).await?;
    let normalized = normalize_summary_csv(&raw)?;

    let path = prepare_event_dir(layout, &resources.event_id)
        .await?
        .join(SUMMARY_CSV_FILE);
    write_artifact(&path, &normalized).await?;
    Ok(path)
}

/// Fetch, normalize and save the summary CSV of every event, one at a time
pub async fn persist_summaries(
    session: &HttpSession,
    resources: &[EventResources],
    config: &PipelineConfig,
) -> PhaseReport {
    let started = std::time::Instant::now();
    let deadline = tokio::time::Instant::now() + config.phase_deadline();
    let layout = DataLayout::new(&config.data_dir);
    let mut report = PhaseReport::new("zip_summary");
    report.attempted = resources.len();

    info!(events = resources.len(), "Saving DYFI response summaries");

    for (index, row) in resources.iter().enumerate() {
        debug!(event_id = %row.event_id, url = %row.zip_summary_url, "Processing summary");

        match tokio::time::timeout_at(deadline, persist_summary(session, &layout, row)).await {
            Ok(Ok(path)) => {
                debug!(event_id = %row.event_id, path = %path.display(), "Saved summary");
                report.written += 1;
            }
            Ok(Err(e)) => {
                warn!(event_id = %row.event_id, url = %row.zip_summary_url, error = %e, "Summary fetch failed");
                report.failures.push(TaskFailure {
                    event_id: row.event_id.clone(),
                    url: row.zip_summary_url.clone(),
                    error: e.to_string(),
                });
            }
            Err(_) => {
                report.timed_out = resources.len() - index;
                warn!(remaining = report.timed_out, "Phase deadline reached during summaries");
                break;
            }
        }
    }

    report.elapsed = started.elapsed();
    info!(
        written = report.written,
        failed = report.failed(),
        elapsed = %format_elapsed(report.elapsed),
        "Summary phase finished"
    );
    report
}
