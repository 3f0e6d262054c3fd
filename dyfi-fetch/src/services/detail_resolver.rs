//! Detail resolution
//!
//! For each discovered event, fetch its detail document, pick the DYFI
//! product revision with the highest `preferredWeight` and read the five
//! resource URLs from that revision's `contents`.
//!
//! Per-event failures are isolated: a bad document lands in
//! [`ResolutionOutcome::failed`] and the rest of the batch carries on.

use crate::error::{FetchError, FetchResult};
use crate::http::HttpSession;
use crate::models::{
    DiscoveredEvent, EventResources, FailedEvent, ResolutionOutcome, ResourceKind, SkipReason,
    SkippedEvent,
};
use crate::workflow::fan_out::run_bounded;
use dyfi_common::human_time::format_elapsed;
use dyfi_common::PipelineConfig;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct DetailDocument {
    properties: DetailProperties,
}

#[derive(Debug, Deserialize)]
struct DetailProperties {
    #[serde(default)]
    products: HashMap<String, serde_json::Value>,
}

/// One revision of a DYFI product
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRevision {
    #[serde(rename = "preferredWeight")]
    pub preferred_weight: f64,
    #[serde(default)]
    pub contents: HashMap<String, ContentEntry>,
}

/// Entry of a revision's `contents` map
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub url: Option<String>,
}

/// Result of resolving one event that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum DetailResolution {
    Resolved(EventResources),
    Skipped(SkipReason),
}

/// The revision with the maximum `preferredWeight`
///
/// Ties go to the revision listed first.
pub fn select_preferred_revision(revisions: &[ProductRevision]) -> Option<&ProductRevision> {
    let mut best: Option<&ProductRevision> = None;
    for revision in revisions {
        match best {
            Some(current) if revision.preferred_weight <= current.preferred_weight => {}
            _ if revision.preferred_weight.is_nan() => {}
            _ => best = Some(revision),
        }
    }
    best
}

/// Build the resolution row from a revision, `None` without a summary CSV
pub fn extract_resources(event_id: &str, revision: &ProductRevision) -> Option<EventResources> {
    let url_of = |kind: ResourceKind| {
        revision
            .contents
            .get(kind.manifest_key())
            .and_then(|entry| entry.url.clone())
            .filter(|url| !url.trim().is_empty())
    };

    Some(EventResources {
        event_id: event_id.to_string(),
        zip_summary_url: url_of(ResourceKind::ZipSummary)?,
        geo_1km_url: url_of(ResourceKind::Geo1Km),
        geo_10km_url: url_of(ResourceKind::Geo10Km),
        atten_stats_url: url_of(ResourceKind::AttenStats),
        response_time_stats_url: url_of(ResourceKind::ResponseTimeStats),
    })
}

/// Interpret a detail document body
pub fn resolve_detail_document(event_id: &str, body: &[u8]) -> FetchResult<DetailResolution> {
    let parse_err = |message: String| FetchError::DetailParse {
        event_id: event_id.to_string(),
        message,
    };

    let document: DetailDocument =
        serde_json::from_slice(body).map_err(|e| parse_err(e.to_string()))?;

    let dyfi = match document.properties.products.get("dyfi") {
        Some(value) => value,
        None => return Ok(DetailResolution::Skipped(SkipReason::NoDyfiProduct)),
    };

    let revisions: Vec<ProductRevision> = serde_json::from_value(dyfi.clone())
        .map_err(|e| parse_err(format!("dyfi product: {}", e)))?;

    let Some(preferred) = select_preferred_revision(&revisions) else {
        return Ok(DetailResolution::Skipped(SkipReason::NoDyfiProduct));
    };

    Ok(match extract_resources(event_id, preferred) {
        Some(resources) => DetailResolution::Resolved(resources),
        None => DetailResolution::Skipped(SkipReason::NoSummaryResource),
    })
}

async fn resolve_one(session: &HttpSession, event: &DiscoveredEvent) -> FetchResult<DetailResolution> {
    let body = session.get_bytes(&event.detail_url).await?;
    resolve_detail_document(&event.id, &body)
}

/// Resolve every event with bounded concurrency
pub async fn resolve_details(
    session: &HttpSession,
    events: &[DiscoveredEvent],
    config: &PipelineConfig,
) -> ResolutionOutcome {
    let started = std::time::Instant::now();
    let deadline = tokio::time::Instant::now() + config.phase_deadline();

    info!(
        events = events.len(),
        workers = config.detail_workers,
        "Resolving DYFI resource URLs"
    );

    let fan_out = run_bounded(events.iter(), config.detail_workers, deadline, |event| async move {
        let result = resolve_one(session, event).await;
        (event.id.clone(), result)
    })
    .await;

    let mut outcome = ResolutionOutcome::default();
    let mut finished: HashSet<String> = HashSet::new();

    let deadline_hit = fan_out.deadline_hit();
    for (event_id, result) in fan_out.completed {
        finished.insert(event_id.clone());
        match result {
            Ok(DetailResolution::Resolved(resources)) => {
                debug!(event_id = %event_id, summary = %resources.zip_summary_url, "Resolved DYFI resources");
                outcome.resolved.push(resources);
            }
            Ok(DetailResolution::Skipped(reason)) => {
                info!(event_id = %event_id, ?reason, "Event has no DYFI summary, skipping");
                outcome.skipped.push(SkippedEvent { event_id, reason });
            }
            Err(e) => {
                warn!(event_id = %event_id, error = %e, "Detail resolution failed");
                outcome.failed.push(FailedEvent {
                    event_id,
                    error: e.to_string(),
                });
            }
        }
    }

    if deadline_hit {
        outcome.timed_out = events
            .iter()
            .filter(|e| !finished.contains(&e.id))
            .map(|e| e.id.clone())
            .collect();
    }

    // Completion order is arbitrary; report in discovery order
    let order: HashMap<&str, usize> = events
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.as_str(), i))
        .collect();
    let rank = |id: &str| order.get(id).copied().unwrap_or(usize::MAX);
    outcome.resolved.sort_by_key(|r| rank(&r.event_id));
    outcome.skipped.sort_by_key(|s| rank(&s.event_id));
    outcome.failed.sort_by_key(|f| rank(&f.event_id));

    info!(
        resolved = outcome.resolved.len(),
        skipped = outcome.skipped.len(),
        failed = outcome.failed.len(),
        timed_out = outcome.timed_out.len(),
        elapsed = %format_elapsed(started.elapsed()),
        "Detail resolution finished"
    );

    outcome
}
