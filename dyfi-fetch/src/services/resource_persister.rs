//! Concurrent fetch-and-persist of the JSON resources
//!
//! One phase per [`ResourceKind`]; within a phase every `(event_id, url)`
//! task runs through the bounded fan-out. A task writes exactly one file,
//! `<data_dir>/<event_id>/<last URL path segment>`, so concurrent tasks never
//! touch the same path and no locking is needed.
//!
//! A failing task is logged with its URL and recorded in the phase report.
//! Siblings, and the other phases, are unaffected.

use crate::error::{FetchError, FetchResult};
use crate::http::HttpSession;
use crate::models::{EventResources, ResourceKind};
use crate::workflow::fan_out::run_bounded;
use crate::workflow::statistics::{PhaseReport, TaskFailure};
use dyfi_common::human_time::format_elapsed;
use dyfi_common::layout::DataLayout;
use dyfi_common::PipelineConfig;
use reqwest::Url;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name for a resource: the final segment of the URL path
pub fn file_name_from_url(url: &str) -> FetchResult<String> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidResourceUrl(url.to_string()))?;
    let name = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or("");

    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        return Err(FetchError::InvalidResourceUrl(url.to_string()));
    }
    Ok(name.to_string())
}

/// Replace `path` with `contents`
///
/// Written to a sibling temp file first and renamed into place, so a reader
/// never sees a half-written artifact and reruns overwrite cleanly.
pub async fn write_artifact(path: &Path, contents: &[u8]) -> FetchResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);

    if let Err(e) = tokio::fs::write(&tmp, contents).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(FetchError::filesystem(&tmp, e));
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(FetchError::filesystem(path, e));
    }
    Ok(())
}

/// Create (if needed) and return the directory for `event_id`
pub async fn prepare_event_dir(layout: &DataLayout, event_id: &str) -> FetchResult<PathBuf> {
    let dir = layout.event_dir(event_id)?;
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| FetchError::filesystem(&dir, e))?;
    Ok(dir)
}

/// Fetch one JSON resource and store it verbatim under the event directory
pub async fn fetch_and_persist(
    session: &HttpSession,
    layout: &DataLayout,
    event_id: &str,
    url: &str,
) -> FetchResult<PathBuf> {
    let file_name = file_name_from_url(url)?;
    let body = session.get_bytes(url).await?;

    serde_json::from_slice::<serde::de::IgnoredAny>(&body).map_err(|e| FetchError::InvalidJson {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let path = prepare_event_dir(layout, event_id).await?.join(file_name);
    write_artifact(&path, &body).await?;
    Ok(path)
}

/// Run one persist phase for `kind` across all events
pub async fn persist_resource_kind(
    session: &HttpSession,
    resources: &[EventResources],
    kind: ResourceKind,
    config: &PipelineConfig,
) -> PhaseReport {
    let started = std::time::Instant::now();
    let deadline = tokio::time::Instant::now() + config.phase_deadline();
    let layout = DataLayout::new(&config.data_dir);
    let mut report = PhaseReport::new(kind.label());

    let tasks: Vec<(&str, &str)> = resources
        .iter()
        .filter_map(|row| row.url_for(kind).map(|url| (row.event_id.as_str(), url)))
        .collect();
    report.attempted = tasks.len();
    report.missing = resources.len() - tasks.len();

    info!(
        kind = %kind,
        tasks = tasks.len(),
        missing = report.missing,
        workers = config.persist_workers,
        "Fetching DYFI resources"
    );

    let layout_ref = &layout;
    let fan_out = run_bounded(tasks, config.persist_workers, deadline, |(event_id, url)| async move {
        let result = fetch_and_persist(session, layout_ref, event_id, url).await;
        (event_id, url, result)
    })
    .await;

    let deadline_hit = fan_out.deadline_hit();
    for (event_id, url, result) in fan_out.completed {
        match result {
            Ok(path) => {
                debug!(event_id = %event_id, path = %path.display(), "Saved resource");
                report.written += 1;
            }
            Err(e) => {
                warn!(event_id = %event_id, url = %url, error = %e, "Resource fetch failed");
                report.failures.push(TaskFailure {
                    event_id: event_id.to_string(),
                    url: url.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
    if deadline_hit {
        warn!(kind = %kind, pending = fan_out.pending, "Resource phase cut short by deadline");
    }
    report.timed_out = fan_out.pending;
    report.elapsed = started.elapsed();

    info!(
        kind = %kind,
        written = report.written,
        failed = report.failed(),
        timed_out = report.timed_out,
        elapsed = %format_elapsed(report.elapsed),
        "Resource phase finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url(
                "https://earthquake.usgs.gov/product/dyfi/se60372632/us/1656/dyfi_geo_1km.geojson"
            )
            .unwrap(),
            "dyfi_geo_1km.geojson"
        );
        assert_eq!(
            file_name_from_url("http://127.0.0.1:8080/a/dyfi_plot_atten.json?x=1").unwrap(),
            "dyfi_plot_atten.json"
        );
    }

    #[test]
    fn test_file_name_rejects_unusable_urls() {
        assert!(file_name_from_url("https://x/a/").is_err());
        assert!(file_name_from_url("https://x").is_err());
        assert!(file_name_from_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_write_artifact_overwrites() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dyfi_plot_numresp.json");

        write_artifact(&path, b"{\"v\":1}").await.unwrap();
        write_artifact(&path, b"{\"v\":2}").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"{\"v\":2}");
        let names: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn test_write_artifact_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing-dir").join("x.json");
        match write_artifact(&path, b"{}").await {
            Err(FetchError::Filesystem { path: p, .. }) => {
                assert!(p.to_string_lossy().contains("missing-dir"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prepare_event_dir_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let layout = DataLayout::new(temp.path());

        let first = prepare_event_dir(&layout, "se1").await.unwrap();
        let second = prepare_event_dir(&layout, "se1").await.unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
        assert!(prepare_event_dir(&layout, "../escape").await.is_err());
    }

    #[tokio::test]
    async fn test_writes_do_not_stall_concurrent_tasks() {
        let temp = TempDir::new().unwrap();
        let layout = DataLayout::new(temp.path());
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        let ids: Vec<String> = (0..12).map(|i| format!("se{}", i)).collect();

        let layout_ref = &layout;
        let result = run_bounded(ids.iter(), 6, deadline, |id| async move {
            let dir = prepare_event_dir(layout_ref, id).await?;
            write_artifact(&dir.join("dyfi_plot_atten.json"), b"{}").await
        })
        .await;

        assert_eq!(result.completed.len(), 12);
        assert!(result.completed.iter().all(|r| r.is_ok()));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 12);
    }
}
