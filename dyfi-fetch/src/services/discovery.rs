//! Event discovery
//!
//! One query against the FDSN event search endpoint with the swarm's fixed
//! box, time window and magnitude range, restricted to events carrying a DYFI
//! product. Any failure here is fatal for the run.

use crate::error::{FetchError, FetchResult};
use crate::http::HttpSession;
use crate::models::DiscoveredEvent;
use crate::services::resource_persister::write_artifact;
use chrono::NaiveDate;
use dyfi_common::layout::DataLayout;
use dyfi_common::PipelineConfig;
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    features: Vec<SearchFeature>,
}

#[derive(Debug, Deserialize)]
struct SearchFeature {
    id: String,
    properties: SearchProperties,
}

#[derive(Debug, Deserialize)]
struct SearchProperties {
    detail: String,
}

/// Query parameters for the search window ending on `today`
pub fn build_search_query(config: &PipelineConfig, today: NaiveDate) -> Vec<(&'static str, String)> {
    let bbox = &config.bounding_box;
    vec![
        ("starttime", format!("{} 00:00:00", config.start_date)),
        ("endtime", format!("{} 23:59:59", today)),
        ("maxlatitude", bbox.max_latitude.to_string()),
        ("minlatitude", bbox.min_latitude.to_string()),
        ("maxlongitude", bbox.max_longitude.to_string()),
        ("minlongitude", bbox.min_longitude.to_string()),
        ("minmagnitude", config.min_magnitude.to_string()),
        ("maxmagnitude", config.max_magnitude.to_string()),
        ("orderby", "time".to_string()),
        ("producttype", "dyfi".to_string()),
        ("format", "geojson".to_string()),
    ]
}

/// Extract `(id, detail_url)` pairs in upstream order
pub fn parse_discovery(body: &[u8]) -> FetchResult<Vec<DiscoveredEvent>> {
    let response: SearchResponse = serde_json::from_slice(body)
        .map_err(|e| FetchError::DiscoveryFailed(format!("malformed search response: {}", e)))?;

    Ok(response
        .features
        .into_iter()
        .map(|f| DiscoveredEvent {
            id: f.id,
            detail_url: f.properties.detail,
        })
        .collect())
}

/// Run the search and return the discovered events
///
/// When `save_raw_discovery` is set the response body is written verbatim to
/// `<data_dir>/SC_Earthquake.geojson`, after it has parsed successfully.
pub async fn discover_events(
    session: &HttpSession,
    config: &PipelineConfig,
) -> FetchResult<Vec<DiscoveredEvent>> {
    let today = chrono::Local::now().date_naive();
    let query = build_search_query(config, today);
    debug!(url = %config.search_url, ?query, "Running event search");

    let response = session
        .get_with_query(&config.search_url, &query)
        .await
        .map_err(|e| FetchError::DiscoveryFailed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::DiscoveryFailed(format!(
            "search endpoint answered HTTP {}",
            status.as_u16()
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| FetchError::DiscoveryFailed(format!("reading search response: {}", e)))?;

    let events = parse_discovery(&body)?;
    info!(count = events.len(), "Discovered earthquake events");

    if config.save_raw_discovery {
        let layout = DataLayout::new(&config.data_dir);
        tokio::fs::create_dir_all(layout.root())
            .await
            .map_err(|e| FetchError::filesystem(layout.root(), e))?;
        let path = layout.discovery_file();
        write_artifact(&path, &body).await?;
        info!(path = %path.display(), "Saved raw discovery response");
    }

    Ok(events)
}
