//! Event and resource records passed between pipeline stages

use serde::Serialize;
use std::fmt;

/// One event returned by the search endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredEvent {
    /// Upstream event id, e.g. `se60372632`
    pub id: String,
    /// URL of the event detail document
    pub detail_url: String,
}

/// Named DYFI resources extracted from a product revision's contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ZipSummary,
    Geo1Km,
    Geo10Km,
    AttenStats,
    ResponseTimeStats,
}

impl ResourceKind {
    /// All kinds, summary first
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::ZipSummary,
        ResourceKind::Geo1Km,
        ResourceKind::Geo10Km,
        ResourceKind::AttenStats,
        ResourceKind::ResponseTimeStats,
    ];

    /// JSON kinds in persist-phase order
    pub const JSON_KINDS: [ResourceKind; 4] = [
        ResourceKind::Geo1Km,
        ResourceKind::Geo10Km,
        ResourceKind::AttenStats,
        ResourceKind::ResponseTimeStats,
    ];

    /// Key of this resource in a DYFI product's `contents` map
    pub fn manifest_key(self) -> &'static str {
        match self {
            ResourceKind::ZipSummary => "cdi_zip.txt",
            ResourceKind::Geo1Km => "dyfi_geo_1km.geojson",
            ResourceKind::Geo10Km => "dyfi_geo_10km.geojson",
            ResourceKind::AttenStats => "dyfi_plot_atten.json",
            ResourceKind::ResponseTimeStats => "dyfi_plot_numresp.json",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::ZipSummary => "zip_summary",
            ResourceKind::Geo1Km => "geo_1km",
            ResourceKind::Geo10Km => "geo_10km",
            ResourceKind::AttenStats => "atten_stats",
            ResourceKind::ResponseTimeStats => "response_time_stats",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the detail-resolution table
///
/// Only built for events whose preferred DYFI revision lists a summary CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventResources {
    pub event_id: String,
    pub zip_summary_url: String,
    pub geo_1km_url: Option<String>,
    pub geo_10km_url: Option<String>,
    pub atten_stats_url: Option<String>,
    pub response_time_stats_url: Option<String>,
}

impl EventResources {
    pub fn url_for(&self, kind: ResourceKind) -> Option<&str> {
        match kind {
            ResourceKind::ZipSummary => Some(self.zip_summary_url.as_str()),
            ResourceKind::Geo1Km => self.geo_1km_url.as_deref(),
            ResourceKind::Geo10Km => self.geo_10km_url.as_deref(),
            ResourceKind::AttenStats => self.atten_stats_url.as_deref(),
            ResourceKind::ResponseTimeStats => self.response_time_stats_url.as_deref(),
        }
    }
}

/// Why an event produced no resolution row without being an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Detail document lists no `dyfi` product
    NoDyfiProduct,
    /// Preferred revision has no `cdi_zip.txt` entry
    NoSummaryResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEvent {
    pub event_id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEvent {
    pub event_id: String,
    pub error: String,
}

/// Detail resolution result, partitioned by outcome
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionOutcome {
    /// Events with DYFI resources, in discovery order
    pub resolved: Vec<EventResources>,
    pub skipped: Vec<SkippedEvent>,
    pub failed: Vec<FailedEvent>,
    /// Events still pending when the phase deadline expired
    pub timed_out: Vec<String>,
}
