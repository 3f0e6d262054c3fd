//! Event catalogue loader
//!
//! Reads the raw discovery dump (`SC_Earthquake.geojson`) written by
//! `dyfi-fetch -f` and turns each feature into an [`EventSummary`] the
//! dashboard can plot: magnitudes rounded to one decimal, missing felt counts
//! and intensities zeroed, missing places labelled. Origin times are shown
//! in South Carolina local time, so an evening event is dated the evening it
//! was felt rather than the next UTC day.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error};

/// Placeholder for events with no place description
pub const NO_LOCATION: &str = "No Location";

/// One earthquake from the discovery catalogue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub id: String,
    pub mag: f64,
    pub place: String,
    /// Detail document URL
    pub url: String,
    /// Number of DYFI responses
    pub felt: u64,
    /// Maximum community determined intensity
    pub cdi: f64,
    pub title: String,
    pub longitude: f64,
    pub latitude: f64,
    /// Hypocentre depth in km
    pub depth: f64,
    /// Origin time in `America/New_York`
    pub event_time: DateTime<Tz>,
    /// Local calendar date of the origin time
    pub event_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    id: String,
    properties: FeatureProperties,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    mag: Option<f64>,
    place: Option<String>,
    /// Origin time, Unix epoch milliseconds
    time: i64,
    detail: Option<String>,
    felt: Option<u64>,
    cdi: Option<f64>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

/// Load and clean the catalogue file
pub fn load_event_catalogue(path: &Path) -> Result<Vec<EventSummary>> {
    if !path.is_file() {
        error!(
            path = %path.display(),
            "Event catalogue missing; run `dyfi-fetch -f` to download it"
        );
        return Err(Error::NotFound(format!(
            "{} (run `dyfi-fetch -f` to download it)",
            path.display()
        )));
    }

    let content = std::fs::read(path)?;
    let events = parse_event_catalogue(&content)?;
    debug!(count = events.len(), path = %path.display(), "Loaded event catalogue");
    Ok(events)
}

/// Parse catalogue GeoJSON bytes
pub fn parse_event_catalogue(content: &[u8]) -> Result<Vec<EventSummary>> {
    let collection: FeatureCollection = serde_json::from_slice(content)?;

    collection
        .features
        .into_iter()
        .map(|feature| {
            let coords = &feature.geometry.coordinates;
            if coords.len() < 2 {
                return Err(Error::InvalidInput(format!(
                    "event {} has {} coordinates",
                    feature.id,
                    coords.len()
                )));
            }
            let event_time = DateTime::<Utc>::from_timestamp_millis(feature.properties.time)
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "event {} has out-of-range time {}",
                        feature.id, feature.properties.time
                    ))
                })?
                .with_timezone(&New_York);
            let props = feature.properties;

            Ok(EventSummary {
                mag: round_one_decimal(props.mag.unwrap_or(0.0)),
                place: props.place.unwrap_or_else(|| NO_LOCATION.to_string()),
                url: props.detail.unwrap_or_default(),
                felt: props.felt.unwrap_or(0),
                cdi: props.cdi.unwrap_or(0.0),
                title: props.title.unwrap_or_default(),
                longitude: coords[0],
                latitude: coords[1],
                depth: coords.get(2).copied().unwrap_or(0.0),
                event_date: event_time.date_naive(),
                event_time,
                id: feature.id,
            })
        })
        .collect()
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
