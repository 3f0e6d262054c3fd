//! Test helpers for dyfi-fetch integration tests
//!
//! [`FixtureServer`] is a local axum stand-in for the USGS search endpoint,
//! detail documents and product files. Every path has a script of replies;
//! the last reply repeats once the script runs out, unknown paths are 404.

#![allow(dead_code)]

pub mod log_capture;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use dyfi_common::PipelineConfig;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SEARCH_PATH: &str = "/fdsnws/event/1/query.geojson";

/// Raw `cdi_zip.txt` served for every event
pub const RAW_SUMMARY: &str = "# Columns: ZIP/Location,CDI,No. of responses,Hypocentral distance,Latitude,Longitude,Standard deviation,Suspect?,City,State[,cityid]\n\
29045,3.4,12,5.1,34.18,-80.81,0.25,0,Elgin,SC,1001\n\
29020,2.2,3,22.7,34.24,-80.64,0.31,0,Camden,,1002\n";

/// `cdi_zip.csv` expected from [`RAW_SUMMARY`]
pub const NORMALIZED_SUMMARY: &str = "ZIP/Location,CDI,Response_Count,Hypocentral_Distance,Latitude,Longitude,City,State\n\
29045,3.4,12,5.1,34.18,-80.81,Elgin,SC\n\
29020,2.2,3,22.7,34.24,-80.64,Camden,No State\n";

pub const RESOURCE_KEYS: [&str; 5] = [
    "cdi_zip.txt",
    "dyfi_geo_1km.geojson",
    "dyfi_geo_10km.geojson",
    "dyfi_plot_atten.json",
    "dyfi_plot_numresp.json",
];

/// One scripted reply
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
            delay: None,
        }
    }

    pub fn status(code: u16) -> Self {
        Self {
            status: StatusCode::from_u16(code).unwrap(),
            body: format!("status {}", code).into_bytes(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct FixtureState {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    hits: Mutex<HashMap<String, usize>>,
    queries: Mutex<HashMap<String, String>>,
}

impl FixtureState {
    fn next_reply(&self, path: &str, query: Option<&str>) -> Reply {
        *self.hits.lock().unwrap().entry(path.to_string()).or_default() += 1;
        if let Some(query) = query {
            self.queries
                .lock()
                .unwrap()
                .insert(path.to_string(), query.to_string());
        }

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(path) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap(),
            Some(script) => script.front().cloned().unwrap_or_else(|| Reply::status(404)),
            None => Reply::status(404),
        }
    }
}

async fn serve_fixture(State(state): State<Arc<FixtureState>>, uri: Uri) -> Response {
    let reply = state.next_reply(uri.path(), uri.query());
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    (reply.status, reply.body).into_response()
}

/// Local HTTP server with scripted routes
pub struct FixtureServer {
    base: String,
    state: Arc<FixtureState>,
}

impl FixtureServer {
    pub async fn start() -> Self {
        let state = Arc::new(FixtureState::default());
        let app = Router::new()
            .fallback(serve_fixture)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base: format!("http://{}", addr),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Serve `reply` on every request to `path`
    pub fn route(&self, path: &str, reply: Reply) {
        self.script(path, vec![reply]);
    }

    /// Serve `replies` in order, repeating the last one
    pub fn script(&self, path: &str, replies: Vec<Reply>) {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert(path.to_string(), replies.into_iter().collect());
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn last_query(&self, path: &str) -> Option<String> {
        self.state.queries.lock().unwrap().get(path).cloned()
    }
}

pub fn detail_path(event_id: &str) -> String {
    format!("/earthquakes/feed/v1.0/detail/{}.geojson", event_id)
}

/// Path of a product file in the preferred revision
pub fn resource_path(event_id: &str, key: &str) -> String {
    format!("/product/dyfi/{}/us/2/{}", event_id, key)
}

/// Path of a product file in the superseded revision
pub fn stale_resource_path(event_id: &str, key: &str) -> String {
    format!("/product/dyfi/{}/us/1/{}", event_id, key)
}

pub fn json_resource_body(event_id: &str, key: &str) -> String {
    json!({"type": "FeatureCollection", "event": event_id, "file": key, "features": []}).to_string()
}

/// Serve a search response listing `event_ids` in order, returning its body
pub fn register_search(server: &FixtureServer, event_ids: &[&str]) -> String {
    let features: Vec<_> = event_ids
        .iter()
        .map(|id| {
            json!({
                "type": "Feature",
                "id": id,
                "properties": {
                    "mag": 2.1,
                    "time": 1_656_000_000_000i64,
                    "place": "3 km SW of Elgin, South Carolina",
                    "detail": server.url(&detail_path(id)),
                },
                "geometry": {"type": "Point", "coordinates": [-80.74, 34.15, 2.9]}
            })
        })
        .collect();
    let body = json!({"type": "FeatureCollection", "features": features}).to_string();
    server.route(SEARCH_PATH, Reply::ok(body.clone()));
    body
}

/// Event with two DYFI revisions; the second (weight 2) is preferred
pub fn register_dyfi_event(server: &FixtureServer, event_id: &str) {
    let contents = |path_of: fn(&str, &str) -> String| -> serde_json::Value {
        RESOURCE_KEYS
            .iter()
            .map(|key| {
                (
                    key.to_string(),
                    json!({"contentType": "text/plain", "url": server.url(&path_of(event_id, key))}),
                )
            })
            .collect::<serde_json::Map<_, _>>()
            .into()
    };

    let detail = json!({
        "type": "Feature",
        "id": event_id,
        "properties": {
            "products": {
                "origin": [{"preferredWeight": 156}],
                "dyfi": [
                    {"preferredWeight": 1, "contents": contents(stale_resource_path)},
                    {"preferredWeight": 2, "contents": contents(resource_path)}
                ]
            }
        }
    });
    server.route(&detail_path(event_id), Reply::ok(detail.to_string()));

    server.route(&resource_path(event_id, "cdi_zip.txt"), Reply::ok(RAW_SUMMARY));
    for key in &RESOURCE_KEYS[1..] {
        server.route(
            &resource_path(event_id, key),
            Reply::ok(json_resource_body(event_id, key)),
        );
    }
}

/// Event whose detail document carries no DYFI product
pub fn register_event_without_dyfi(server: &FixtureServer, event_id: &str) {
    let detail = json!({
        "type": "Feature",
        "id": event_id,
        "properties": {"products": {"origin": [{"preferredWeight": 156}]}}
    });
    server.route(&detail_path(event_id), Reply::ok(detail.to_string()));
}

/// Configuration pointed at `server`, writing under `data_dir`, with short
/// backoff so retry tests stay fast
pub fn test_config(server: &FixtureServer, data_dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.data_dir = data_dir.to_path_buf();
    config.search_url = server.url(SEARCH_PATH);
    config.phase_deadline_secs = 30;
    config.http.connect_timeout_ms = 1000;
    config.http.read_timeout_ms = 5000;
    config.http.retry.backoff_factor_ms = 10;
    config
}

/// Sorted file names in `dir`
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// Every file under `root` with its contents, sorted by path
pub fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let contents = std::fs::read(&path).unwrap();
                files.push((path, contents));
            }
        }
    }
    files.sort();
    files
}
