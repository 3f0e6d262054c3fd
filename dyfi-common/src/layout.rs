//! Persisted data layout
//!
//! ```text
//! <data_dir>/SC_Earthquake.geojson          raw discovery response (optional)
//! <data_dir>/<event_id>/cdi_zip.csv         normalized response summary
//! <data_dir>/<event_id>/dyfi_geo_1km.geojson
//! <data_dir>/<event_id>/dyfi_geo_10km.geojson
//! <data_dir>/<event_id>/dyfi_plot_atten.json
//! <data_dir>/<event_id>/dyfi_plot_numresp.json
//! ```
//!
//! The fetch pipeline is the only writer. The dashboard reads through
//! [`EventArtifacts`].

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Raw discovery dump file name
pub const DISCOVERY_FILE: &str = "SC_Earthquake.geojson";

/// Normalized summary CSV file name
pub const SUMMARY_CSV_FILE: &str = "cdi_zip.csv";

/// JSON artifact file names, in persist-phase order
pub const JSON_ARTIFACT_FILES: [&str; 4] = [
    "dyfi_geo_1km.geojson",
    "dyfi_geo_10km.geojson",
    "dyfi_plot_atten.json",
    "dyfi_plot_numresp.json",
];

/// Reject event ids that would escape the data directory
///
/// Upstream ids look like `se60372632`; anything with a path separator or a
/// relative component is refused.
pub fn validate_event_id(event_id: &str) -> Result<()> {
    let bad = event_id.is_empty()
        || event_id == "."
        || event_id == ".."
        || event_id.contains(&['/', '\\'][..])
        || event_id.chars().any(char::is_control);
    if bad {
        return Err(Error::InvalidInput(format!("unsafe event id: {:?}", event_id)));
    }
    Ok(())
}

/// Paths of the persisted tree rooted at a data directory
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn discovery_file(&self) -> PathBuf {
        self.root.join(DISCOVERY_FILE)
    }

    pub fn event_dir(&self, event_id: &str) -> Result<PathBuf> {
        validate_event_id(event_id)?;
        Ok(self.root.join(event_id))
    }

    pub fn artifacts(&self, event_id: &str) -> Result<EventArtifacts> {
        Ok(EventArtifacts {
            dir: self.event_dir(event_id)?,
        })
    }
}

/// Read-side view of one event directory
#[derive(Debug, Clone)]
pub struct EventArtifacts {
    dir: PathBuf,
}

impl EventArtifacts {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn summary_csv(&self) -> PathBuf {
        self.dir.join(SUMMARY_CSV_FILE)
    }

    pub fn json_artifact(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Expected artifact paths with their presence on disk
    pub fn inventory(&self) -> Vec<(PathBuf, bool)> {
        std::iter::once(self.summary_csv())
            .chain(JSON_ARTIFACT_FILES.iter().map(|f| self.json_artifact(f)))
            .map(|p| {
                let present = p.is_file();
                (p, present)
            })
            .collect()
    }

    /// True when all five artifacts exist
    pub fn is_complete(&self) -> bool {
        self.inventory().iter().all(|(_, present)| *present)
    }

    /// Load one of the JSON artifacts for charting
    pub fn read_json(&self, file_name: &str) -> Result<serde_json::Value> {
        let path = self.json_artifact(file_name);
        if !path.is_file() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let content = std::fs::read(&path)?;
        Ok(serde_json::from_slice(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_event_id_validation() {
        assert!(validate_event_id("se60372632").is_ok());
        assert!(validate_event_id("us7000abcd").is_ok());
        assert!(validate_event_id("").is_err());
        assert!(validate_event_id("..").is_err());
        assert!(validate_event_id("../etc").is_err());
        assert!(validate_event_id("a\\b").is_err());
    }

    #[test]
    fn test_layout_paths() {
        let layout = DataLayout::new("/data");
        assert_eq!(layout.discovery_file(), PathBuf::from("/data/SC_Earthquake.geojson"));
        assert_eq!(layout.event_dir("se1").unwrap(), PathBuf::from("/data/se1"));
        assert_eq!(
            layout.artifacts("se1").unwrap().summary_csv(),
            PathBuf::from("/data/se1/cdi_zip.csv")
        );
    }

    #[test]
    fn test_inventory_reports_presence() {
        let temp = TempDir::new().unwrap();
        let layout = DataLayout::new(temp.path());
        let dir = layout.event_dir("se1").unwrap();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(SUMMARY_CSV_FILE), "ZIP/Location\n").unwrap();
        std::fs::write(dir.join("dyfi_plot_atten.json"), "{\"datasets\":[]}").unwrap();

        let artifacts = layout.artifacts("se1").unwrap();
        let present: Vec<bool> = artifacts.inventory().into_iter().map(|(_, p)| p).collect();
        assert_eq!(present, vec![true, false, false, true, false]);
        assert!(!artifacts.is_complete());

        let value = artifacts.read_json("dyfi_plot_atten.json").unwrap();
        assert!(value["datasets"].is_array());
        assert!(matches!(
            artifacts.read_json("dyfi_geo_1km.geojson"),
            Err(Error::NotFound(_))
        ));
    }
}
