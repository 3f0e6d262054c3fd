//! Pipeline stages
//!
//! - [`discovery`]: event search (fatal on failure)
//! - [`detail_resolver`]: detail documents → DYFI resource URLs
//! - [`summary_normalizer`]: `cdi_zip.txt` → normalized `cdi_zip.csv`
//! - [`resource_persister`]: JSON resources saved verbatim

pub mod detail_resolver;
pub mod discovery;
pub mod resource_persister;
pub mod summary_normalizer;

pub use detail_resolver::resolve_details;
pub use discovery::discover_events;
pub use resource_persister::{fetch_and_persist, persist_resource_kind, write_artifact};
pub use summary_normalizer::{normalize_summary_csv, persist_summaries};
