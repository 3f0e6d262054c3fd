//! Data models for dyfi-fetch

pub mod event;

pub use event::{
    DiscoveredEvent, EventResources, FailedEvent, ResolutionOutcome, ResourceKind, SkipReason,
    SkippedEvent,
};
