//! Shared utilities for gigclock
//!
//! This crate provides:
//! - ID types (EventId, WorkerId, SiteId)
//! - Time utilities (mockable clock, wall-clock thresholds, calendar ranges)
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
