//! Attendance core for gigclock
//!
//! This crate is the heart of gigclock, containing:
//! - Geofence evaluation (haversine distance to a site, radius check)
//! - Verification gate (single-slot, single-use identity check outcome)
//! - Check-in state machine (NotStarted -> CheckedIn -> CheckedOut, reset daily)
//! - Aggregation of the event log into day groups and monthly statistics
//!
//! The core performs no I/O of its own beyond appending to and reading from
//! the injected [`gigclock_store::Store`]; positions and verification
//! outcomes are handed in as already-resolved values.

mod aggregate;
mod engine;
mod geofence;
mod machine;
mod verification;

pub use aggregate::*;
pub use engine::*;
pub use geofence::*;
pub use machine::*;
pub use verification::*;
