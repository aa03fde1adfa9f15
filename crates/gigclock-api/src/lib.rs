//! Shared attendance types for gigclock
//!
//! This crate defines the values exchanged between the core engine, the
//! persistence layer, the configuration loader and the binaries:
//! - Coordinates and sites
//! - Attendance events and their status
//! - Derived day groups and monthly statistics
//! - Eligibility reason codes

mod types;

pub use types::*;
