//! Device collaborator interfaces for gigclock
//!
//! The attendance core never performs I/O itself. This crate defines the
//! capability-based interfaces the embedding application implements to
//! obtain a position fix and an identity-verification outcome, plus
//! in-memory implementations for tests and the command-line driver.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
