//! Collecto domain library.
//!
//! Everything the HTTP service needs to collect email addresses for
//! tenant-owned signup forms: intake validation, the cross-origin gate,
//! the double opt-in confirmation flow, and the export engine.

pub mod config;
pub mod error;
pub mod exports;
pub mod signups;
pub mod telemetry;
