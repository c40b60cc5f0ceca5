//! provisioner-control: metric-driven capacity adjustment.
//!
//! Handles one alarm event at a time: reads the recent demand for the
//! table (or index), provisions slightly above it, and moves the band
//! alarms so they watch the new value.
//!
//! # Control Loop
//!
//! ```text
//! average  = latest Average over the last 2×window, or 0.1 if none
//! target   = ceil(average * 1.2)
//! apply      target to the read or write field of the table / index
//!
//! for band in [Upper 0.8, Lower 0.5]:
//!     raw       = target * band.multiplier   (0 if raw <= 0.5)
//!     threshold = raw * alarm.period
//!     republish  <table>-<index>-<metric>-<band> with the new threshold
//! ```
//!
//! There is no retry or rollback between stages: a failed capacity
//! update stops the invocation, a failed band does not stop the others.

pub mod calculator;
pub mod capacity;
pub mod controller;
pub mod error;
pub mod naming;
pub mod sampler;
pub mod thresholds;

pub use controller::{BandThreshold, ControlReport, Controller};
pub use error::{BandFailure, ControlError, ControlResult, Stage};
