//! provisioner-state: local backend for the capacity control loop.
//!
//! Backed by [redb](https://docs.rs/redb), stands in for the capacity
//! store, the alarm service, and the metric service so the control loop
//! can be replayed offline and exercised in tests.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Composite keys (`{table}:{seq}`, `{series}@{timestamp}`) enable prefix
//! scans over a table's write history and a series' datapoints.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and implements `CapacityStore`, `AlarmService`, and `MetricSource`.

pub mod backend;
pub mod error;
pub mod store;
pub mod tables;

pub use error::{StoreError, StoreResult};
pub use store::{Fixture, SeriesPoints, StateStore, ThroughputRecord};
