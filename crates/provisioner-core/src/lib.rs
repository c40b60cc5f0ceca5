//! provisioner-core: shared types for the capacity control loop.
//!
//! Everything the control loop and its backends agree on lives here:
//! the domain model, the typed alarm event, the TOML config, and the
//! collaborator traits implemented by each backend.

pub mod config;
pub mod event;
pub mod remote;
pub mod types;

pub use config::{Policy, ProvisionerConfig};
pub use event::CapacityEvent;
pub use remote::{AlarmService, CapacityStore, MetricSource, RemoteError, RemoteResult};
pub use types::*;
