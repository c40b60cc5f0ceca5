//! Collaborator interfaces the control loop is wired against.
//!
//! Each backend (AWS, local redb) implements all three traits. The
//! controller only ever sees `Arc<dyn Trait>`, so tests can substitute
//! in-memory stores or failing fakes.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::*;

/// Result type alias for collaborator calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// A failed call to a remote collaborator.
///
/// Never retried locally; the invoker owns retry policy.
#[derive(Debug, Error)]
#[error("{service}: {message}")]
pub struct RemoteError {
    /// Which collaborator failed ("metrics", "capacity", "alarms", ...).
    pub service: String,
    pub message: String,
}

impl RemoteError {
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
        }
    }
}

/// Read-only time-series metric service.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Aggregated datapoints for `identity` between `start` and `end`
    /// (unix seconds), bucketed at `period_secs`. Order is unspecified.
    async fn statistics(
        &self,
        identity: &MetricIdentity,
        statistic: Statistic,
        start: u64,
        end: u64,
        period_secs: u64,
    ) -> RemoteResult<Vec<Datapoint>>;
}

/// Provisioned-throughput configuration of tables and their indexes.
#[async_trait]
pub trait CapacityStore: Send + Sync {
    /// Current throughput of a table and its indexes, `None` if the table
    /// does not exist.
    async fn describe_table(&self, table: &str) -> RemoteResult<Option<TableDescription>>;

    /// Write a complete read/write throughput pair for one selector.
    async fn update_throughput(&self, table: &str, update: &ThroughputUpdate) -> RemoteResult<()>;
}

/// Metric alarm definitions.
#[async_trait]
pub trait AlarmService: Send + Sync {
    /// Look up an alarm by exact name.
    async fn describe_alarm(&self, name: &str) -> RemoteResult<Option<AlarmDefinition>>;

    /// Create or replace an alarm with the given full definition.
    async fn put_alarm(&self, alarm: &AlarmDefinition) -> RemoteResult<()>;
}
