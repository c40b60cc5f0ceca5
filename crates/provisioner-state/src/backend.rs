//! Collaborator trait implementations for the local store.

use async_trait::async_trait;
use tracing::debug;

use provisioner_core::remote::*;
use provisioner_core::types::*;

use crate::error::StoreError;
use crate::store::StateStore;

fn remote(service: &str) -> impl Fn(StoreError) -> RemoteError + '_ {
    move |e| RemoteError::new(service, e.to_string())
}

#[async_trait]
impl MetricSource for StateStore {
    async fn statistics(
        &self,
        identity: &MetricIdentity,
        statistic: Statistic,
        start: u64,
        end: u64,
        period_secs: u64,
    ) -> RemoteResult<Vec<Datapoint>> {
        let points = self
            .aggregate(identity, statistic, start, end, period_secs)
            .map_err(remote("local-metrics"))?;
        debug!(
            metric = %identity.metric_name,
            %statistic,
            start,
            end,
            datapoints = points.len(),
            "local statistics"
        );
        Ok(points)
    }
}

#[async_trait]
impl CapacityStore for StateStore {
    async fn describe_table(&self, table: &str) -> RemoteResult<Option<TableDescription>> {
        self.get_table(table).map_err(remote("local-capacity"))
    }

    async fn update_throughput(&self, table: &str, update: &ThroughputUpdate) -> RemoteResult<()> {
        self.apply_throughput(table, update)
            .map(|_| ())
            .map_err(remote("local-capacity"))
    }
}

#[async_trait]
impl AlarmService for StateStore {
    async fn describe_alarm(&self, name: &str) -> RemoteResult<Option<AlarmDefinition>> {
        self.get_alarm(name).map_err(remote("local-alarms"))
    }

    async fn put_alarm(&self, alarm: &AlarmDefinition) -> RemoteResult<()> {
        StateStore::put_alarm(self, alarm).map_err(remote("local-alarms"))
    }
}
