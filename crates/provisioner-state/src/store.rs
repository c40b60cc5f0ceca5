//! StateStore: redb-backed persistence for the local backend.
//!
//! Provides typed CRUD operations over table throughput, alarm
//! definitions, and metric datapoints. All values are JSON-serialized
//! into redb's `&[u8]` value columns. The store supports both on-disk and
//! in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, TableHandle};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use provisioner_core::types::*;

use crate::error::{StoreError, StoreResult};
use crate::tables::*;

/// Closure turning a redb error into `StoreError::Database` for `op`.
macro_rules! db_err {
    ($op:literal) => {
        |e| StoreError::Database {
            op: $op,
            message: e.to_string(),
        }
    };
}

/// Exclusive upper bound of the keys starting with `prefix`.
///
/// Bumps the last character, so `Orders:` ends at `Orders;`. `None` when
/// the range is open-ended.
fn prefix_end(prefix: &str) -> Option<String> {
    let mut chars = prefix.chars();
    let last = chars.next_back()?;
    let bumped = char::from_u32(u32::from(last) + 1)?;
    Some(format!("{}{bumped}", chars.as_str()))
}

/// One throughput write applied through the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputRecord {
    pub table_name: String,
    pub seq: u64,
    pub update: ThroughputUpdate,
}

/// Datapoints for one metric series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoints {
    pub metric: MetricIdentity,
    pub points: Vec<Datapoint>,
}

/// Seed data loaded with [`StateStore::load_fixture`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub tables: Vec<TableDescription>,
    #[serde(default)]
    pub alarms: Vec<AlarmDefinition>,
    #[serde(default)]
    pub datapoints: Vec<SeriesPoints>,
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(|e| StoreError::Open(e.to_string()))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(|e| StoreError::Open(e.to_string()))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(db_err!("begin write"))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(CAPACITY).map_err(db_err!("open table"))?;
        txn.open_table(THROUGHPUT_HISTORY).map_err(db_err!("open table"))?;
        txn.open_table(ALARMS).map_err(db_err!("open table"))?;
        txn.open_table(DATAPOINTS).map_err(db_err!("open table"))?;
        txn.commit().map_err(db_err!("commit"))?;
        Ok(())
    }

    fn put_value<T: Serialize>(
        &self,
        definition: TableDefinition<'static, &'static str, &'static [u8]>,
        key: &str,
        value: &T,
    ) -> StoreResult<()> {
        let bytes = serde_json::to_vec(value).map_err(StoreError::record(definition.name()))?;
        let txn = self.db.begin_write().map_err(db_err!("begin write"))?;
        {
            let mut table = txn.open_table(definition).map_err(db_err!("open table"))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(db_err!("write"))?;
        }
        txn.commit().map_err(db_err!("commit"))?;
        Ok(())
    }

    fn get_value<T: DeserializeOwned>(
        &self,
        definition: TableDefinition<'static, &'static str, &'static [u8]>,
        key: &str,
    ) -> StoreResult<Option<T>> {
        let txn = self.db.begin_read().map_err(db_err!("begin read"))?;
        let table = txn.open_table(definition).map_err(db_err!("open table"))?;
        match table.get(key).map_err(db_err!("read"))? {
            Some(guard) => {
                let value: T = serde_json::from_slice(guard.value())
                    .map_err(StoreError::record(definition.name()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn list_prefix<T: DeserializeOwned>(
        &self,
        definition: TableDefinition<'static, &'static str, &'static [u8]>,
        prefix: &str,
    ) -> StoreResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(db_err!("begin read"))?;
        let table = txn.open_table(definition).map_err(db_err!("open table"))?;
        let entries = match prefix_end(prefix) {
            Some(end) => table.range(prefix..end.as_str()),
            None => table.range(prefix..),
        }
        .map_err(db_err!("read"))?;
        let mut results = Vec::new();
        for entry in entries {
            let (_, value) = entry.map_err(db_err!("read"))?;
            let item: T = serde_json::from_slice(value.value())
                .map_err(StoreError::record(definition.name()))?;
            results.push(item);
        }
        Ok(results)
    }

    // ── Capacity ───────────────────────────────────────────────────

    /// Insert or replace a table's throughput description.
    pub fn put_table(&self, table: &TableDescription) -> StoreResult<()> {
        self.put_value(CAPACITY, &table.table_name, table)?;
        debug!(table = %table.table_name, "table stored");
        Ok(())
    }

    /// Get a table's throughput description by name.
    pub fn get_table(&self, table_name: &str) -> StoreResult<Option<TableDescription>> {
        self.get_value(CAPACITY, table_name)
    }

    /// Apply a throughput write and append it to the table's history.
    ///
    /// The table, and for index writes the index, must already exist.
    pub fn apply_throughput(
        &self,
        table_name: &str,
        update: &ThroughputUpdate,
    ) -> StoreResult<ThroughputRecord> {
        let prefix = format!("{table_name}:");
        let txn = self.db.begin_write().map_err(db_err!("begin write"))?;
        let record;
        {
            let mut capacity = txn.open_table(CAPACITY).map_err(db_err!("open table"))?;
            let mut description: TableDescription = match capacity
                .get(table_name)
                .map_err(db_err!("read"))?
            {
                Some(guard) => serde_json::from_slice(guard.value())
                    .map_err(StoreError::record(CAPACITY.name()))?,
                None => return Err(StoreError::NotFound(format!("table {table_name}"))),
            };

            match update {
                ThroughputUpdate::Table { throughput } => {
                    description.throughput = *throughput;
                }
                ThroughputUpdate::Index { index, throughput } => {
                    let target = description
                        .indexes
                        .iter_mut()
                        .find(|i| &i.index_name == index)
                        .ok_or_else(|| {
                            StoreError::NotFound(format!("index {index} on table {table_name}"))
                        })?;
                    target.throughput = *throughput;
                }
            }

            let bytes = serde_json::to_vec(&description)
                .map_err(StoreError::record(CAPACITY.name()))?;
            capacity
                .insert(table_name, bytes.as_slice())
                .map_err(db_err!("write"))?;

            let mut history = txn
                .open_table(THROUGHPUT_HISTORY)
                .map_err(db_err!("open table"))?;
            let end = format!("{table_name};");
            let seq = {
                let last = history
                    .range(prefix.as_str()..end.as_str())
                    .map_err(db_err!("read"))?
                    .next_back();
                match last {
                    Some(entry) => {
                        let (_, value) = entry.map_err(db_err!("read"))?;
                        let last: ThroughputRecord = serde_json::from_slice(value.value())
                            .map_err(StoreError::record(THROUGHPUT_HISTORY.name()))?;
                        last.seq + 1
                    }
                    None => 0,
                }
            };
            record = ThroughputRecord {
                table_name: table_name.to_string(),
                seq,
                update: update.clone(),
            };
            let key = format!("{prefix}{seq:020}");
            let bytes = serde_json::to_vec(&record)
                .map_err(StoreError::record(THROUGHPUT_HISTORY.name()))?;
            history
                .insert(key.as_str(), bytes.as_slice())
                .map_err(db_err!("write"))?;
        }
        txn.commit().map_err(db_err!("commit"))?;
        debug!(table = %table_name, seq = record.seq, "throughput applied");
        Ok(record)
    }

    /// All throughput writes applied to a table, oldest first.
    pub fn list_throughput_history(&self, table_name: &str) -> StoreResult<Vec<ThroughputRecord>> {
        self.list_prefix(THROUGHPUT_HISTORY, &format!("{table_name}:"))
    }

    // ── Alarms ─────────────────────────────────────────────────────

    /// Insert or replace an alarm definition.
    pub fn put_alarm(&self, alarm: &AlarmDefinition) -> StoreResult<()> {
        self.put_value(ALARMS, &alarm.alarm_name, alarm)?;
        debug!(alarm = %alarm.alarm_name, "alarm stored");
        Ok(())
    }

    /// Get an alarm by exact name.
    pub fn get_alarm(&self, name: &str) -> StoreResult<Option<AlarmDefinition>> {
        self.get_value(ALARMS, name)
    }

    /// List all alarms.
    pub fn list_alarms(&self) -> StoreResult<Vec<AlarmDefinition>> {
        self.list_prefix(ALARMS, "")
    }

    // ── Datapoints ─────────────────────────────────────────────────

    /// Record a raw datapoint for a metric series.
    pub fn put_datapoint(&self, metric: &MetricIdentity, point: &Datapoint) -> StoreResult<()> {
        let key = format!("{}@{:020}", series_key(metric), point.timestamp);
        self.put_value(DATAPOINTS, &key, point)
    }

    /// Raw datapoints for a series with `start <= timestamp <= end`, oldest first.
    pub fn list_datapoints(
        &self,
        metric: &MetricIdentity,
        start: u64,
        end: u64,
    ) -> StoreResult<Vec<Datapoint>> {
        let prefix = format!("{}@", series_key(metric));
        let points: Vec<Datapoint> = self.list_prefix(DATAPOINTS, &prefix)?;
        Ok(points
            .into_iter()
            .filter(|p| p.timestamp >= start && p.timestamp <= end)
            .collect())
    }

    /// Aggregate raw datapoints into `period_secs` buckets starting at `start`.
    ///
    /// Empty buckets produce no datapoint.
    pub fn aggregate(
        &self,
        metric: &MetricIdentity,
        statistic: Statistic,
        start: u64,
        end: u64,
        period_secs: u64,
    ) -> StoreResult<Vec<Datapoint>> {
        let period = period_secs.max(1);
        let mut buckets: Vec<(u64, Vec<f64>)> = Vec::new();
        for point in self.list_datapoints(metric, start, end)? {
            let bucket = start + (point.timestamp - start) / period * period;
            match buckets.iter_mut().find(|(ts, _)| *ts == bucket) {
                Some((_, values)) => values.push(point.value),
                None => buckets.push((bucket, vec![point.value])),
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(timestamp, values)| {
                let value = match statistic {
                    Statistic::Average => values.iter().sum::<f64>() / values.len() as f64,
                    Statistic::Maximum => values.iter().copied().fold(f64::MIN, f64::max),
                };
                Datapoint { timestamp, value }
            })
            .collect())
    }

    // ── Fixtures ───────────────────────────────────────────────────

    /// Load tables, alarms and datapoints from a fixture.
    pub fn load_fixture(&self, fixture: &Fixture) -> StoreResult<()> {
        for table in &fixture.tables {
            self.put_table(table)?;
        }
        for alarm in &fixture.alarms {
            self.put_alarm(alarm)?;
        }
        for series in &fixture.datapoints {
            for point in &series.points {
                self.put_datapoint(&series.metric, point)?;
            }
        }
        debug!(
            tables = fixture.tables.len(),
            alarms = fixture.alarms.len(),
            series = fixture.datapoints.len(),
            "fixture loaded"
        );
        Ok(())
    }
}

/// Stable key for a metric series: dimensions are sorted by name.
fn series_key(metric: &MetricIdentity) -> String {
    let mut dims: Vec<String> = metric
        .dimensions
        .iter()
        .map(|d| format!("{}={}", d.name, d.value))
        .collect();
    dims.sort();
    format!("{}|{}|{}", metric.namespace, metric.metric_name, dims.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_table(name: &str) -> TableDescription {
        TableDescription {
            table_name: name.to_string(),
            throughput: Throughput::new(5, 5),
            indexes: vec![IndexDescription {
                index_name: "by-customer".to_string(),
                throughput: Throughput::new(2, 3),
            }],
        }
    }

    fn test_alarm(name: &str) -> AlarmDefinition {
        AlarmDefinition {
            alarm_name: name.to_string(),
            actions_enabled: true,
            namespace: "AWS/DynamoDB".to_string(),
            metric_name: CONSUMED_WRITE_CAPACITY_UNITS.to_string(),
            dimensions: vec![Dimension::new("TableName", "Orders")],
            statistic: "Sum".to_string(),
            ok_actions: vec![],
            alarm_actions: vec!["arn:aws:sns:us-east-1:123:scale".to_string()],
            insufficient_data_actions: vec![],
            period: 300,
            evaluation_periods: 1,
            comparison_operator: "GreaterThanOrEqualToThreshold".to_string(),
            threshold: 10.0,
            alarm_description: None,
            datapoints_to_alarm: None,
            treat_missing_data: None,
            unit: None,
            evaluate_low_sample_count_percentile: None,
        }
    }

    fn test_metric() -> MetricIdentity {
        MetricIdentity {
            namespace: "AWS/DynamoDB".to_string(),
            metric_name: CONSUMED_WRITE_CAPACITY_UNITS.to_string(),
            dimensions: vec![Dimension::new("TableName", "Orders")],
        }
    }

    // ── Capacity ───────────────────────────────────────────────────

    #[test]
    fn table_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let table = test_table("Orders");

        store.put_table(&table).unwrap();
        assert_eq!(store.get_table("Orders").unwrap(), Some(table));
        assert!(store.get_table("Missing").unwrap().is_none());
    }

    #[test]
    fn apply_table_throughput_records_history() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_table(&test_table("Orders")).unwrap();

        let update = ThroughputUpdate::Table {
            throughput: Throughput::new(5, 48),
        };
        let record = store.apply_throughput("Orders", &update).unwrap();
        assert_eq!(record.seq, 0);

        let table = store.get_table("Orders").unwrap().unwrap();
        assert_eq!(table.throughput, Throughput::new(5, 48));
        assert_eq!(table.indexes[0].throughput, Throughput::new(2, 3));

        store.apply_throughput("Orders", &update).unwrap();
        let history = store.list_throughput_history("Orders").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].seq, 1);
    }

    #[test]
    fn history_seq_is_per_table() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_table(&test_table("Orders")).unwrap();
        store.put_table(&test_table("Orders2")).unwrap();
        store.put_table(&test_table("Order")).unwrap();

        let update = ThroughputUpdate::Table {
            throughput: Throughput::new(5, 6),
        };
        for name in ["Orders", "Orders2", "Orders", "Order", "Orders2", "Orders"] {
            store.apply_throughput(name, &update).unwrap();
        }

        let seqs = |name: &str| -> Vec<u64> {
            store
                .list_throughput_history(name)
                .unwrap()
                .iter()
                .map(|r| r.seq)
                .collect()
        };
        assert_eq!(seqs("Orders"), vec![0, 1, 2]);
        assert_eq!(seqs("Orders2"), vec![0, 1]);
        assert_eq!(seqs("Order"), vec![0]);
    }

    #[test]
    fn prefix_end_bumps_last_char() {
        assert_eq!(prefix_end("Orders:").as_deref(), Some("Orders;"));
        assert_eq!(prefix_end("series@").as_deref(), Some("seriesA"));
        assert_eq!(prefix_end(""), None);
    }

    #[test]
    fn corrupt_record_names_its_table() {
        let store = StateStore::open_in_memory().unwrap();
        let txn = store.db.begin_write().unwrap();
        {
            let mut table = txn.open_table(CAPACITY).unwrap();
            table.insert("Orders", b"not json".as_slice()).unwrap();
        }
        txn.commit().unwrap();

        let err = store.get_table("Orders").unwrap_err();
        assert!(
            matches!(err, StoreError::Record { ref table, .. } if table == CAPACITY.name()),
            "{err}"
        );
    }

    #[test]
    fn apply_index_throughput() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_table(&test_table("Orders")).unwrap();

        let update = ThroughputUpdate::Index {
            index: "by-customer".to_string(),
            throughput: Throughput::new(7, 3),
        };
        store.apply_throughput("Orders", &update).unwrap();

        let table = store.get_table("Orders").unwrap().unwrap();
        assert_eq!(table.throughput, Throughput::new(5, 5));
        assert_eq!(table.indexes[0].throughput, Throughput::new(7, 3));
    }

    #[test]
    fn apply_to_missing_table_or_index_fails() {
        let store = StateStore::open_in_memory().unwrap();
        let update = ThroughputUpdate::Table {
            throughput: Throughput::new(1, 1),
        };
        assert!(matches!(
            store.apply_throughput("Orders", &update),
            Err(StoreError::NotFound(_))
        ));

        store.put_table(&test_table("Orders")).unwrap();
        let update = ThroughputUpdate::Index {
            index: "nope".to_string(),
            throughput: Throughput::new(1, 1),
        };
        assert!(matches!(
            store.apply_throughput("Orders", &update),
            Err(StoreError::NotFound(_))
        ));
        assert!(store.list_throughput_history("Orders").unwrap().is_empty());
    }

    // ── Alarms ─────────────────────────────────────────────────────

    #[test]
    fn alarm_put_get_and_replace() {
        let store = StateStore::open_in_memory().unwrap();
        let mut alarm = test_alarm("Orders-ConsumedWriteCapacityUnits-Upper");
        store.put_alarm(&alarm).unwrap();

        alarm.threshold = 99.0;
        store.put_alarm(&alarm).unwrap();

        let stored = store
            .get_alarm("Orders-ConsumedWriteCapacityUnits-Upper")
            .unwrap()
            .unwrap();
        assert_eq!(stored.threshold, 99.0);
        assert_eq!(store.list_alarms().unwrap().len(), 1);
    }

    // ── Datapoints ─────────────────────────────────────────────────

    #[test]
    fn datapoints_filtered_by_window() {
        let store = StateStore::open_in_memory().unwrap();
        let metric = test_metric();
        for (timestamp, value) in [(100u64, 1.0), (700, 2.0), (1300, 3.0)] {
            store
                .put_datapoint(&metric, &Datapoint { timestamp, value })
                .unwrap();
        }

        let points = store.list_datapoints(&metric, 600, 1300).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp, 700);
    }

    #[test]
    fn aggregate_buckets_by_period() {
        let store = StateStore::open_in_memory().unwrap();
        let metric = test_metric();
        for (timestamp, value) in [(0u64, 10.0), (100, 30.0), (600, 5.0), (650, 7.0)] {
            store
                .put_datapoint(&metric, &Datapoint { timestamp, value })
                .unwrap();
        }

        let avg = store
            .aggregate(&metric, Statistic::Average, 0, 1200, 600)
            .unwrap();
        assert_eq!(
            avg,
            vec![
                Datapoint { timestamp: 0, value: 20.0 },
                Datapoint { timestamp: 600, value: 6.0 },
            ]
        );

        let max = store
            .aggregate(&metric, Statistic::Maximum, 0, 1200, 600)
            .unwrap();
        assert_eq!(max[0].value, 30.0);
        assert_eq!(max[1].value, 7.0);
    }

    #[test]
    fn series_key_ignores_dimension_order() {
        let a = MetricIdentity {
            namespace: "AWS/DynamoDB".to_string(),
            metric_name: "M".to_string(),
            dimensions: vec![Dimension::new("A", "1"), Dimension::new("B", "2")],
        };
        let mut b = a.clone();
        b.dimensions.reverse();
        assert_eq!(series_key(&a), series_key(&b));
    }

    // ── Fixtures / persistence ─────────────────────────────────────

    #[test]
    fn load_fixture_from_json() {
        let store = StateStore::open_in_memory().unwrap();
        let fixture = Fixture {
            tables: vec![test_table("Orders")],
            alarms: vec![test_alarm("a"), test_alarm("b")],
            datapoints: vec![SeriesPoints {
                metric: test_metric(),
                points: vec![Datapoint { timestamp: 10, value: 4.0 }],
            }],
        };
        let json = serde_json::to_string(&fixture).unwrap();
        let parsed: Fixture = serde_json::from_str(&json).unwrap();

        store.load_fixture(&parsed).unwrap();
        assert!(store.get_table("Orders").unwrap().is_some());
        assert_eq!(store.list_alarms().unwrap().len(), 2);
        assert_eq!(store.list_datapoints(&test_metric(), 0, 100).unwrap().len(), 1);
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let store = StateStore::open(&db_path).unwrap();
            store.put_table(&test_table("Orders")).unwrap();
        }

        // Reopen the same database file.
        let store = StateStore::open(&db_path).unwrap();
        let table = store.get_table("Orders").unwrap();
        assert_eq!(table.unwrap().throughput, Throughput::new(5, 5));
    }

    #[test]
    fn empty_store_operations() {
        let store = StateStore::open_in_memory().unwrap();

        assert!(store.list_alarms().unwrap().is_empty());
        assert!(store.get_alarm("nope").unwrap().is_none());
        assert!(store.list_throughput_history("nope").unwrap().is_empty());
        assert!(store.list_datapoints(&test_metric(), 0, u64::MAX).unwrap().is_empty());
    }
}
