//! Domain types for the capacity control loop.
//!
//! These types describe metric series, provisioned throughput, and alarm
//! definitions. All of them are serializable so backends can persist or
//! transmit them as JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Metric name reported for consumed read throughput.
pub const CONSUMED_READ_CAPACITY_UNITS: &str = "ConsumedReadCapacityUnits";

/// Metric name reported for consumed write throughput.
pub const CONSUMED_WRITE_CAPACITY_UNITS: &str = "ConsumedWriteCapacityUnits";

/// Dimension carrying the table name.
pub const TABLE_NAME_DIMENSION: &str = "TableName";

/// Dimension carrying the global secondary index name.
pub const INDEX_NAME_DIMENSION: &str = "GlobalSecondaryIndexName";

// ── Metrics ───────────────────────────────────────────────────────

/// A single name/value dimension of a metric series.
///
/// Alarm notifications spell the keys `name`/`value` while the metric
/// API uses `Name`/`Value`; both are accepted and always serialized in
/// the API form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(rename = "Value", alias = "value")]
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Identifies exactly one metric time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricIdentity {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
}

impl MetricIdentity {
    /// Look up a dimension value by name, ignoring ASCII case.
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .map(|d| d.value.as_str())
    }
}

/// Aggregate statistic requested from the metric service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Average,
    Maximum,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Average => "Average",
            Statistic::Maximum => "Maximum",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One aggregated datapoint returned by the metric service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    /// Unix timestamp (seconds) of the bucket start.
    pub timestamp: u64,
    /// Value of the requested statistic for the bucket.
    pub value: f64,
}

/// Most recent aggregate over a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    /// Aggregation period in seconds.
    pub period_secs: u64,
}

// ── Capacity ──────────────────────────────────────────────────────

/// Provisioned throughput units for one direction of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapacityValue(pub u64);

impl CapacityValue {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CapacityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which throughput field an adjustment touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    /// Map a consumed-capacity metric name to its direction.
    pub fn from_metric_name(metric_name: &str) -> Option<Self> {
        match metric_name {
            CONSUMED_READ_CAPACITY_UNITS => Some(Direction::Read),
            CONSUMED_WRITE_CAPACITY_UNITS => Some(Direction::Write),
            _ => None,
        }
    }

    /// Name of the provisioned-throughput field this direction maps to.
    pub fn field_name(&self) -> &'static str {
        match self {
            Direction::Read => "ReadCapacityUnits",
            Direction::Write => "WriteCapacityUnits",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Read => "read",
            Direction::Write => "write",
        })
    }
}

/// Read and write provisioned throughput of a table or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    pub read_capacity_units: u64,
    pub write_capacity_units: u64,
}

impl Throughput {
    pub fn new(read_capacity_units: u64, write_capacity_units: u64) -> Self {
        Self {
            read_capacity_units,
            write_capacity_units,
        }
    }

    pub fn get(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Read => self.read_capacity_units,
            Direction::Write => self.write_capacity_units,
        }
    }

    /// Copy of `self` with only `direction` replaced.
    pub fn with(&self, direction: Direction, value: CapacityValue) -> Self {
        match direction {
            Direction::Read => Self {
                read_capacity_units: value.get(),
                ..*self
            },
            Direction::Write => Self {
                write_capacity_units: value.get(),
                ..*self
            },
        }
    }
}

/// The unit of capacity configuration an event addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceRef {
    Table { table: String },
    Index { table: String, index: String },
}

impl ResourceRef {
    pub fn table(&self) -> &str {
        match self {
            ResourceRef::Table { table } | ResourceRef::Index { table, .. } => table,
        }
    }

    pub fn index(&self) -> Option<&str> {
        match self {
            ResourceRef::Table { .. } => None,
            ResourceRef::Index { index, .. } => Some(index),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Table { table } => f.write_str(table),
            ResourceRef::Index { table, index } => write!(f, "{table}/{index}"),
        }
    }
}

/// Current throughput configuration of one global secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub index_name: String,
    pub throughput: Throughput,
}

/// Current throughput configuration of a table and its indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub table_name: String,
    pub throughput: Throughput,
    #[serde(default)]
    pub indexes: Vec<IndexDescription>,
}

impl TableDescription {
    /// Find an index by exact name.
    pub fn index(&self, index_name: &str) -> Option<&IndexDescription> {
        self.indexes.iter().find(|i| i.index_name == index_name)
    }
}

/// A complete throughput write for one selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum ThroughputUpdate {
    Table { throughput: Throughput },
    Index { index: String, throughput: Throughput },
}

impl ThroughputUpdate {
    pub fn throughput(&self) -> Throughput {
        match self {
            ThroughputUpdate::Table { throughput } | ThroughputUpdate::Index { throughput, .. } => {
                *throughput
            }
        }
    }
}

// ── Alarms ────────────────────────────────────────────────────────

/// Full configuration of an existing metric alarm.
///
/// Only `threshold` is ever recomputed; everything else is carried
/// over verbatim when the alarm is republished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmDefinition {
    pub alarm_name: String,
    pub actions_enabled: bool,
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    /// Statistic the alarm evaluates ("Sum", "Average", ...).
    pub statistic: String,
    #[serde(default)]
    pub ok_actions: Vec<String>,
    #[serde(default)]
    pub alarm_actions: Vec<String>,
    #[serde(default)]
    pub insufficient_data_actions: Vec<String>,
    /// Evaluation period in seconds.
    pub period: u64,
    pub evaluation_periods: u32,
    pub comparison_operator: String,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_description: Option<String>,
    /// M of an "M out of N" alarm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datapoints_to_alarm: Option<u32>,
    /// "breaching", "notBreaching", "ignore" or "missing".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treat_missing_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluate_low_sample_count_percentile: Option<String>,
}

impl AlarmDefinition {
    /// Copy of this definition with a new threshold.
    pub fn with_threshold(&self, threshold: f64) -> Self {
        Self {
            threshold,
            ..self.clone()
        }
    }
}

/// A named threshold tier watching the provisioned value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub label: String,
    pub multiplier: f64,
}

impl Band {
    pub fn new(label: impl Into<String>, multiplier: f64) -> Self {
        Self {
            label: label.into(),
            multiplier,
        }
    }
}
