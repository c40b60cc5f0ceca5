//! redb table definitions for the local state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).

use redb::TableDefinition;

/// Table throughput descriptions keyed by `{table_name}`.
pub const CAPACITY: TableDefinition<&str, &[u8]> = TableDefinition::new("capacity");

/// Applied throughput writes keyed by `{table_name}:{seq:020}`.
pub const THROUGHPUT_HISTORY: TableDefinition<&str, &[u8]> =
    TableDefinition::new("throughput_history");

/// Alarm definitions keyed by `{alarm_name}`.
pub const ALARMS: TableDefinition<&str, &[u8]> = TableDefinition::new("alarms");

/// Raw datapoints keyed by `{series_key}@{timestamp:020}`.
pub const DATAPOINTS: TableDefinition<&str, &[u8]> = TableDefinition::new("datapoints");
