//! Band alarm naming.

/// Name of the alarm watching one band of a resource's metric.
///
/// Non-empty components are joined with `-`, then every `.` is replaced
/// by `-`.
pub fn compose_alarm_name(table: &str, index: Option<&str>, metric: &str, band: &str) -> String {
    [Some(table), index, Some(metric), Some(band)]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .replace('.', "-")
}
