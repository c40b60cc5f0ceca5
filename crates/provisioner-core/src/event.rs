//! Inbound alarm events.
//!
//! Alarm notifications arrive either bare, wrapped in a notification
//! envelope (`Records[].Sns.Message`), or as `{ "Message": "<json>" }`.
//! All forms are unwrapped and validated here so the control loop only
//! ever sees a fully resolved [`CapacityEvent`].

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::*;

/// Result type alias for event parsing.
pub type EventResult<T> = Result<T, EventError>;

/// Errors raised while ingesting an alarm event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed event JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("event has no `{0}` dimension")]
    MissingDimension(&'static str),

    #[error("unsupported metric `{0}` (expected ConsumedReadCapacityUnits or ConsumedWriteCapacityUnits)")]
    UnsupportedMetric(String),

    #[error("notification envelope contains no records")]
    NoRecords,
}

/// Alarm notification payload as delivered by the alarm service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AlarmNotification {
    alarm_name: Option<String>,
    trigger: Option<Trigger>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Trigger {
    metric_name: Option<String>,
    namespace: Option<String>,
    #[serde(default)]
    dimensions: Vec<Dimension>,
}

/// A validated alarm event, ready for the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityEvent {
    /// Name of the alarm that fired, if the payload carried one.
    pub alarm_name: Option<String>,
    pub resource: ResourceRef,
    pub direction: Direction,
    pub metric: MetricIdentity,
}

impl CapacityEvent {
    /// Parse every alarm event contained in a raw payload.
    pub fn parse_all(payload: &str) -> EventResult<Vec<Self>> {
        let value: Value = serde_json::from_str(payload)?;
        unwrap_envelope(value)?
            .into_iter()
            .map(Self::from_notification)
            .collect()
    }

    /// Parse a payload expected to hold exactly one alarm event.
    pub fn parse(payload: &str) -> EventResult<Self> {
        Self::parse_all(payload)?
            .into_iter()
            .next()
            .ok_or(EventError::NoRecords)
    }

    fn from_notification(notification: AlarmNotification) -> EventResult<Self> {
        let trigger = notification
            .trigger
            .ok_or(EventError::MissingField("Trigger"))?;
        let metric_name = trigger
            .metric_name
            .ok_or(EventError::MissingField("Trigger.MetricName"))?;
        let namespace = trigger
            .namespace
            .ok_or(EventError::MissingField("Trigger.Namespace"))?;

        let direction = Direction::from_metric_name(&metric_name)
            .ok_or_else(|| EventError::UnsupportedMetric(metric_name.clone()))?;

        let metric = MetricIdentity {
            namespace,
            metric_name,
            dimensions: trigger.dimensions,
        };

        let table = non_empty(metric.dimension(TABLE_NAME_DIMENSION))
            .ok_or(EventError::MissingDimension(TABLE_NAME_DIMENSION))?
            .to_string();
        let resource = match non_empty(metric.dimension(INDEX_NAME_DIMENSION)) {
            Some(index) => ResourceRef::Index {
                table,
                index: index.to_string(),
            },
            None => ResourceRef::Table { table },
        };

        Ok(Self {
            alarm_name: notification.alarm_name,
            resource,
            direction,
            metric,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Strip any notification envelope and return the alarm payloads inside.
fn unwrap_envelope(value: Value) -> EventResult<Vec<AlarmNotification>> {
    if let Some(records) = value.get("Records").and_then(Value::as_array) {
        if records.is_empty() {
            return Err(EventError::NoRecords);
        }
        return records
            .iter()
            .map(|record| {
                let message = record
                    .pointer("/Sns/Message")
                    .and_then(Value::as_str)
                    .ok_or(EventError::MissingField("Records[].Sns.Message"))?;
                Ok(serde_json::from_str(message)?)
            })
            .collect();
    }

    if let Some(message) = value.get("Message").and_then(Value::as_str) {
        return Ok(vec![serde_json::from_str(message)?]);
    }

    Ok(vec![serde_json::from_value(value)?])
}
