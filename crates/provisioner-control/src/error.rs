//! Control loop error types.

use std::fmt;

use thiserror::Error;

use provisioner_core::RemoteError;

/// Stage of the control loop a remote failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SampleRead,
    StoreUpdate,
    ThresholdPublish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::SampleRead => "sample read",
            Stage::StoreUpdate => "capacity update",
            Stage::ThresholdPublish => "threshold publish",
        })
    }
}

/// Errors that can occur while handling an alarm event.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("no index `{index}` on table `{table}`")]
    IndexNotFound { table: String, index: String },

    #[error("no alarm found: {0}")]
    AlarmNotFound(String),

    #[error("{stage} failed for {target}: {source}")]
    Remote {
        stage: Stage,
        target: String,
        #[source]
        source: RemoteError,
    },

    #[error("{} threshold band(s) failed: {}", .0.len(), join_failures(.0))]
    Thresholds(Vec<BandFailure>),
}

impl ControlError {
    pub(crate) fn remote(stage: Stage, target: impl Into<String>) -> impl FnOnce(RemoteError) -> Self {
        let target = target.into();
        move |source| ControlError::Remote {
            stage,
            target,
            source,
        }
    }
}

pub type ControlResult<T> = Result<T, ControlError>;

/// One band whose threshold could not be republished.
#[derive(Debug)]
pub struct BandFailure {
    pub band: String,
    pub alarm_name: String,
    pub error: ControlError,
}

impl fmt::Display for BandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.band, self.alarm_name, self.error)
    }
}

fn join_failures(failures: &[BandFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_failures_list_every_band() {
        let err = ControlError::Thresholds(vec![
            BandFailure {
                band: "Upper".to_string(),
                alarm_name: "Orders-ConsumedWriteCapacityUnits-Upper".to_string(),
                error: ControlError::AlarmNotFound(
                    "Orders-ConsumedWriteCapacityUnits-Upper".to_string(),
                ),
            },
            BandFailure {
                band: "Lower".to_string(),
                alarm_name: "Orders-ConsumedWriteCapacityUnits-Lower".to_string(),
                error: ControlError::Remote {
                    stage: Stage::ThresholdPublish,
                    target: "Orders-ConsumedWriteCapacityUnits-Lower".to_string(),
                    source: RemoteError::new("alarms", "throttled"),
                },
            },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 threshold band(s) failed"));
        assert!(msg.contains("Upper (Orders-ConsumedWriteCapacityUnits-Upper): no alarm found"));
        assert!(msg.contains("threshold publish failed for Orders-ConsumedWriteCapacityUnits-Lower"));
    }

    #[test]
    fn remote_error_names_stage() {
        let err = ControlError::remote(Stage::StoreUpdate, "Orders/by-customer")(
            RemoteError::new("dynamodb", "timeout"),
        );
        assert_eq!(
            err.to_string(),
            "capacity update failed for Orders/by-customer: dynamodb: timeout"
        );
    }
}
