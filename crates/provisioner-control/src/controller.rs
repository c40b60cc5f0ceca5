//! Controller: one pass of the capacity control loop per alarm event.
//!
//! `Start → SampleRead → TargetComputed → StoreUpdated →
//! ThresholdsPublished(×bands) → Done`. Collaborators are injected, so the
//! same controller runs against AWS, the local store, or test doubles.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{Instrument, info, info_span, warn};

use provisioner_core::{
    AlarmService, CapacityEvent, CapacityStore, CapacityValue, Direction, MetricSource, Policy,
    ResourceRef, Sample, Throughput,
};

use crate::error::{BandFailure, ControlError, ControlResult, Stage};
use crate::naming::compose_alarm_name;
use crate::{calculator, capacity, sampler, thresholds};

/// Threshold written for one band.
#[derive(Debug, Clone, PartialEq)]
pub struct BandThreshold {
    pub band: String,
    pub alarm_name: String,
    pub threshold: f64,
}

/// Everything one invocation computed and applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlReport {
    pub resource: ResourceRef,
    pub direction: Direction,
    /// `None` when the metric window had no datapoints.
    pub sample: Option<Sample>,
    pub target: CapacityValue,
    pub throughput: Throughput,
    pub thresholds: Vec<BandThreshold>,
}

/// Runs the control loop against injected collaborators.
#[derive(Clone)]
pub struct Controller {
    metrics: Arc<dyn MetricSource>,
    capacity: Arc<dyn CapacityStore>,
    alarms: Arc<dyn AlarmService>,
    policy: Policy,
}

impl Controller {
    /// Create a controller with the default policy.
    pub fn new(
        metrics: Arc<dyn MetricSource>,
        capacity: Arc<dyn CapacityStore>,
        alarms: Arc<dyn AlarmService>,
    ) -> Self {
        Self {
            metrics,
            capacity,
            alarms,
            policy: Policy::default(),
        }
    }

    /// Replace the control policy.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Handle one alarm event using the system clock.
    pub async fn handle(&self, event: &CapacityEvent) -> ControlResult<ControlReport> {
        self.handle_at(event, epoch_secs()).await
    }

    /// Handle one alarm event as of `now` (unix seconds).
    pub async fn handle_at(&self, event: &CapacityEvent, now: u64) -> ControlResult<ControlReport> {
        let span = info_span!(
            "capacity_event",
            table = %event.resource.table(),
            index = event.resource.index().unwrap_or(""),
            metric = %event.metric.metric_name,
        );
        self.run(event, now).instrument(span).await
    }

    async fn run(&self, event: &CapacityEvent, now: u64) -> ControlResult<ControlReport> {
        let sample = sampler::sample(
            self.metrics.as_ref(),
            &event.metric,
            self.policy.window_secs,
            now,
        )
        .await
        .map_err(ControlError::remote(
            Stage::SampleRead,
            event.metric.metric_name.as_str(),
        ))?;

        let target = calculator::target(sample.as_ref(), &self.policy);
        info!(
            sample = sample.map(|s| s.value),
            window_secs = self.policy.window_secs,
            %target,
            "capacity target computed"
        );

        let throughput = capacity::apply(
            self.capacity.as_ref(),
            &event.resource,
            event.direction,
            target,
        )
        .await?;

        let mut published = Vec::with_capacity(self.policy.bands.len());
        let mut failures = Vec::new();
        for band in &self.policy.bands {
            let alarm_name = compose_alarm_name(
                event.resource.table(),
                event.resource.index(),
                &event.metric.metric_name,
                &band.label,
            );
            match thresholds::publish(
                self.alarms.as_ref(),
                &alarm_name,
                band.multiplier,
                target,
                self.policy.negligible_floor,
            )
            .await
            {
                Ok(threshold) => published.push(BandThreshold {
                    band: band.label.clone(),
                    alarm_name,
                    threshold,
                }),
                Err(error) => {
                    warn!(band = %band.label, alarm = %alarm_name, %error, "threshold publish failed");
                    failures.push(BandFailure {
                        band: band.label.clone(),
                        alarm_name,
                        error,
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(ControlError::Thresholds(failures));
        }

        info!(
            %target,
            bands = published.len(),
            "capacity control complete"
        );
        Ok(ControlReport {
            resource: event.resource.clone(),
            direction: event.direction,
            sample,
            target,
            throughput,
            thresholds: published,
        })
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
