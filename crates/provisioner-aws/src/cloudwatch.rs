//! CloudWatch metric statistics and metric alarms.

use async_trait::async_trait;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::{ComparisonOperator, MetricAlarm, StandardUnit};
use tracing::debug;

use provisioner_core::remote::*;
use provisioner_core::types::*;

const SERVICE: &str = "cloudwatch";

/// CloudWatch client serving both metric reads and alarm updates.
#[derive(Clone)]
pub struct CloudWatch {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatch {
    pub fn new(client: aws_sdk_cloudwatch::Client) -> Self {
        Self { client }
    }
}

fn sdk_dimensions(dimensions: &[Dimension]) -> RemoteResult<Vec<aws_sdk_cloudwatch::types::Dimension>> {
    dimensions
        .iter()
        .map(|d| {
            Ok(aws_sdk_cloudwatch::types::Dimension::builder()
                .name(&d.name)
                .value(&d.value)
                .build())
        })
        .collect()
}

fn sdk_statistic(statistic: Statistic) -> aws_sdk_cloudwatch::types::Statistic {
    match statistic {
        Statistic::Average => aws_sdk_cloudwatch::types::Statistic::Average,
        Statistic::Maximum => aws_sdk_cloudwatch::types::Statistic::Maximum,
    }
}

/// Convert one returned datapoint; points without a timestamp or the
/// requested statistic are skipped.
pub fn convert_datapoint(
    point: &aws_sdk_cloudwatch::types::Datapoint,
    statistic: Statistic,
) -> Option<Datapoint> {
    let timestamp = u64::try_from(point.timestamp()?.secs()).ok()?;
    let value = match statistic {
        Statistic::Average => point.average()?,
        Statistic::Maximum => point.maximum()?,
    };
    Some(Datapoint { timestamp, value })
}

/// Convert a described alarm into the domain definition.
pub fn convert_alarm(alarm: &MetricAlarm) -> RemoteResult<AlarmDefinition> {
    let name = alarm.alarm_name().unwrap_or_default();
    let missing = |field: &str| RemoteError::new(SERVICE, format!("alarm {name} has no {field}"));

    Ok(AlarmDefinition {
        alarm_name: name.to_string(),
        actions_enabled: alarm.actions_enabled().unwrap_or(true),
        namespace: alarm.namespace().ok_or_else(|| missing("Namespace"))?.to_string(),
        metric_name: alarm
            .metric_name()
            .ok_or_else(|| missing("MetricName"))?
            .to_string(),
        dimensions: alarm
            .dimensions()
            .iter()
            .map(|d| Dimension::new(d.name(), d.value()))
            .collect(),
        statistic: alarm
            .statistic()
            .ok_or_else(|| missing("Statistic"))?
            .as_str()
            .to_string(),
        ok_actions: alarm.ok_actions().to_vec(),
        alarm_actions: alarm.alarm_actions().to_vec(),
        insufficient_data_actions: alarm.insufficient_data_actions().to_vec(),
        period: alarm
            .period()
            .and_then(|p| u64::try_from(p).ok())
            .ok_or_else(|| missing("Period"))?,
        evaluation_periods: alarm
            .evaluation_periods()
            .and_then(|p| u32::try_from(p).ok())
            .ok_or_else(|| missing("EvaluationPeriods"))?,
        comparison_operator: alarm
            .comparison_operator()
            .ok_or_else(|| missing("ComparisonOperator"))?
            .as_str()
            .to_string(),
        threshold: alarm.threshold().unwrap_or_default(),
        alarm_description: alarm.alarm_description().map(str::to_string),
        datapoints_to_alarm: alarm
            .datapoints_to_alarm()
            .and_then(|n| u32::try_from(n).ok()),
        treat_missing_data: alarm.treat_missing_data().map(str::to_string),
        unit: alarm.unit().map(|u| u.as_str().to_string()),
        evaluate_low_sample_count_percentile: alarm
            .evaluate_low_sample_count_percentile()
            .map(str::to_string),
    })
}

fn to_i32(value: u64, field: &str) -> RemoteResult<i32> {
    i32::try_from(value).map_err(|_| RemoteError::new(SERVICE, format!("{field} {value} out of range")))
}

#[async_trait]
impl MetricSource for CloudWatch {
    async fn statistics(
        &self,
        identity: &MetricIdentity,
        statistic: Statistic,
        start: u64,
        end: u64,
        period_secs: u64,
    ) -> RemoteResult<Vec<Datapoint>> {
        let output = self
            .client
            .get_metric_statistics()
            .namespace(&identity.namespace)
            .metric_name(&identity.metric_name)
            .set_dimensions(Some(sdk_dimensions(&identity.dimensions)?))
            .statistics(sdk_statistic(statistic))
            .start_time(DateTime::from_secs(start as i64))
            .end_time(DateTime::from_secs(end as i64))
            .period(to_i32(period_secs, "period")?)
            .send()
            .await
            .map_err(|err| {
                RemoteError::new(
                    SERVICE,
                    format!(
                        "GetMetricStatistics {}: {}",
                        identity.metric_name,
                        DisplayErrorContext(&err)
                    ),
                )
            })?;

        let points: Vec<Datapoint> = output
            .datapoints()
            .iter()
            .filter_map(|p| convert_datapoint(p, statistic))
            .collect();
        debug!(
            metric = %identity.metric_name,
            %statistic,
            datapoints = points.len(),
            "current metrics"
        );
        Ok(points)
    }
}

#[async_trait]
impl AlarmService for CloudWatch {
    async fn describe_alarm(&self, name: &str) -> RemoteResult<Option<AlarmDefinition>> {
        let output = self
            .client
            .describe_alarms()
            .alarm_names(name)
            .send()
            .await
            .map_err(|err| {
                RemoteError::new(
                    SERVICE,
                    format!("DescribeAlarms {name}: {}", DisplayErrorContext(&err)),
                )
            })?;

        output
            .metric_alarms()
            .iter()
            .find(|a| a.alarm_name() == Some(name))
            .map(convert_alarm)
            .transpose()
    }

    async fn put_alarm(&self, alarm: &AlarmDefinition) -> RemoteResult<()> {
        self.client
            .put_metric_alarm()
            .alarm_name(&alarm.alarm_name)
            .actions_enabled(alarm.actions_enabled)
            .namespace(&alarm.namespace)
            .metric_name(&alarm.metric_name)
            .set_dimensions(Some(sdk_dimensions(&alarm.dimensions)?))
            .statistic(aws_sdk_cloudwatch::types::Statistic::from(alarm.statistic.as_str()))
            .set_ok_actions(Some(alarm.ok_actions.clone()))
            .set_alarm_actions(Some(alarm.alarm_actions.clone()))
            .set_insufficient_data_actions(Some(alarm.insufficient_data_actions.clone()))
            .period(to_i32(alarm.period, "period")?)
            .evaluation_periods(to_i32(u64::from(alarm.evaluation_periods), "evaluation periods")?)
            .comparison_operator(ComparisonOperator::from(alarm.comparison_operator.as_str()))
            .threshold(alarm.threshold)
            .set_alarm_description(alarm.alarm_description.clone())
            .set_datapoints_to_alarm(
                alarm
                    .datapoints_to_alarm
                    .map(|n| to_i32(u64::from(n), "datapoints to alarm"))
                    .transpose()?,
            )
            .set_treat_missing_data(alarm.treat_missing_data.clone())
            .set_unit(alarm.unit.as_deref().map(StandardUnit::from))
            .set_evaluate_low_sample_count_percentile(
                alarm.evaluate_low_sample_count_percentile.clone(),
            )
            .send()
            .await
            .map_err(|err| {
                RemoteError::new(
                    SERVICE,
                    format!(
                        "PutMetricAlarm {}: {}",
                        alarm.alarm_name,
                        DisplayErrorContext(&err)
                    ),
                )
            })?;
        debug!(alarm = %alarm.alarm_name, threshold = alarm.threshold, "alarm updated");
        Ok(())
    }
}
