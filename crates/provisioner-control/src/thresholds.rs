//! Band threshold publishing.
//!
//! Each band alarm watches the provisioned value at a fraction of it.
//! The alarm's threshold is expressed per evaluation period, so the
//! per-second band value is multiplied by the alarm's own period.

use tracing::info;

use provisioner_core::{AlarmService, CapacityValue};

use crate::error::{ControlError, ControlResult, Stage};

/// Per-second band value: `capacity × multiplier`, or 0 when that is at
/// or below `floor`.
pub fn band_value(capacity: CapacityValue, multiplier: f64, floor: f64) -> f64 {
    let value = capacity.get() as f64 * multiplier;
    if value <= floor { 0.0 } else { value }
}

/// Alarm threshold for a band over an alarm period of `period_secs`.
pub fn threshold(capacity: CapacityValue, multiplier: f64, period_secs: u64, floor: f64) -> f64 {
    band_value(capacity, multiplier, floor) * period_secs as f64
}

/// Recompute and republish the threshold of the alarm named `alarm_name`.
///
/// Every other field of the existing definition is preserved. Returns the
/// threshold that was written.
pub async fn publish(
    alarms: &dyn AlarmService,
    alarm_name: &str,
    multiplier: f64,
    capacity: CapacityValue,
    floor: f64,
) -> ControlResult<f64> {
    let alarm = alarms
        .describe_alarm(alarm_name)
        .await
        .map_err(ControlError::remote(Stage::ThresholdPublish, alarm_name))?
        .ok_or_else(|| ControlError::AlarmNotFound(alarm_name.to_string()))?;

    let new_threshold = threshold(capacity, multiplier, alarm.period, floor);
    info!(
        alarm = %alarm_name,
        %capacity,
        multiplier,
        period = alarm.period,
        threshold = new_threshold,
        previous = alarm.threshold,
        "updating threshold"
    );

    alarms
        .put_alarm(&alarm.with_threshold(new_threshold))
        .await
        .map_err(ControlError::remote(Stage::ThresholdPublish, alarm_name))?;
    Ok(new_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use provisioner_core::{AlarmDefinition, Dimension};
    use provisioner_state::StateStore;

    const FLOOR: f64 = 0.5;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn alarm(name: &str, period: u64) -> AlarmDefinition {
        AlarmDefinition {
            alarm_name: name.to_string(),
            actions_enabled: true,
            namespace: "AWS/DynamoDB".to_string(),
            metric_name: "ConsumedWriteCapacityUnits".to_string(),
            dimensions: vec![Dimension::new("TableName", "Orders")],
            statistic: "Sum".to_string(),
            ok_actions: vec!["arn:ok".to_string()],
            alarm_actions: vec!["arn:alarm".to_string()],
            insufficient_data_actions: vec!["arn:insufficient".to_string()],
            period,
            evaluation_periods: 2,
            comparison_operator: "GreaterThanOrEqualToThreshold".to_string(),
            threshold: 1.0,
            alarm_description: None,
            datapoints_to_alarm: None,
            treat_missing_data: Some("breaching".to_string()),
            unit: None,
            evaluate_low_sample_count_percentile: None,
        }
    }

    #[test]
    fn band_value_above_floor() {
        assert!(close(band_value(CapacityValue(48), 0.8, FLOOR), 38.4));
        assert!(close(band_value(CapacityValue(48), 0.5, FLOOR), 24.0));
        assert!(close(band_value(CapacityValue(1), 0.8, FLOOR), 0.8));
    }

    #[test]
    fn band_value_at_or_below_floor_is_zero() {
        assert_eq!(band_value(CapacityValue(1), 0.5, FLOOR), 0.0);
        assert_eq!(band_value(CapacityValue(0), 0.8, FLOOR), 0.0);
    }

    #[test]
    fn band_value_matches_definition_across_range() {
        for v in 0..500u64 {
            for m in [0.1, 0.5, 0.8, 1.0] {
                let raw = v as f64 * m;
                let expected = if raw <= FLOOR { 0.0 } else { raw };
                assert_eq!(band_value(CapacityValue(v), m, FLOOR), expected);
            }
        }
    }

    #[test]
    fn threshold_scales_by_period() {
        assert!(close(threshold(CapacityValue(48), 0.8, 300, FLOOR), 38.4 * 300.0));
        assert!(close(threshold(CapacityValue(48), 0.5, 60, FLOOR), 1440.0));
        assert_eq!(threshold(CapacityValue(1), 0.5, 300, FLOOR), 0.0);
    }

    #[tokio::test]
    async fn publish_preserves_everything_but_threshold() {
        let store = StateStore::open_in_memory().unwrap();
        let original = alarm("Orders-ConsumedWriteCapacityUnits-Upper", 300);
        store.put_alarm(&original).unwrap();

        let written = publish(
            &store,
            "Orders-ConsumedWriteCapacityUnits-Upper",
            0.8,
            CapacityValue(48),
            FLOOR,
        )
        .await
        .unwrap();
        assert!(close(written, 11_520.0));

        let stored = store
            .get_alarm("Orders-ConsumedWriteCapacityUnits-Upper")
            .unwrap()
            .unwrap();
        assert_eq!(stored, original.with_threshold(written));
    }

    #[tokio::test]
    async fn published_threshold_uses_alarm_period() {
        let store = StateStore::open_in_memory().unwrap();
        for (name, period) in [("one-minute", 60), ("five-minute", 300), ("hourly", 3_600)] {
            store.put_alarm(&alarm(name, period)).unwrap();
            let written = publish(&store, name, 0.8, CapacityValue(7), FLOOR)
                .await
                .unwrap();
            assert_eq!(written, threshold(CapacityValue(7), 0.8, period, FLOOR));
            assert_eq!(store.get_alarm(name).unwrap().unwrap().threshold, written);
        }
    }

    #[tokio::test]
    async fn republishing_same_threshold_is_identical() {
        let store = StateStore::open_in_memory().unwrap();
        let original = alarm("a", 60).with_threshold(threshold(CapacityValue(10), 0.5, 60, FLOOR));
        store.put_alarm(&original).unwrap();

        publish(&store, "a", 0.5, CapacityValue(10), FLOOR).await.unwrap();
        assert_eq!(store.get_alarm("a").unwrap().unwrap(), original);
    }

    #[tokio::test]
    async fn missing_alarm_is_a_configuration_error() {
        let store = StateStore::open_in_memory().unwrap();
        let err = publish(&store, "nope", 0.8, CapacityValue(5), FLOOR)
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::AlarmNotFound(name) if name == "nope"));
    }
}
