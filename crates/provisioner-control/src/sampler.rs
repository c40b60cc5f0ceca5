//! Recent metric samples.

use tracing::debug;

use provisioner_core::{MetricIdentity, MetricSource, RemoteResult, Sample, Statistic};

/// Latest `Average` of `identity` over the last `2 × window_secs` ending at `now`.
///
/// `Ok(None)` when the series has no datapoints in range; a cold metric
/// is an expected outcome, not an error.
pub async fn sample(
    source: &dyn MetricSource,
    identity: &MetricIdentity,
    window_secs: u64,
    now: u64,
) -> RemoteResult<Option<Sample>> {
    sample_statistic(source, identity, Statistic::Average, window_secs, now).await
}

/// Like [`sample`] for an arbitrary statistic.
pub async fn sample_statistic(
    source: &dyn MetricSource,
    identity: &MetricIdentity,
    statistic: Statistic,
    window_secs: u64,
    now: u64,
) -> RemoteResult<Option<Sample>> {
    let start = now.saturating_sub(window_secs.saturating_mul(2));
    let datapoints = source
        .statistics(identity, statistic, start, now, window_secs)
        .await?;

    debug!(
        metric = %identity.metric_name,
        %statistic,
        start,
        end = now,
        datapoints = datapoints.len(),
        "metric statistics fetched"
    );

    Ok(datapoints
        .into_iter()
        .max_by_key(|p| p.timestamp)
        .map(|p| Sample {
            value: p.value,
            period_secs: window_secs,
        }))
}
