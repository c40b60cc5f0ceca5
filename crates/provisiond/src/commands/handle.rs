use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use tracing::{error, info};

use provisioner_aws::AwsBackend;
use provisioner_control::{ControlReport, Controller};
use provisioner_core::{CapacityEvent, ProvisionerConfig};

use super::open_store;

/// Run every event in the payload against DynamoDB and CloudWatch.
pub async fn aws(event_path: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let policy = config.policy().context("resolving control policy")?;
    let events = read_events(event_path)?;

    let backend = AwsBackend::load(&config.aws.clone().unwrap_or_default()).await;
    let controller = Controller::new(
        Arc::new(backend.cloudwatch.clone()),
        Arc::new(backend.capacity),
        Arc::new(backend.cloudwatch),
    )
    .with_policy(policy);

    run(&controller, &events, None).await
}

/// Run every event in the payload against the local redb backend.
pub async fn local(
    data_dir: &Path,
    event_path: &Path,
    config_path: Option<&Path>,
    now: Option<u64>,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let policy = config.policy().context("resolving control policy")?;
    let events = read_events(event_path)?;

    let store = open_store(data_dir)?;
    let controller = Controller::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store),
    )
    .with_policy(policy);

    run(&controller, &events, now).await
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ProvisionerConfig> {
    match path {
        Some(path) => ProvisionerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ProvisionerConfig::default()),
    }
}

fn read_events(path: &Path) -> anyhow::Result<Vec<CapacityEvent>> {
    let payload = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading event {}", path.display()))?
    };

    let events = CapacityEvent::parse_all(&payload).context("parsing alarm event")?;
    if events.is_empty() {
        anyhow::bail!("payload contains no alarm events");
    }
    info!(events = events.len(), "alarm events parsed");
    Ok(events)
}

async fn run(
    controller: &Controller,
    events: &[CapacityEvent],
    now: Option<u64>,
) -> anyhow::Result<()> {
    let policy = controller.policy();
    info!(
        events = events.len(),
        surplus_factor = policy.surplus_factor,
        window_secs = policy.window_secs,
        bands = policy.bands.len(),
        "handling alarm events"
    );

    let mut failed = 0usize;
    for event in events {
        let result = match now {
            Some(now) => controller.handle_at(event, now).await,
            None => controller.handle(event).await,
        };
        match result {
            Ok(report) => println!("{}", summary(&report)),
            Err(err) => {
                failed += 1;
                error!(
                    resource = %event.resource,
                    metric = %event.metric.metric_name,
                    alarm = event.alarm_name.as_deref().unwrap_or(""),
                    error = %err,
                    "event failed"
                );
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} event(s) failed", events.len());
    }
    Ok(())
}

/// One JSON line per handled event on stdout.
fn summary(report: &ControlReport) -> serde_json::Value {
    json!({
        "resource": report.resource.to_string(),
        "direction": report.direction.to_string(),
        "sample": report.sample.map(|s| s.value),
        "target": report.target.get(),
        "read_capacity_units": report.throughput.read_capacity_units,
        "write_capacity_units": report.throughput.write_capacity_units,
        "thresholds": report
            .thresholds
            .iter()
            .map(|t| json!({
                "band": t.band,
                "alarm_name": t.alarm_name,
                "threshold": t.threshold,
            }))
            .collect::<Vec<_>>(),
    })
}
