use std::path::Path;

use anyhow::Context;
use tracing::info;

use provisioner_state::Fixture;

use super::open_store;

pub fn seed(data_dir: &Path, fixture_path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(fixture_path)
        .with_context(|| format!("reading fixture {}", fixture_path.display()))?;
    let fixture: Fixture = serde_json::from_str(&content)
        .with_context(|| format!("parsing fixture {}", fixture_path.display()))?;

    let store = open_store(data_dir)?;
    store.load_fixture(&fixture).context("loading fixture")?;

    info!(
        tables = fixture.tables.len(),
        alarms = fixture.alarms.len(),
        series = fixture.datapoints.len(),
        "fixture loaded"
    );
    Ok(())
}
