pub mod handle;
pub mod seed;

use std::path::Path;

use anyhow::Context;
use tracing::info;

use provisioner_state::StateStore;

/// Open (creating if needed) the local store under `data_dir`.
pub(crate) fn open_store(data_dir: &Path) -> anyhow::Result<StateStore> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db_path = data_dir.join("provisioner.redb");
    let store = StateStore::open(&db_path)
        .with_context(|| format!("opening state store {}", db_path.display()))?;
    info!(path = ?db_path, "state store opened");
    Ok(store)
}
