//! Loads a task-list YAML file from disk and drives it through the
//! engine. Not a general CLI: one positional argument, the path to the
//! task list. Set `ENGINE_DEMOS_SIM=1` to run against the in-memory
//! simulation adapter instead of a live cluster.

use std::path::PathBuf;
use std::sync::Arc;

use engine_core::TaskConfig;
use engine_runtime::{ClusterAdapter, Driver, KubeAdapter, SimAdapter};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: run-scenario <task-list.yaml>"))?;
    let path = PathBuf::from(path);

    let config = TaskConfig::from_file(&path)?;
    let base_dir = path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let adapter: Arc<dyn ClusterAdapter> = if std::env::var("ENGINE_DEMOS_SIM").is_ok() {
        tracing::info!("running against the in-memory simulation adapter");
        Arc::new(SimAdapter::new())
    } else {
        Arc::new(KubeAdapter::try_default().await?)
    };

    let driver = Driver::new(adapter, base_dir);

    let cancel = CancellationToken::new();
    let driver_cancel = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::warn!("received interrupt, canceling the run");
        driver_cancel.cancel();
    });

    driver.run(&config, cancel).await?;
    tracing::info!(scenario = %config.name, "scenario completed successfully");
    Ok(())
}
