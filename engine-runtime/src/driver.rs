//! The Engine Driver: owns the Registry, constructs tasks through the
//! Factory, runs them strictly in order, and always invokes `reset()`
//! exactly once regardless of outcome.

use std::path::PathBuf;
use std::sync::Arc;

use engine_core::{Registry, TaskConfig, TaskError};
use tokio_util::sync::CancellationToken;

use crate::adapter::ClusterAdapter;
use crate::factory::Factory;

pub struct Driver {
    registry: Arc<Registry>,
    adapter: Arc<dyn ClusterAdapter>,
    base_dir: PathBuf,
}

impl Driver {
    pub fn new(adapter: Arc<dyn ClusterAdapter>, base_dir: PathBuf) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            adapter,
            base_dir,
        }
    }

    /// The Registry this run populates; exposed so embedders can inspect
    /// produced objects/pods after a run completes.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Runs every task in `config.tasks` strictly in order, aborting on
    /// the first failure, then invokes `reset()` exactly once. If both
    /// execution and reset fail, the execution error is surfaced.
    pub async fn run(&self, config: &TaskConfig, cancel: CancellationToken) -> Result<(), TaskError> {
        let exec_result = self.run_tasks(config, cancel).await;
        let reset_result = self.reset();
        match (exec_result, reset_result) {
            (Err(e), _) => Err(e),
            (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    async fn run_tasks(&self, config: &TaskConfig, cancel: CancellationToken) -> Result<(), TaskError> {
        let factory = Factory::new(self.registry.clone(), self.adapter.clone(), self.base_dir.clone());

        for descriptor in &config.tasks {
            tracing::debug!(task_id = %descriptor.id, task_kind = %descriptor.kind, "building task");
            let task = factory.build(descriptor)?;

            tracing::info!(task_id = %descriptor.id, task_kind = %descriptor.kind, "executing task");
            match task.exec(cancel.clone()).await {
                Ok(()) => {
                    tracing::info!(task_id = %descriptor.id, "task succeeded");
                }
                Err(e) => {
                    tracing::error!(task_id = %descriptor.id, error = %e, "task failed");
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Teardown hook invoked exactly once at the end of every run. A
    /// no-op placeholder today; kept as a contract point for future
    /// bulk-object cleanup.
    fn reset(&self) -> Result<(), TaskError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SimAdapter;
    use engine_core::EngineError;

    #[tokio::test]
    async fn unreferenced_ref_aborts_before_any_execution() {
        let adapter: Arc<dyn ClusterAdapter> = Arc::new(SimAdapter::new());
        let driver = Driver::new(adapter, PathBuf::from("."));

        let config = TaskConfig::from_yaml_str(
            r#"
name: demo
tasks:
  - id: check
    type: CheckPod
    params:
      refTaskId: missing
      status: Completed
"#,
        )
        .unwrap();

        let err = driver.run(&config, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err.source, EngineError::UnreferencedRef(_)));
    }

    #[tokio::test]
    async fn duplicate_id_fails_on_second_submit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("manifest.yaml"), "metadata:\n  name: x\n").unwrap();

        let adapter: Arc<dyn ClusterAdapter> = Arc::new(SimAdapter::new());
        let driver = Driver::new(adapter, dir.path().to_path_buf());

        let config = TaskConfig::from_yaml_str(
            r#"
name: demo
tasks:
  - id: x
    type: SubmitObj
    params:
      count: 1
      grv: { group: "", version: v1, resource: widgets }
      template: manifest.yaml
      nameformat: "static-name"
  - id: x
    type: SubmitObj
    params:
      count: 1
      grv: { group: "", version: v1, resource: widgets }
      template: manifest.yaml
      nameformat: "static-name-2"
"#,
        )
        .unwrap();

        let err = driver.run(&config, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err.source, EngineError::DuplicateId(_)));
    }
}
