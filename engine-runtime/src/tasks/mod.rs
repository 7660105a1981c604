//! The seven concrete task kinds, each implementing `Runnable`.

mod check_obj;
mod check_pod;
mod delete_obj;
mod sleep_pause;
mod submit_obj;
mod update_nodes;
mod update_obj;

pub use check_obj::{CheckObj, CheckObjParams};
pub use check_pod::{CheckPod, CheckPodParams};
pub use delete_obj::{DeleteObj, DeleteObjParams};
pub use sleep_pause::{Pause, Sleep, SleepParams};
pub use submit_obj::{SubmitObj, SubmitObjParams};
pub use update_nodes::{UpdateNodes, UpdateNodesParams};
pub use update_obj::{UpdateObj, UpdateObjParams};

use async_trait::async_trait;
use engine_core::TaskError;
use tokio_util::sync::CancellationToken;

/// Uniform capability every task kind implements; the Factory's only
/// output type and the Driver's only input type.
#[async_trait]
pub trait Runnable: Send + Sync {
    fn id(&self) -> &str;

    /// Executes the task to completion, honoring `cancel` wherever the
    /// task suspends on an adapter call or a timer.
    async fn exec(&self, cancel: CancellationToken) -> Result<(), TaskError>;
}

use engine_core::EngineError;

/// Attaches `task_kind`/`task_id` context to an `EngineError`, the one
/// piece of boilerplate every task's `exec` needs.
pub(crate) trait ResultExt<T> {
    fn ctx(self, task_kind: &'static str, task_id: &str) -> Result<T, TaskError>;
}

impl<T> ResultExt<T> for Result<T, EngineError> {
    fn ctx(self, task_kind: &'static str, task_id: &str) -> Result<T, TaskError> {
        self.map_err(|e| e.with_context(task_kind, task_id.to_string()))
    }
}
