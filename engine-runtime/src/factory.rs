//! Maps a parsed `TaskDescriptor` onto a freshly constructed, validated
//! `Runnable`, verifying `refTaskId` references against the Registry
//! before the task is ever returned.

use std::path::PathBuf;
use std::sync::Arc;

use engine_core::decode::decode;
use engine_core::{EngineError, Registry, TaskDescriptor, TaskError, TaskKind};

use crate::adapter::ClusterAdapter;
use crate::tasks::{
    CheckObj, CheckObjParams, CheckPod, CheckPodParams, DeleteObj, DeleteObjParams, Pause,
    Runnable, Sleep, SleepParams, SubmitObj, SubmitObjParams, UpdateNodes, UpdateNodesParams,
    UpdateObj, UpdateObjParams,
};

pub struct Factory {
    registry: Arc<Registry>,
    adapter: Arc<dyn ClusterAdapter>,
    base_dir: PathBuf,
}

impl Factory {
    pub fn new(registry: Arc<Registry>, adapter: Arc<dyn ClusterAdapter>, base_dir: PathBuf) -> Self {
        Self {
            registry,
            adapter,
            base_dir,
        }
    }

    pub fn build(&self, descriptor: &TaskDescriptor) -> Result<Box<dyn Runnable>, TaskError> {
        let kind = descriptor.kind.as_str();
        let id = descriptor.id.clone();

        match descriptor.kind {
            TaskKind::SubmitObj => {
                let params: SubmitObjParams = decode(&descriptor.params).with_context(kind, &id)?;
                Ok(Box::new(SubmitObj::new(
                    id,
                    params,
                    self.registry.clone(),
                    self.adapter.clone(),
                    self.base_dir.clone(),
                )))
            }
            TaskKind::UpdateObj => {
                let params: UpdateObjParams = decode(&descriptor.params).with_context(kind, &id)?;
                self.check_ref(&params.ref_task_id, kind, &id)?;
                Ok(Box::new(UpdateObj::new(
                    id,
                    params,
                    self.registry.clone(),
                    self.adapter.clone(),
                    self.base_dir.clone(),
                )))
            }
            TaskKind::CheckObj => {
                let params: CheckObjParams = decode(&descriptor.params).with_context(kind, &id)?;
                self.check_ref(&params.ref_task_id, kind, &id)?;
                Ok(Box::new(CheckObj::new(
                    id,
                    params,
                    self.registry.clone(),
                    self.adapter.clone(),
                )))
            }
            TaskKind::DeleteObj => {
                let params: DeleteObjParams = decode(&descriptor.params).with_context(kind, &id)?;
                self.check_ref(&params.ref_task_id, kind, &id)?;
                Ok(Box::new(DeleteObj::new(
                    id,
                    params,
                    self.registry.clone(),
                    self.adapter.clone(),
                )))
            }
            TaskKind::CheckPod => {
                let params: CheckPodParams = decode(&descriptor.params).with_context(kind, &id)?;
                self.check_ref(&params.ref_task_id, kind, &id)?;
                let task = CheckPod::new(id.clone(), params, self.registry.clone(), self.adapter.clone())
                    .map_err(|e| e.with_context(kind, id))?;
                Ok(Box::new(task))
            }
            TaskKind::UpdateNodes => {
                let params: UpdateNodesParams = decode(&descriptor.params).with_context(kind, &id)?;
                Ok(Box::new(UpdateNodes::new(id, params, self.adapter.clone())))
            }
            TaskKind::Sleep => {
                let params: SleepParams = decode(&descriptor.params).with_context(kind, &id)?;
                Ok(Box::new(Sleep::new(id, params)))
            }
            TaskKind::Pause => Ok(Box::new(Pause::new(id))),
        }
    }

    fn check_ref(&self, ref_task_id: &str, kind: &'static str, id: &str) -> Result<(), TaskError> {
        if !self.registry.contains(ref_task_id) {
            return Err(EngineError::UnreferencedRef(ref_task_id.to_string())
                .with_context(kind, id.to_string()));
        }
        Ok(())
    }
}

trait ContextExt<T> {
    fn with_context(self, kind: &'static str, id: &str) -> Result<T, TaskError>;
}

impl<T> ContextExt<T> for Result<T, EngineError> {
    fn with_context(self, kind: &'static str, id: &str) -> Result<T, TaskError> {
        self.map_err(|e| e.with_context(kind, id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SimAdapter;
    use engine_core::TaskKind as Kind;
    use serde_json::json;

    fn descriptor(id: &str, kind: Kind, params: serde_json::Value) -> TaskDescriptor {
        TaskDescriptor {
            id: id.to_string(),
            kind,
            params,
        }
    }

    #[test]
    fn unreferenced_ref_task_id_fails_fast_at_construction() {
        let registry = Arc::new(Registry::new());
        let adapter: Arc<dyn ClusterAdapter> = Arc::new(SimAdapter::new());
        let factory = Factory::new(registry, adapter, PathBuf::from("."));

        let descriptor = descriptor(
            "check",
            Kind::CheckPod,
            json!({"refTaskId": "missing", "status": "Completed"}),
        );
        let err = factory.build(&descriptor).unwrap_err();
        assert!(matches!(err.source, EngineError::UnreferencedRef(_)));
    }

    #[test]
    fn pause_needs_no_params() {
        let registry = Arc::new(Registry::new());
        let adapter: Arc<dyn ClusterAdapter> = Arc::new(SimAdapter::new());
        let factory = Factory::new(registry, adapter, PathBuf::from("."));
        let descriptor = descriptor("pause", Kind::Pause, serde_json::Value::Null);
        factory.build(&descriptor).unwrap();
    }
}
