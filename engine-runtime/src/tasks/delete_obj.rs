use std::sync::Arc;

use async_trait::async_trait;
use engine_core::{Registry, TaskError};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::adapter::ClusterAdapter;
use super::{Runnable, ResultExt};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteObjParams {
    #[serde(rename = "refTaskId")]
    pub ref_task_id: String,
}

/// Deletes every object named in the referenced `ObjInfo`. Deleting an
/// already-absent object is treated as success by the adapter, so this
/// task never distinguishes "already gone" from "just deleted".
pub struct DeleteObj {
    id: String,
    params: DeleteObjParams,
    registry: Arc<Registry>,
    adapter: Arc<dyn ClusterAdapter>,
}

impl DeleteObj {
    const KIND: &'static str = "DeleteObj";

    pub fn new(
        id: String,
        params: DeleteObjParams,
        registry: Arc<Registry>,
        adapter: Arc<dyn ClusterAdapter>,
    ) -> Self {
        Self {
            id,
            params,
            registry,
            adapter,
        }
    }
}

#[async_trait]
impl Runnable for DeleteObj {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, _cancel: CancellationToken) -> Result<(), TaskError> {
        let obj = self.registry.get(&self.params.ref_task_id).ctx(Self::KIND, &self.id)?;
        for name in &obj.names {
            self.adapter
                .delete_object(&obj.gvr, &obj.namespace, name)
                .await
                .ctx(Self::KIND, &self.id)?;
        }
        Ok(())
    }
}
