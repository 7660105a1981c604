use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use engine_core::render::{self, Bindings};
use engine_core::{EngineError, Registry, TaskError};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::adapter::ClusterAdapter;
use super::{Runnable, ResultExt};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateObjParams {
    #[serde(rename = "refTaskId")]
    pub ref_task_id: String,
    pub template: PathBuf,
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

/// Applies a rendered patch manifest to every object named in the
/// referenced `ObjInfo`.
pub struct UpdateObj {
    id: String,
    params: UpdateObjParams,
    registry: Arc<Registry>,
    adapter: Arc<dyn ClusterAdapter>,
    base_dir: PathBuf,
}

impl UpdateObj {
    const KIND: &'static str = "UpdateObj";

    pub fn new(
        id: String,
        params: UpdateObjParams,
        registry: Arc<Registry>,
        adapter: Arc<dyn ClusterAdapter>,
        base_dir: PathBuf,
    ) -> Self {
        Self {
            id,
            params,
            registry,
            adapter,
            base_dir,
        }
    }
}

#[async_trait]
impl Runnable for UpdateObj {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, _cancel: CancellationToken) -> Result<(), TaskError> {
        let obj = self.registry.get(&self.params.ref_task_id).ctx(Self::KIND, &self.id)?;

        let template_path = self.base_dir.join(&self.params.template);
        let template_text = std::fs::read_to_string(&template_path).map_err(|e| {
            EngineError::Adapter(format!(
                "reading template `{}`: {e}",
                template_path.display()
            ))
        }).ctx(Self::KIND, &self.id)?;

        for name in &obj.names {
            let mut param_bindings = Bindings::new();
            param_bindings.insert(render::NAME_PLACEHOLDER.to_string(), name.clone());
            let bindings = render::merge(&param_bindings, &self.params.overrides);

            let patch_text = render::render(&template_text, &bindings);
            let patch: serde_json::Value = serde_yaml::from_str(&patch_text)
                .map_err(|e| EngineError::Adapter(format!("parsing rendered patch: {e}")))
                .ctx(Self::KIND, &self.id)?;

            self.adapter
                .update_object(&obj.gvr, &obj.namespace, name, patch)
                .await
                .ctx(Self::KIND, &self.id)?;
        }

        Ok(())
    }
}
