use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use engine_core::TaskError;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::adapter::{ClusterAdapter, Taint};
use super::{Runnable, ResultExt};

type Selector = HashMap<String, String>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateNodesParams {
    pub selectors: Vec<Selector>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub taints: Vec<Taint>,
}

/// Applies label and taint mutations to every node matching any one of
/// `selectors` (a node matches a selector if all of that selector's
/// key/value pairs are present on the node).
pub struct UpdateNodes {
    id: String,
    params: UpdateNodesParams,
    adapter: Arc<dyn ClusterAdapter>,
}

impl UpdateNodes {
    const KIND: &'static str = "UpdateNodes";

    pub fn new(id: String, params: UpdateNodesParams, adapter: Arc<dyn ClusterAdapter>) -> Self {
        Self { id, params, adapter }
    }

    fn matches(&self, node: &crate::adapter::NodeInfo) -> bool {
        self.params
            .selectors
            .iter()
            .any(|selector| selector.iter().all(|(k, v)| node.labels.get(k) == Some(v)))
    }
}

#[async_trait]
impl Runnable for UpdateNodes {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, _cancel: CancellationToken) -> Result<(), TaskError> {
        let nodes = self.adapter.list_nodes().await.ctx(Self::KIND, &self.id)?;
        for node in nodes.iter().filter(|n| self.matches(n)) {
            self.adapter
                .update_node(&node.name, &self.params.labels, &self.params.taints)
                .await
                .ctx(Self::KIND, &self.id)?;
        }
        Ok(())
    }
}
