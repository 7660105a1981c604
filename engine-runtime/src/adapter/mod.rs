//! The Cluster API Adapter: a thin abstraction over a dynamic
//! group/version/resource client, a typed pod/node client, and a
//! namespace-scoped pod-event watch factory.

mod kube_adapter;
mod sim;

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use engine_core::{EngineError, Gvr};
use futures::Stream;
use serde::{Deserialize, Serialize};

pub use kube_adapter::KubeAdapter;
pub use sim::SimAdapter;

/// A node taint, as accepted by `UpdateNodes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taint {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    pub effect: String,
}

/// The subset of pod state `CheckPod` needs: identity, phase, and host node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodStatus {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub node_name: Option<String>,
}

/// The subset of node state `CheckPod`'s `nodeLabels` check needs.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub name: String,
    pub labels: HashMap<String, String>,
}

/// A Create or Update event for a watched pod object.
#[derive(Debug, Clone)]
pub enum PodEvent {
    Applied(PodStatus),
    Deleted(PodStatus),
}

pub type PodEventStream =
    Pin<Box<dyn Stream<Item = Result<PodEvent, EngineError>> + Send>>;

/// Abstracts the two cluster-client modes the engine needs: a dynamic
/// client keyed by `Gvr` for arbitrary custom resources, and a typed
/// client for pods and nodes, plus a watch factory for namespace-scoped
/// pod events.
#[async_trait]
pub trait ClusterAdapter: Send + Sync {
    async fn create_object(
        &self,
        gvr: &Gvr,
        namespace: &str,
        manifest: serde_json::Value,
    ) -> Result<(), EngineError>;

    async fn update_object(
        &self,
        gvr: &Gvr,
        namespace: &str,
        name: &str,
        patch: serde_json::Value,
    ) -> Result<(), EngineError>;

    async fn get_object(
        &self,
        gvr: &Gvr,
        namespace: &str,
        name: &str,
    ) -> Result<serde_json::Value, EngineError>;

    /// Idempotent: deleting an already-absent object succeeds.
    async fn delete_object(
        &self,
        gvr: &Gvr,
        namespace: &str,
        name: &str,
    ) -> Result<(), EngineError>;

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodStatus, EngineError>;

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodStatus>, EngineError>;

    async fn get_node(&self, name: &str) -> Result<NodeInfo, EngineError>;

    /// List every node in the cluster, for `UpdateNodes` selector matching.
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>, EngineError>;

    async fn update_node(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
        taints: &[Taint],
    ) -> Result<(), EngineError>;

    /// Subscribe to Create/Update events for pods in `namespace`, with a
    /// periodic resync every `resync`.
    async fn watch_pods(
        &self,
        namespace: &str,
        resync: Duration,
    ) -> Result<PodEventStream, EngineError>;
}
