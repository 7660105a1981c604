//! An in-memory fake `ClusterAdapter`, used by the engine's own test
//! suite and by embedders that want to dry-run a task list without a
//! live cluster (the "simulation mode" called out for the adapter).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use engine_core::{EngineError, Gvr};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::{ClusterAdapter, NodeInfo, PodEvent, PodEventStream, PodStatus, Taint};

type ObjectKey = (Gvr, String, String);

pub struct SimAdapter {
    objects: Mutex<HashMap<ObjectKey, serde_json::Value>>,
    pods: Mutex<HashMap<(String, String), PodStatus>>,
    nodes: Mutex<HashMap<String, NodeInfo>>,
    pod_events: broadcast::Sender<(String, PodEvent)>,
}

impl Default for SimAdapter {
    fn default() -> Self {
        let (pod_events, _) = broadcast::channel(1024);
        Self {
            objects: Mutex::new(HashMap::new()),
            pods: Mutex::new(HashMap::new()),
            nodes: Mutex::new(HashMap::new()),
            pod_events,
        }
    }
}

impl SimAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/embedding helper: insert or update a pod and notify watchers.
    pub fn put_pod(&self, status: PodStatus) {
        let key = (status.namespace.clone(), status.name.clone());
        self.pods.lock().insert(key, status.clone());
        let _ = self
            .pod_events
            .send((status.namespace.clone(), PodEvent::Applied(status)));
    }

    /// Test/embedding helper: register a node's labels.
    pub fn put_node(&self, node: NodeInfo) {
        self.nodes.lock().insert(node.name.clone(), node);
    }
}

#[async_trait]
impl ClusterAdapter for SimAdapter {
    async fn create_object(
        &self,
        gvr: &Gvr,
        namespace: &str,
        manifest: serde_json::Value,
    ) -> Result<(), EngineError> {
        let name = manifest
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(|n| n.as_str())
            .ok_or_else(|| EngineError::Adapter("manifest missing metadata.name".to_string()))?
            .to_string();
        let key = (gvr.clone(), namespace.to_string(), name);
        self.objects.lock().insert(key, manifest);
        Ok(())
    }

    async fn update_object(
        &self,
        gvr: &Gvr,
        namespace: &str,
        name: &str,
        patch: serde_json::Value,
    ) -> Result<(), EngineError> {
        let key = (gvr.clone(), namespace.to_string(), name.to_string());
        let mut objects = self.objects.lock();
        let existing = objects
            .get_mut(&key)
            .ok_or_else(|| EngineError::Adapter(format!("object `{name}` not found")))?;
        merge_json(existing, &patch);
        Ok(())
    }

    async fn get_object(
        &self,
        gvr: &Gvr,
        namespace: &str,
        name: &str,
    ) -> Result<serde_json::Value, EngineError> {
        let key = (gvr.clone(), namespace.to_string(), name.to_string());
        self.objects
            .lock()
            .get(&key)
            .cloned()
            .ok_or_else(|| EngineError::Adapter(format!("object `{name}` not found")))
    }

    async fn delete_object(
        &self,
        gvr: &Gvr,
        namespace: &str,
        name: &str,
    ) -> Result<(), EngineError> {
        let key = (gvr.clone(), namespace.to_string(), name.to_string());
        self.objects.lock().remove(&key);
        Ok(())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodStatus, EngineError> {
        self.pods
            .lock()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| EngineError::Adapter(format!("pod `{name}` not found")))
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodStatus>, EngineError> {
        Ok(self
            .pods
            .lock()
            .values()
            .filter(|p| p.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn get_node(&self, name: &str) -> Result<NodeInfo, EngineError> {
        self.nodes
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::Adapter(format!("node `{name}` not found")))
    }

    async fn list_nodes(&self) -> Result<Vec<NodeInfo>, EngineError> {
        Ok(self.nodes.lock().values().cloned().collect())
    }

    async fn update_node(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
        _taints: &[Taint],
    ) -> Result<(), EngineError> {
        let mut nodes = self.nodes.lock();
        let node = nodes
            .entry(name.to_string())
            .or_insert_with(|| NodeInfo {
                name: name.to_string(),
                labels: HashMap::new(),
            });
        node.labels.extend(labels.clone());
        Ok(())
    }

    async fn watch_pods(
        &self,
        namespace: &str,
        _resync: Duration,
    ) -> Result<PodEventStream, EngineError> {
        let rx = self.pod_events.subscribe();
        let namespace = namespace.to_string();
        let stream = BroadcastStream::new(rx).filter_map(move |item| {
            let namespace = namespace.clone();
            async move {
                match item {
                    Ok((event_ns, event)) if event_ns == namespace => Some(Ok(event)),
                    Ok(_) => None,
                    Err(_lagged) => None,
                }
            }
        });
        Ok(Box::pin(stream))
    }
}

fn merge_json(base: &mut serde_json::Value, patch: &serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                merge_json(
                    base_map.entry(key.clone()).or_insert(serde_json::Value::Null),
                    value,
                );
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gvr() -> Gvr {
        Gvr::new("", "v1", "widgets")
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let adapter = SimAdapter::new();
        let manifest = json!({"metadata": {"name": "a"}, "spec": {"x": 1}});
        adapter
            .create_object(&gvr(), "default", manifest.clone())
            .await
            .unwrap();
        let got = adapter.get_object(&gvr(), "default", "a").await.unwrap();
        assert_eq!(got, manifest);
    }

    #[tokio::test]
    async fn delete_missing_object_is_idempotent() {
        let adapter = SimAdapter::new();
        adapter
            .delete_object(&gvr(), "default", "missing")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_merges_onto_existing_object() {
        let adapter = SimAdapter::new();
        let manifest = json!({"metadata": {"name": "a"}, "spec": {"x": 1, "y": 1}});
        adapter
            .create_object(&gvr(), "default", manifest)
            .await
            .unwrap();
        adapter
            .update_object(&gvr(), "default", "a", json!({"spec": {"x": 2}}))
            .await
            .unwrap();
        let got = adapter.get_object(&gvr(), "default", "a").await.unwrap();
        assert_eq!(got["spec"]["x"], 2);
        assert_eq!(got["spec"]["y"], 1);
    }
}
