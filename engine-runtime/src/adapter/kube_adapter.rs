use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use engine_core::{EngineError, Gvr};
use futures_util::StreamExt;
use k8s_openapi::api::core::v1::{Node, Pod, Taint as K8sTaint};
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject};
use kube::runtime::watcher::{watcher, Config as WatchConfig, Event};
use kube::{Api, Client};
use serde_json::json;

use super::{ClusterAdapter, NodeInfo, PodEvent, PodEventStream, PodStatus, Taint};

/// Production `ClusterAdapter` backed by a live `kube::Client`.
pub struct KubeAdapter {
    client: Client,
}

impl KubeAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn try_default() -> Result<Self, EngineError> {
        let client = Client::try_default()
            .await
            .map_err(|e| EngineError::Adapter(e.to_string()))?;
        Ok(Self::new(client))
    }

    fn api_resource(gvr: &Gvr) -> ApiResource {
        // The engine's GVR carries no explicit `kind`; we derive a
        // reasonable singular kind from the plural resource name for the
        // manifest's `kind`/`apiVersion` fields. The HTTP path only needs
        // group/version/plural, which are exact.
        let kind = guess_kind(&gvr.resource);
        ApiResource {
            group: gvr.group.clone(),
            version: gvr.version.clone(),
            api_version: gvr.api_version(),
            kind,
            plural: gvr.resource.clone(),
        }
    }

    fn dynamic_api(&self, gvr: &Gvr, namespace: &str) -> Api<DynamicObject> {
        let ar = Self::api_resource(gvr);
        Api::namespaced_with(self.client.clone(), namespace, &ar)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }
}

fn guess_kind(resource: &str) -> String {
    let singular = resource.strip_suffix('s').unwrap_or(resource);
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn pod_status(pod: Pod) -> PodStatus {
    let name = pod.metadata.name.unwrap_or_default();
    let namespace = pod.metadata.namespace.unwrap_or_default();
    let phase = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.clone())
        .unwrap_or_default();
    let node_name = pod.spec.as_ref().and_then(|s| s.node_name.clone());
    PodStatus {
        name,
        namespace,
        phase,
        node_name,
    }
}

fn kube_err(e: kube::Error) -> EngineError {
    EngineError::Adapter(e.to_string())
}

fn is_not_found(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(ae) if ae.code == 404)
}

#[async_trait]
impl ClusterAdapter for KubeAdapter {
    async fn create_object(
        &self,
        gvr: &Gvr,
        namespace: &str,
        manifest: serde_json::Value,
    ) -> Result<(), EngineError> {
        let api = self.dynamic_api(gvr, namespace);
        let obj: DynamicObject = serde_json::from_value(manifest)
            .map_err(|e| EngineError::Adapter(format!("invalid manifest: {e}")))?;
        api.create(&PostParams::default(), &obj)
            .await
            .map_err(kube_err)?;
        Ok(())
    }

    async fn update_object(
        &self,
        gvr: &Gvr,
        namespace: &str,
        name: &str,
        patch: serde_json::Value,
    ) -> Result<(), EngineError> {
        let api = self.dynamic_api(gvr, namespace);
        api.patch(
            name,
            &PatchParams::apply("engine-runtime"),
            &Patch::Merge(patch),
        )
        .await
        .map_err(kube_err)?;
        Ok(())
    }

    async fn get_object(
        &self,
        gvr: &Gvr,
        namespace: &str,
        name: &str,
    ) -> Result<serde_json::Value, EngineError> {
        let api = self.dynamic_api(gvr, namespace);
        let obj = api.get(name).await.map_err(kube_err)?;
        serde_json::to_value(obj).map_err(|e| EngineError::Adapter(e.to_string()))
    }

    async fn delete_object(
        &self,
        gvr: &Gvr,
        namespace: &str,
        name: &str,
    ) -> Result<(), EngineError> {
        let api = self.dynamic_api(gvr, namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(kube_err(e)),
        }
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodStatus, EngineError> {
        let pod = self.pods(namespace).get(name).await.map_err(kube_err)?;
        Ok(pod_status(pod))
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodStatus>, EngineError> {
        let list = self
            .pods(namespace)
            .list(&Default::default())
            .await
            .map_err(kube_err)?;
        Ok(list.items.into_iter().map(pod_status).collect())
    }

    async fn get_node(&self, name: &str) -> Result<NodeInfo, EngineError> {
        let node = self.nodes().get(name).await.map_err(kube_err)?;
        let labels = node
            .metadata
            .labels
            .unwrap_or_default()
            .into_iter()
            .collect();
        Ok(NodeInfo {
            name: node.metadata.name.unwrap_or_default(),
            labels,
        })
    }

    async fn list_nodes(&self) -> Result<Vec<NodeInfo>, EngineError> {
        let list = self.nodes().list(&Default::default()).await.map_err(kube_err)?;
        Ok(list
            .items
            .into_iter()
            .map(|node| NodeInfo {
                name: node.metadata.name.unwrap_or_default(),
                labels: node.metadata.labels.unwrap_or_default().into_iter().collect(),
            })
            .collect())
    }

    async fn update_node(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
        taints: &[Taint],
    ) -> Result<(), EngineError> {
        let k8s_taints: Vec<K8sTaint> = taints
            .iter()
            .map(|t| K8sTaint {
                key: t.key.clone(),
                value: t.value.clone(),
                effect: t.effect.clone(),
                time_added: None,
            })
            .collect();

        let patch = json!({
            "metadata": { "labels": labels },
            "spec": { "taints": k8s_taints },
        });

        self.nodes()
            .patch(
                name,
                &PatchParams::apply("engine-runtime"),
                &Patch::Merge(patch),
            )
            .await
            .map_err(kube_err)?;
        Ok(())
    }

    async fn watch_pods(
        &self,
        namespace: &str,
        resync: Duration,
    ) -> Result<PodEventStream, EngineError> {
        let api = self.pods(namespace);
        let config = WatchConfig::default().timeout(resync.as_secs() as u32);
        let stream = watcher(api, config).flat_map(|event| {
            let mapped: Vec<Result<PodEvent, EngineError>> = match event {
                // Init/InitDone just bracket the initial-list replay; the
                // adapter's own `list_pods` call already covers that ground,
                // so only the carried objects matter here.
                Ok(Event::Init) | Ok(Event::InitDone) => vec![],
                Ok(Event::InitApply(pod)) | Ok(Event::Apply(pod)) => {
                    vec![Ok(PodEvent::Applied(pod_status(pod)))]
                }
                Ok(Event::Delete(pod)) => vec![Ok(PodEvent::Deleted(pod_status(pod)))],
                Err(e) => vec![Err(EngineError::Adapter(e.to_string()))],
            };
            futures::stream::iter(mapped)
        });
        Ok(Box::pin(stream))
    }
}
