use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use engine_core::error::ValidationError;
use engine_core::{duration, EngineError, ObjInfo, Registry, TaskError};
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::adapter::{ClusterAdapter, PodEvent, PodStatus};
use super::{Runnable, ResultExt};

/// Resync period for the object-change subscription armed by watch-mode
/// `CheckPod`, per the convergent-wait design.
const RESYNC_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckPodParams {
    #[serde(rename = "refTaskId")]
    pub ref_task_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "nodeLabels")]
    pub node_labels: Option<HashMap<String, String>>,
    #[serde(default, deserialize_with = "duration::deserialize_opt")]
    pub timeout: Option<Duration>,
}

/// The watch-and-verify core: reconciles a shrinking "remaining" set of
/// expected pod names against either a single synchronous Get pass or a
/// deadline-bounded List+Subscribe convergence loop.
pub struct CheckPod {
    id: String,
    params: CheckPodParams,
    registry: Arc<Registry>,
    adapter: Arc<dyn ClusterAdapter>,
}

impl CheckPod {
    const KIND: &'static str = "CheckPod";

    pub fn new(
        id: String,
        params: CheckPodParams,
        registry: Arc<Registry>,
        adapter: Arc<dyn ClusterAdapter>,
    ) -> Result<Self, EngineError> {
        if params.status.is_none() && params.node_labels.is_none() {
            return Err(EngineError::Validation(ValidationError::MissingField(
                "status or nodeLabels".to_string(),
            )));
        }
        Ok(Self {
            id,
            params,
            registry,
            adapter,
        })
    }

    async fn check_node_labels(&self, status: &PodStatus) -> Result<(), EngineError> {
        let Some(required) = &self.params.node_labels else {
            return Ok(());
        };
        if status.phase != "Running" {
            return Ok(());
        }
        let node_name = status.node_name.clone().ok_or_else(|| {
            EngineError::VerificationMismatch(format!(
                "pod `{}` is running but has no assigned node",
                status.name
            ))
        })?;
        let node = self.adapter.get_node(&node_name).await?;
        for (key, value) in required {
            if node.labels.get(key) != Some(value) {
                return Err(EngineError::VerificationMismatch(format!(
                    "node `{node_name}` hosting pod `{}` is missing label `{key}={value}`",
                    status.name
                )));
            }
        }
        Ok(())
    }

    fn check_phase(&self, status: &PodStatus) -> Result<(), EngineError> {
        if let Some(expected) = &self.params.status {
            if &status.phase != expected {
                return Err(EngineError::VerificationMismatch(format!(
                    "pod `{}` has phase `{}`, expected `{expected}`",
                    status.name, status.phase
                )));
            }
        }
        Ok(())
    }

    async fn verify(&self, status: &PodStatus) -> Result<(), EngineError> {
        self.check_phase(status)?;
        self.check_node_labels(status).await
    }

    async fn exec_no_timeout(&self, obj: &ObjInfo) -> Result<(), EngineError> {
        for name in &obj.pods {
            let status = self.adapter.get_pod(&obj.namespace, name).await?;
            self.verify(&status).await?;
        }
        Ok(())
    }

    /// Verifies `status` if its name is still pending, removing it from
    /// `remaining` on success. A redundant update for an already-removed
    /// pod is a no-op, which is what makes running the List and the
    /// Subscription concurrently safe.
    async fn verify_and_remove(
        &self,
        remaining: &Mutex<HashSet<String>>,
        status: &PodStatus,
    ) -> Result<(), EngineError> {
        if !remaining.lock().contains(&status.name) {
            return Ok(());
        }
        self.verify(status).await?;
        remaining.lock().remove(&status.name);
        Ok(())
    }

    async fn exec_watch(
        &self,
        obj: &ObjInfo,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<(), EngineError> {
        let remaining = Mutex::new(obj.pods.iter().cloned().collect::<HashSet<_>>());
        if remaining.lock().is_empty() {
            return Ok(());
        }

        // Arm the subscription before starting the List, so no creation
        // event between the two calls is missed.
        let mut watch_stream = self.adapter.watch_pods(&obj.namespace, RESYNC_PERIOD).await?;

        let (list_tx, mut list_rx) = tokio::sync::mpsc::channel::<PodStatus>(64);
        {
            let adapter = self.adapter.clone();
            let namespace = obj.namespace.clone();
            tokio::spawn(async move {
                if let Ok(pods) = adapter.list_pods(&namespace).await {
                    for pod in pods {
                        let _ = list_tx.send(pod).await;
                    }
                }
            });
        }

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            if remaining.lock().is_empty() {
                return Ok(());
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(EngineError::Canceled),
                _ = &mut deadline => {
                    let pending: Vec<String> = remaining.lock().iter().cloned().collect();
                    return Err(EngineError::timeout_with_pods(timeout, pending));
                }
                event = watch_stream.next() => {
                    match event {
                        Some(Ok(PodEvent::Applied(status))) => {
                            self.verify_and_remove(&remaining, &status).await?;
                        }
                        Some(Ok(PodEvent::Deleted(_))) => {}
                        Some(Err(e)) => return Err(e),
                        None => {}
                    }
                }
                pod = list_rx.recv() => {
                    if let Some(status) = pod {
                        self.verify_and_remove(&remaining, &status).await?;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Runnable for CheckPod {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, cancel: CancellationToken) -> Result<(), TaskError> {
        let obj = self.registry.get(&self.params.ref_task_id).ctx(Self::KIND, &self.id)?;
        if obj.pods.is_empty() {
            return Ok(());
        }

        let timeout = self.params.timeout.unwrap_or_default();
        let result = if timeout.is_zero() {
            self.exec_no_timeout(&obj).await
        } else {
            self.exec_watch(&obj, timeout, cancel).await
        };
        result.ctx(Self::KIND, &self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{NodeInfo, SimAdapter};
    use engine_core::Gvr;

    fn obj_info(pods: Vec<String>) -> ObjInfo {
        ObjInfo {
            gvr: Gvr::new("", "v1", "jobs"),
            namespace: "default".to_string(),
            names: vec!["j0".to_string()],
            pods,
        }
    }

    #[tokio::test]
    async fn rejects_when_neither_status_nor_node_labels_given() {
        let registry = Arc::new(Registry::new());
        let adapter: Arc<dyn ClusterAdapter> = Arc::new(SimAdapter::new());
        let err = CheckPod::new(
            "check".to_string(),
            CheckPodParams {
                ref_task_id: "job".to_string(),
                status: None,
                node_labels: None,
                timeout: None,
            },
            registry,
            adapter,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::MissingField(_))));
    }

    #[tokio::test]
    async fn no_timeout_mode_succeeds_when_every_pod_already_matches() {
        let registry = Arc::new(Registry::new());
        registry.set("job", obj_info(vec!["p0".to_string()])).unwrap();
        let adapter = Arc::new(SimAdapter::new());
        adapter.put_pod(PodStatus {
            name: "p0".to_string(),
            namespace: "default".to_string(),
            phase: "Completed".to_string(),
            node_name: None,
        });

        let task = CheckPod::new(
            "check".to_string(),
            CheckPodParams {
                ref_task_id: "job".to_string(),
                status: Some("Completed".to_string()),
                node_labels: None,
                timeout: None,
            },
            registry,
            adapter,
        )
        .unwrap();
        task.exec(CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn zero_pods_succeeds_instantly() {
        let registry = Arc::new(Registry::new());
        registry.set("job", obj_info(vec![])).unwrap();
        let adapter: Arc<dyn ClusterAdapter> = Arc::new(SimAdapter::new());
        let task = CheckPod::new(
            "check".to_string(),
            CheckPodParams {
                ref_task_id: "job".to_string(),
                status: Some("Completed".to_string()),
                node_labels: None,
                timeout: None,
            },
            registry,
            adapter,
        )
        .unwrap();
        task.exec(CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn watch_mode_converges_on_events_delivered_after_start() {
        let registry = Arc::new(Registry::new());
        registry.set("job", obj_info(vec!["p0".to_string(), "p1".to_string()])).unwrap();
        let adapter = Arc::new(SimAdapter::new());
        adapter.put_pod(PodStatus {
            name: "p0".to_string(),
            namespace: "default".to_string(),
            phase: "Completed".to_string(),
            node_name: None,
        });

        let task = CheckPod::new(
            "check".to_string(),
            CheckPodParams {
                ref_task_id: "job".to_string(),
                status: Some("Completed".to_string()),
                node_labels: None,
                timeout: Some(Duration::from_secs(2)),
            },
            registry,
            adapter.clone(),
        )
        .unwrap();

        let handle = tokio::spawn(async move { task.exec(CancellationToken::new()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        adapter.put_pod(PodStatus {
            name: "p1".to_string(),
            namespace: "default".to_string(),
            phase: "Completed".to_string(),
            node_name: None,
        });

        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn watch_mode_times_out_when_a_pod_never_converges() {
        let registry = Arc::new(Registry::new());
        registry.set("job", obj_info(vec!["p0".to_string()])).unwrap();
        let adapter = Arc::new(SimAdapter::new());
        adapter.put_pod(PodStatus {
            name: "p0".to_string(),
            namespace: "default".to_string(),
            phase: "Pending".to_string(),
            node_name: None,
        });

        let task = CheckPod::new(
            "check".to_string(),
            CheckPodParams {
                ref_task_id: "job".to_string(),
                status: Some("Completed".to_string()),
                node_labels: None,
                timeout: Some(Duration::from_millis(50)),
            },
            registry,
            adapter,
        )
        .unwrap();
        let err = task.exec(CancellationToken::new()).await.unwrap_err();
        match err.source {
            EngineError::Timeout { pods, .. } => assert_eq!(pods, vec!["p0".to_string()]),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn node_label_mismatch_is_reported() {
        let registry = Arc::new(Registry::new());
        registry.set("job", obj_info(vec!["p0".to_string()])).unwrap();
        let adapter = Arc::new(SimAdapter::new());
        adapter.put_node(NodeInfo {
            name: "n1".to_string(),
            labels: HashMap::new(),
        });
        adapter.put_pod(PodStatus {
            name: "p0".to_string(),
            namespace: "default".to_string(),
            phase: "Running".to_string(),
            node_name: Some("n1".to_string()),
        });

        let mut required = HashMap::new();
        required.insert("nodeType".to_string(), "gpu".to_string());
        let task = CheckPod::new(
            "check".to_string(),
            CheckPodParams {
                ref_task_id: "job".to_string(),
                status: Some("Running".to_string()),
                node_labels: Some(required),
                timeout: None,
            },
            registry,
            adapter,
        )
        .unwrap();
        let err = task.exec(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err.source, EngineError::VerificationMismatch(_)));
    }
}
