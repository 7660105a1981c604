use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use engine_core::duration;
use engine_core::{EngineError, Registry, TaskError};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::adapter::ClusterAdapter;
use super::{Runnable, ResultExt};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckObjParams {
    #[serde(rename = "refTaskId")]
    pub ref_task_id: String,
    pub expect: HashMap<String, serde_json::Value>,
    #[serde(default, deserialize_with = "duration::deserialize_opt")]
    pub timeout: Option<Duration>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Fetches each referenced object and compares selected dotted-path
/// fields against an expected value map, optionally polling until match
/// or timeout.
pub struct CheckObj {
    id: String,
    params: CheckObjParams,
    registry: Arc<Registry>,
    adapter: Arc<dyn ClusterAdapter>,
}

impl CheckObj {
    const KIND: &'static str = "CheckObj";

    pub fn new(
        id: String,
        params: CheckObjParams,
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

    fn matches(&self, name: &str, object: &serde_json::Value) -> Result<(), EngineError> {
        for (path, expected) in &self.params.expect {
            let actual = get_path(object, path);
            if actual != Some(expected) {
                return Err(EngineError::VerificationMismatch(format!(
                    "object `{name}` field `{path}` is {actual:?}, expected {expected:?}"
                )));
            }
        }
        Ok(())
    }

    async fn check_once(&self, gvr: &engine_core::Gvr, namespace: &str, name: &str) -> Result<(), EngineError> {
        let object = self.adapter.get_object(gvr, namespace, name).await?;
        self.matches(name, &object)
    }
}

fn get_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.').try_fold(value, |cur, segment| cur.get(segment))
}

#[async_trait]
impl Runnable for CheckObj {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, cancel: CancellationToken) -> Result<(), TaskError> {
        let obj = self.registry.get(&self.params.ref_task_id).ctx(Self::KIND, &self.id)?;
        let timeout = self.params.timeout.unwrap_or_default();

        if timeout.is_zero() {
            for name in &obj.names {
                self.check_once(&obj.gvr, &obj.namespace, name)
                    .await
                    .ctx(Self::KIND, &self.id)?;
            }
            return Ok(());
        }

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        'outer: loop {
            let mut all_ok = true;
            for name in &obj.names {
                match self.check_once(&obj.gvr, &obj.namespace, name).await {
                    Ok(()) => {}
                    Err(EngineError::VerificationMismatch(_)) => {
                        all_ok = false;
                        break;
                    }
                    Err(e) => return Err(e).ctx(Self::KIND, &self.id),
                }
            }
            if all_ok {
                return Ok(());
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(EngineError::Canceled).ctx(Self::KIND, &self.id),
                _ = &mut deadline => return Err(EngineError::timeout(timeout)).ctx(Self::KIND, &self.id),
                _ = tokio::time::sleep(POLL_INTERVAL) => continue 'outer,
            }
        }
    }
}
