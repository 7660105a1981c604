use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use engine_core::error::ValidationError;
use engine_core::render::{self, Bindings};
use engine_core::{EngineError, Gvr, ObjInfo, Registry, TaskError};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::adapter::ClusterAdapter;
use super::{Runnable, ResultExt};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitObjParams {
    pub count: u32,
    // Matches the field name used by the task-list schema.
    pub grv: Gvr,
    pub template: PathBuf,
    pub nameformat: String,
    #[serde(default)]
    pub overrides: HashMap<String, String>,
    #[serde(default)]
    pub pods: Option<render::PodsSpec>,
    pub namespace: Option<String>,
}

/// Submits `count` newly-named objects, each optionally carrying an
/// expected pod-name enumeration, and registers the result under its own
/// task id.
pub struct SubmitObj {
    id: String,
    params: SubmitObjParams,
    registry: Arc<Registry>,
    adapter: Arc<dyn ClusterAdapter>,
    base_dir: PathBuf,
}

impl SubmitObj {
    const KIND: &'static str = "SubmitObj";

    pub fn new(
        id: String,
        params: SubmitObjParams,
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

    fn validate(&self) -> Result<(), EngineError> {
        if self.params.count < 1 {
            return Err(EngineError::Validation(ValidationError::BadType {
                field: "count".to_string(),
                reason: "count must be >= 1".to_string(),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl Runnable for SubmitObj {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, _cancel: CancellationToken) -> Result<(), TaskError> {
        self.validate().ctx(Self::KIND, &self.id)?;

        let namespace = self
            .params
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string());

        let template_path = self.base_dir.join(&self.params.template);
        let template_text = std::fs::read_to_string(&template_path).map_err(|e| {
            EngineError::Adapter(format!(
                "reading template `{}`: {e}",
                template_path.display()
            ))
        }).ctx(Self::KIND, &self.id)?;

        let names = render::name_format(&self.params.nameformat, self.params.count)
            .ctx(Self::KIND, &self.id)?;

        let mut created = Vec::with_capacity(names.len());
        let mut expected_pods = Vec::new();

        for (i, name) in names.iter().enumerate() {
            let mut param_bindings = Bindings::new();
            param_bindings.insert(render::NAME_PLACEHOLDER.to_string(), name.clone());
            param_bindings.insert(render::ENUM_PLACEHOLDER.to_string(), i.to_string());
            param_bindings.insert("namespace".to_string(), namespace.clone());
            let bindings = render::merge(&param_bindings, &self.params.overrides);

            let manifest_text = render::render(&template_text, &bindings);
            let manifest: serde_json::Value = serde_yaml::from_str(&manifest_text)
                .map_err(|e| EngineError::Adapter(format!("parsing rendered manifest: {e}")))
                .ctx(Self::KIND, &self.id)?;

            self.adapter
                .create_object(&self.params.grv, &namespace, manifest)
                .await
                .ctx(Self::KIND, &self.id)?;

            created.push(name.clone());

            if let Some(pods_spec) = &self.params.pods {
                let pod_names = render::enumerate_pods(name, pods_spec, &self.params.overrides)
                    .ctx(Self::KIND, &self.id)?;
                expected_pods.extend(pod_names);
            }
        }

        self.registry
            .set(
                &self.id,
                ObjInfo {
                    gvr: self.params.grv.clone(),
                    namespace,
                    names: created,
                    pods: expected_pods,
                },
            )
            .ctx(Self::KIND, &self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SimAdapter;
    use std::io::Write;

    fn params(template_path: PathBuf) -> SubmitObjParams {
        SubmitObjParams {
            count: 1,
            grv: Gvr::new("", "v1", "widgets"),
            template: template_path,
            nameformat: "j{{._ENUM_}}".to_string(),
            overrides: HashMap::new(),
            pods: Some(render::PodsSpec {
                range: render::PodRange {
                    pattern: "{{._NAME_}}-test-{{._INDEX_}}".to_string(),
                    ranges: vec!["0-1".to_string()],
                },
            }),
            namespace: None,
        }
    }

    #[tokio::test]
    async fn registers_obj_info_with_enumerated_pods() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("manifest.yaml");
        let mut file = std::fs::File::create(&template_path).unwrap();
        writeln!(file, "metadata:\n  name: {{{{._NAME_}}}}\n  namespace: {{{{.namespace}}}}").unwrap();

        let registry = Arc::new(Registry::new());
        let adapter: Arc<dyn ClusterAdapter> = Arc::new(SimAdapter::new());
        let task = SubmitObj::new(
            "job".to_string(),
            params(PathBuf::from("manifest.yaml")),
            registry.clone(),
            adapter,
            dir.path().to_path_buf(),
        );

        task.exec(CancellationToken::new()).await.unwrap();

        let info = registry.get("job").unwrap();
        assert_eq!(info.names, vec!["j0".to_string()]);
        assert_eq!(
            info.pods,
            vec!["j0-test-0".to_string(), "j0-test-1".to_string()]
        );
    }

    #[tokio::test]
    async fn overrides_win_over_computed_namespace_binding() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("manifest.yaml");
        let mut file = std::fs::File::create(&template_path).unwrap();
        writeln!(file, "metadata:\n  name: {{{{._NAME_}}}}\n  namespace: {{{{.namespace}}}}").unwrap();

        let registry = Arc::new(Registry::new());
        let adapter = Arc::new(SimAdapter::new());
        let mut p = params(PathBuf::from("manifest.yaml"));
        p.pods = None;
        p.overrides = HashMap::from([("namespace".to_string(), "custom-ns".to_string())]);
        let task = SubmitObj::new(
            "job".to_string(),
            p,
            registry.clone(),
            adapter.clone() as Arc<dyn ClusterAdapter>,
            dir.path().to_path_buf(),
        );

        task.exec(CancellationToken::new()).await.unwrap();

        // The task's own namespace field still governs where the object is
        // created, but the rendered manifest body reflects the override.
        let info = registry.get("job").unwrap();
        assert_eq!(info.namespace, "default");
        let created = adapter
            .get_object(&Gvr::new("", "v1", "widgets"), "default", "j0")
            .await
            .unwrap();
        assert_eq!(created["metadata"]["namespace"], "custom-ns");
    }

    #[tokio::test]
    async fn zero_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(Registry::new());
        let adapter: Arc<dyn ClusterAdapter> = Arc::new(SimAdapter::new());
        let mut p = params(PathBuf::from("missing.yaml"));
        p.count = 0;
        let task = SubmitObj::new(
            "job".to_string(),
            p,
            registry,
            adapter,
            dir.path().to_path_buf(),
        );
        let err = task.exec(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.task_kind, "SubmitObj");
    }
}
