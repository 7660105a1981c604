//! The task-list input document: `TaskConfig` / `TaskDescriptor` / `TaskKind`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The closed set of task kinds the engine knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    SubmitObj,
    UpdateObj,
    CheckObj,
    DeleteObj,
    UpdateNodes,
    CheckPod,
    Sleep,
    Pause,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::SubmitObj => "SubmitObj",
            TaskKind::UpdateObj => "UpdateObj",
            TaskKind::CheckObj => "CheckObj",
            TaskKind::DeleteObj => "DeleteObj",
            TaskKind::UpdateNodes => "UpdateNodes",
            TaskKind::CheckPod => "CheckPod",
            TaskKind::Sleep => "Sleep",
            TaskKind::Pause => "Pause",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a task list: `{ id, type, params }`. `params` is kept as
/// an untyped JSON value until the Parameter Decoder re-materializes it
/// into the task-specific typed shape.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// The top-level task-list document.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tasks: Vec<TaskDescriptor>,
}

impl TaskConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, EngineError> {
        serde_yaml::from_str(contents).map_err(|e| {
            EngineError::Validation(crate::error::ValidationError::BadType {
                field: "tasks".to_string(),
                reason: e.to_string(),
            })
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Validation(crate::error::ValidationError::BadType {
                field: "path".to_string(),
                reason: format!("reading `{}`: {e}", path.display()),
            })
        })?;
        Self::from_yaml_str(&contents)
    }
}
