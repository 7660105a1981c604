//! The process-wide, mutex-guarded mapping from task identifier to the
//! object(s)/pod(s) that task produced.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::EngineError;
use crate::gvr::Gvr;

/// Record registered by a successful `SubmitObj`, read (never mutated) by
/// every later task that refers back to it via `refTaskId`.
#[derive(Debug, Clone)]
pub struct ObjInfo {
    pub gvr: Gvr,
    pub namespace: String,
    pub names: Vec<String>,
    pub pods: Vec<String>,
}

#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<String, ObjInfo>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `info` under `task_id`. Fails if `task_id` is already present.
    pub fn set(&self, task_id: &str, info: ObjInfo) -> Result<(), EngineError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(task_id) {
            return Err(EngineError::DuplicateId(task_id.to_string()));
        }
        entries.insert(task_id.to_string(), info);
        Ok(())
    }

    /// Fetch the entry registered for `task_id`. Fails if absent.
    pub fn get(&self, task_id: &str) -> Result<ObjInfo, EngineError> {
        self.entries
            .lock()
            .get(task_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownId(task_id.to_string()))
    }

    /// Whether `task_id` has a registered entry, without cloning it.
    pub fn contains(&self, task_id: &str) -> bool {
        self.entries.lock().contains_key(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> ObjInfo {
        ObjInfo {
            gvr: Gvr::new("", "v1", "pods"),
            namespace: "default".to_string(),
            names: vec!["a".to_string()],
            pods: vec![],
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        let registry = Registry::new();
        registry.set("job", info()).unwrap();
        let got = registry.get("job").unwrap();
        assert_eq!(got.names, vec!["a".to_string()]);
    }

    #[test]
    fn set_twice_is_a_duplicate_id() {
        let registry = Registry::new();
        registry.set("job", info()).unwrap();
        let err = registry.set("job", info()).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateId(id) if id == "job"));
    }

    #[test]
    fn get_missing_is_unknown_id() {
        let registry = Registry::new();
        let err = registry.get("missing").unwrap_err();
        assert!(matches!(err, EngineError::UnknownId(id) if id == "missing"));
    }
}
