use std::time::Duration;

use thiserror::Error;

/// Parameter/schema validation failures raised by the decoder and renderer.
///
/// These correspond 1:1 to the `ValidationError(...)` cases called out in
/// the task-engine design: missing fields, type mismatches, malformed
/// range strings, and the `nameformat`-without-`_ENUM_` ambiguity.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("field `{field}` has the wrong type: {reason}")]
    BadType { field: String, reason: String },

    #[error("malformed range `{0}`, expected an inclusive `a-b` integer interval")]
    BadRange(String),

    #[error(
        "nameformat `{nameformat}` does not reference `_ENUM_` but count={count} > 1, \
         which would create colliding object names"
    )]
    DuplicateNames { nameformat: String, count: u32 },
}

/// The engine's closed error taxonomy. Every task-level failure is one of
/// these variants; none are retried by the engine itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("task id `{0}` is already registered")]
    DuplicateId(String),

    #[error("no entry registered for task id `{0}`")]
    UnknownId(String),

    #[error("refTaskId `{0}` has not been registered by an earlier task")]
    UnreferencedRef(String),

    #[error("cluster adapter error: {0}")]
    Adapter(String),

    #[error("verification mismatch: {0}")]
    VerificationMismatch(String),

    #[error("timed out after {after:?}{}", pending_suffix(pods))]
    Timeout { after: Duration, pods: Vec<String> },

    #[error("canceled")]
    Canceled,
}

/// Renders the trailing "pods still pending: [...]" clause for `Timeout`,
/// omitted entirely when no pod identifiers are known (e.g. `CheckObj`'s
/// object-only timeout).
fn pending_suffix(pods: &[String]) -> String {
    if pods.is_empty() {
        String::new()
    } else {
        format!(", pods still pending: {pods:?}")
    }
}

impl EngineError {
    /// A `Timeout` with no pod identifiers attached (object-only waits).
    pub fn timeout(after: Duration) -> Self {
        EngineError::Timeout {
            after,
            pods: Vec::new(),
        }
    }

    /// A `Timeout` naming the pods that never converged, per the
    /// watch-mode error-reporting contract.
    pub fn timeout_with_pods(after: Duration, pods: Vec<String>) -> Self {
        EngineError::Timeout { after, pods }
    }

    /// Attach `task_kind`/`task_id` context, producing the user-visible
    /// error shape required by the engine's error-reporting contract.
    pub fn with_context(self, task_kind: &'static str, task_id: impl Into<String>) -> TaskError {
        TaskError {
            task_kind,
            task_id: task_id.into(),
            source: self,
        }
    }
}

/// A task-level error, carrying the `taskKind/taskID` prefix the driver
/// surfaces to the caller.
#[derive(Debug, Error)]
#[error("{task_kind}/{task_id}: {source}")]
pub struct TaskError {
    pub task_kind: &'static str,
    pub task_id: String,
    #[source]
    pub source: EngineError,
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
