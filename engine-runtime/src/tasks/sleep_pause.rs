use std::time::Duration;

use async_trait::async_trait;
use engine_core::{duration, EngineError, TaskError};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{Runnable, ResultExt};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SleepParams {
    #[serde(deserialize_with = "duration::deserialize")]
    pub duration: Duration,
}

/// Waits out `duration` or until canceled, whichever comes first.
pub struct Sleep {
    id: String,
    params: SleepParams,
}

impl Sleep {
    const KIND: &'static str = "Sleep";

    pub fn new(id: String, params: SleepParams) -> Self {
        Self { id, params }
    }
}

#[async_trait]
impl Runnable for Sleep {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, cancel: CancellationToken) -> Result<(), TaskError> {
        tokio::select! {
            _ = tokio::time::sleep(self.params.duration) => Ok(()),
            _ = cancel.cancelled() => Err(EngineError::Canceled).ctx(Self::KIND, &self.id),
        }
    }
}

/// Blocks until external cancellation; never completes on its own.
pub struct Pause {
    id: String,
}

impl Pause {
    const KIND: &'static str = "Pause";

    pub fn new(id: String) -> Self {
        Self { id }
    }
}

#[async_trait]
impl Runnable for Pause {
    fn id(&self) -> &str {
        &self.id
    }

    async fn exec(&self, cancel: CancellationToken) -> Result<(), TaskError> {
        cancel.cancelled().await;
        Err(EngineError::Canceled).ctx(Self::KIND, &self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleep_completes_after_duration() {
        let task = Sleep::new(
            "nap".to_string(),
            SleepParams {
                duration: Duration::from_millis(5),
            },
        );
        task.exec(CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn sleep_is_canceled_early() {
        let cancel = CancellationToken::new();
        let task = Sleep::new(
            "nap".to_string(),
            SleepParams {
                duration: Duration::from_secs(600),
            },
        );
        cancel.cancel();
        let err = task.exec(cancel).await.unwrap_err();
        assert!(matches!(err.source, EngineError::Canceled));
    }

    #[tokio::test]
    async fn pause_returns_canceled_once_signaled() {
        let cancel = CancellationToken::new();
        let task = Pause::new("pause".to_string());
        cancel.cancel();
        let err = task.exec(cancel).await.unwrap_err();
        assert!(matches!(err.source, EngineError::Canceled));
    }
}
