//! Operation orchestrator
//!
//! Serializes user-triggered operations: one action at a time, a published
//! status for the banner, and a timed reset back to idle. A second action
//! dispatched while one is running is rejected rather than interleaved, and
//! the auto-reset timer is a cancellable handle owned here, so a stale timer
//! can never clear a newer status.

use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{Error, Result};

/// How long a terminal status stays on the banner before resetting to idle
pub const STATUS_RESET: Duration = Duration::from_secs(3);

/// Status of the most recent operation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationStatus {
    /// No operation pending and nothing to show
    #[default]
    Idle,
    /// An operation is in flight
    Running,
    /// The last operation succeeded; the message is shown on the banner
    Succeeded(String),
    /// The last operation failed; the message is shown on the banner
    Failed(String),
}

impl OperationStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, OperationStatus::Running)
    }
}

/// Single-flight runner for user-triggered operations
pub struct Orchestrator {
    status: Arc<watch::Sender<OperationStatus>>,
    slot: Mutex<()>,
    reset_task: StdMutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new() -> Self {
        let (status, _) = watch::channel(OperationStatus::Idle);
        Self {
            status: Arc::new(status),
            slot: Mutex::new(()),
            reset_task: StdMutex::new(None),
        }
    }

    /// Watch status transitions, e.g. to render a banner
    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.status.subscribe()
    }

    /// The current status
    pub fn status(&self) -> OperationStatus {
        self.status.borrow().clone()
    }

    /// Run one operation through the status machine
    ///
    /// On success the banner shows `success_message` when given, otherwise
    /// the operation's own rendering of its result. On failure the banner
    /// shows the error's message, and the status is updated before the
    /// error is re-signaled to the caller.
    pub async fn run<T, F>(&self, label: &str, action: F, success_message: Option<String>) -> Result<T>
    where
        T: std::fmt::Display,
        F: Future<Output = Result<T>>,
    {
        let _slot = self
            .slot
            .try_lock()
            .map_err(|_| Error::Busy(label.to_string()))?;

        self.cancel_pending_reset();
        self.status.send_replace(OperationStatus::Running);
        info!(operation = label, "operation started");

        match action.await {
            Ok(value) => {
                let message = success_message.unwrap_or_else(|| value.to_string());
                info!(operation = label, %message, "operation succeeded");
                self.finish(OperationStatus::Succeeded(message));
                Ok(value)
            }
            Err(e) => {
                error!(operation = label, error = %e, "operation failed");
                self.finish(OperationStatus::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn cancel_pending_reset(&self) {
        let mut pending = self
            .reset_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(task) = pending.take() {
            task.abort();
        }
    }

    /// Publish a terminal status and arm the reset timer
    fn finish(&self, status: OperationStatus) {
        self.status.send_replace(status);

        let sender = Arc::clone(&self.status);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(STATUS_RESET).await;
            sender.send_replace(OperationStatus::Idle);
        });

        let mut pending = self
            .reset_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *pending = Some(handle);
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::oneshot;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_to_idle_after_three_seconds() {
        let orchestrator = Orchestrator::new();

        let result = orchestrator
            .run("connect", async { Ok("connected".to_string()) }, None)
            .await
            .unwrap();
        assert_eq!(result, "connected");
        assert_eq!(
            orchestrator.status(),
            OperationStatus::Succeeded("connected".to_string())
        );

        // Still showing just before the reset fires
        sleep(Duration::from_millis(2_900)).await;
        assert_eq!(
            orchestrator.status(),
            OperationStatus::Succeeded("connected".to_string())
        );

        sleep(Duration::from_millis(200)).await;
        assert_eq!(orchestrator.status(), OperationStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reports_before_propagating_and_resets() {
        let orchestrator = Orchestrator::new();

        let result: Result<String> = orchestrator
            .run(
                "mint",
                async { Err(Error::Transaction("Minting failed: no funds".to_string())) },
                Some("minted".to_string()),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(
            orchestrator.status(),
            OperationStatus::Failed("Transaction error: Minting failed: no funds".to_string())
        );

        sleep(Duration::from_millis(3_100)).await;
        assert_eq!(orchestrator.status(), OperationStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_message_overrides_return_value() {
        let orchestrator = Orchestrator::new();

        orchestrator
            .run("airdrop", async { Ok("5sig".to_string()) }, Some("Airdrop requested".to_string()))
            .await
            .unwrap();
        assert_eq!(
            orchestrator.status(),
            OperationStatus::Succeeded("Airdrop requested".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_operation_rejected_while_running() {
        let orchestrator = Arc::new(Orchestrator::new());
        let (release, gate) = oneshot::channel::<()>();

        let first = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                orchestrator
                    .run(
                        "create-token",
                        async {
                            let _ = gate.await;
                            Ok("created".to_string())
                        },
                        None,
                    )
                    .await
            })
        };

        // Let the first operation claim the slot
        tokio::task::yield_now().await;
        assert_eq!(orchestrator.status(), OperationStatus::Running);

        let second: Result<String> = orchestrator
            .run("send", async { Ok("sent".to_string()) }, None)
            .await;
        assert!(matches!(second, Err(Error::Busy(ref label)) if label == "send"));

        // The rejected call must not disturb the running status
        assert_eq!(orchestrator.status(), OperationStatus::Running);

        release.send(()).unwrap();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome, "created");
        assert_eq!(
            orchestrator.status(),
            OperationStatus::Succeeded("created".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_run_cancels_superseded_reset_timer() {
        let orchestrator = Orchestrator::new();

        let _: Result<String> = orchestrator
            .run("balance", async { Err(Error::NotConnected) }, None)
            .await;
        assert!(matches!(orchestrator.status(), OperationStatus::Failed(_)));

        // 2 s into the failed status, a new operation starts; the old reset
        // timer (due at 3 s) must not clear the new status at that mark
        sleep(Duration::from_millis(2_000)).await;
        orchestrator
            .run("connect", async { Ok("connected".to_string()) }, None)
            .await
            .unwrap();

        sleep(Duration::from_millis(1_500)).await;
        assert_eq!(
            orchestrator.status(),
            OperationStatus::Succeeded("connected".to_string())
        );

        sleep(Duration::from_millis(1_600)).await;
        assert_eq!(orchestrator.status(), OperationStatus::Idle);
    }
}
