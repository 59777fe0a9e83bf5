//! Deadline races for suspension points.
//!
//! The future runs on its own task and is raced against a timer. When the
//! timer wins the task is abandoned, not aborted: it may still finish in the
//! background, and its output is dropped with the detached handle.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeadlineError {
    #[error("deadline of {}ms elapsed", .0.as_millis())]
    Elapsed(Duration),

    #[error("task failed: {0}")]
    Panicked(String),
}

/// Run `fut` on a new task and wait at most `limit` for it.
pub async fn spawn_with_deadline<F>(limit: Duration, fut: F) -> Result<F::Output, DeadlineError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handle = tokio::spawn(fut);
    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(join_err)) => Err(DeadlineError::Panicked(describe_join_error(join_err))),
        Err(_) => Err(DeadlineError::Elapsed(limit)),
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(msg) = payload.downcast_ref::<&str>() {
            return (*msg).to_string();
        }
        if let Some(msg) = payload.downcast_ref::<String>() {
            return msg.clone();
        }
        return "task panicked".to_string();
    }
    "task was cancelled".to_string()
}
