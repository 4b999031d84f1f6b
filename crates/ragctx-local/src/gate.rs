//! Bounded fan-out with order-preserving fan-in.
//!
//! Every task is spawned immediately; a shared semaphore limits how many are past the network
//! boundary at once. Results land in the slot of the task's input index, and a task that
//! errors or panics only poisons its own slot.

use futures_util::future::join_all;
use ragctx_core::{Error, FailureKind, FetchOutcome, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Concurrency gate shared by all tasks of one fan-out.
#[derive(Debug, Clone)]
pub struct Gate {
    sem: Arc<Semaphore>,
    limit: usize,
}

impl Gate {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            sem: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Hold the returned permit for the duration of the network call.
    pub async fn enter(&self) -> Result<OwnedSemaphorePermit> {
        self.sem
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Fetch(format!("concurrency gate closed: {e}")))
    }
}

/// Run `work` for every item, at most `gate.limit()` at a time past [`Gate::enter`].
///
/// Output `i` always belongs to input `i`. Errors and panics inside a task become
/// `[FETCH_ERROR]` outcomes at that index; siblings keep running.
pub async fn fan_out<I, F, Fut>(items: Vec<I>, gate: &Gate, work: F) -> Vec<FetchOutcome>
where
    I: Send + 'static,
    F: Fn(usize, I, Gate) -> Fut,
    Fut: Future<Output = Result<FetchOutcome>> + Send + 'static,
{
    let handles = items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| tokio::spawn(work(idx, item, gate.clone())))
        .collect::<Vec<_>>();

    join_all(handles)
        .await
        .into_iter()
        .enumerate()
        .map(|(idx, joined)| match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(task = idx, error = %e, "task failed");
                FetchOutcome::failed(FailureKind::FetchError, e.to_string())
            }
            Err(e) => {
                tracing::warn!(task = idx, error = %e, "task panicked or was cancelled");
                FetchOutcome::failed(FailureKind::FetchError, format!("task aborted: {e}"))
            }
        })
        .collect()
}
