//! Bounded fan-out with a phase deadline
//!
//! Tasks run through `buffer_unordered(workers)` and are consumed as they
//! complete. Each task carries its own identity in its output, so callers
//! can address results even though completion order is arbitrary.
//!
//! When the deadline passes, the stream is dropped: in-flight and unstarted
//! tasks are cancelled and reported as pending. Results gathered so far are
//! kept.

use futures::stream::{self, StreamExt};
use std::future::Future;
use tokio::time::Instant;
use tracing::warn;

/// Results of one fan-out phase
#[derive(Debug)]
pub struct FanOutResult<T> {
    /// Outputs in completion order
    pub completed: Vec<T>,
    /// Tasks that never finished before the deadline
    pub pending: usize,
}

impl<T> FanOutResult<T> {
    pub fn deadline_hit(&self) -> bool {
        self.pending > 0
    }
}

/// Run `task` over every item with at most `workers` in flight
pub async fn run_bounded<I, F, Fut, T>(
    items: I,
    workers: usize,
    deadline: Instant,
    task: F,
) -> FanOutResult<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    let items: Vec<I::Item> = items.into_iter().collect();
    let total = items.len();
    let mut completed = Vec::with_capacity(total);

    let mut results = stream::iter(items).map(task).buffer_unordered(workers.max(1));

    loop {
        match tokio::time::timeout_at(deadline, results.next()).await {
            Ok(Some(output)) => completed.push(output),
            Ok(None) => break,
            Err(_) => {
                warn!(
                    finished = completed.len(),
                    total,
                    "Phase deadline reached, abandoning remaining tasks"
                );
                break;
            }
        }
    }

    let pending = total - completed.len();
    FanOutResult { completed, pending }
}
