use std::collections::VecDeque;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::ffmpeg::Invoker;
use crate::task::{Outcome, Task};

/// Counts of what happened during a pool run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// The run was stopped before every task produced an outcome
    pub interrupted: bool,
}

/// Bounded pool of workers that run tasks through an [`Invoker`].
///
/// Workers pull from a shared queue, so each task is attempted exactly once.
/// Outcomes travel over a channel to the caller's task, which hands them to
/// the reporter one at a time; the reporter never runs concurrently with
/// itself. Completion order across tasks is unspecified.
///
/// When the shutdown future passed to [`WorkerPool::run`] completes, every
/// worker is aborted and `run` waits until each in-flight invocation has been
/// dropped before returning.
pub struct WorkerPool<I> {
    invoker: Arc<I>,
    concurrency: NonZeroUsize,
}

impl<I: Invoker> WorkerPool<I> {
    pub fn new(invoker: I, concurrency: NonZeroUsize) -> Self {
        Self {
            invoker: Arc::new(invoker),
            concurrency,
        }
    }

    pub fn concurrency(&self) -> NonZeroUsize {
        self.concurrency
    }

    /// Run every task and report each outcome.
    ///
    /// Returns once all tasks have produced an outcome and it was reported,
    /// or once `shutdown` completes and the workers have been torn down.
    pub async fn run<R, S>(&self, tasks: Vec<Task>, mut report: R, shutdown: S) -> PoolSummary
    where
        R: FnMut(Outcome),
        S: Future<Output = ()>,
    {
        let worker_count = self.concurrency.get().min(tasks.len());
        let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let invoker = Arc::clone(&self.invoker);
            let queue = Arc::clone(&queue);
            let tx = tx.clone();

            workers.spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some(task) = next else {
                        break;
                    };

                    debug!("Worker {} starting: {}", worker_id, task.description);
                    let outcome = invoker.invoke(&task).await;
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        // Only the workers hold senders now; the channel closes when they finish
        drop(tx);

        let mut summary = PoolSummary::default();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                received = rx.recv() => {
                    let Some(outcome) = received else {
                        break;
                    };
                    summary.attempted += 1;
                    if outcome.is_success() {
                        summary.succeeded += 1;
                    } else {
                        summary.failed += 1;
                    }
                    report(outcome);
                }
                _ = &mut shutdown => {
                    warn!("Stopping {} worker(s)", workers.len());
                    summary.interrupted = true;
                    break;
                }
            }
        }

        if summary.interrupted {
            // Aborted workers drop their invocation, which kills its process
            workers.shutdown().await;
            return summary;
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Worker stopped unexpectedly: {}", e);
            }
        }

        summary
    }
}
