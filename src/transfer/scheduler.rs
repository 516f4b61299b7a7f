//! Bounded-concurrency scheduler shared by the upload and download drivers.
//!
//! Workers pull from a shared monotonic index rather than being handed a
//! pre-split slice of work, so a fast worker naturally picks up more parts
//! than a slow one. First error wins, but only after every worker has
//! drained whatever it already claimed.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;

use crate::error::{Result, TosError};
use crate::transfer::cancel::TransferCancellation;

/// Runs `tasks` through `worker` using up to `concurrency` cooperative workers.
pub struct Scheduler {
    concurrency: usize,
}

impl Scheduler {
    /// Create a scheduler with the given worker concurrency (clamped to at least 1).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Execute `worker` once per item in `tasks`, with at most `concurrency`
    /// items in flight at a time.
    ///
    /// A task that errors does not stop other workers from claiming further
    /// tasks: every task gets attempted (unless cancelled) so the checkpoint
    /// records as many completions as possible, and only the first error
    /// encountered is returned once every worker has drained the queue.
    /// Cancellation short-circuits immediately instead of draining.
    pub async fn run<T, F, Fut>(
        &self,
        tasks: Vec<T>,
        cancellation: TransferCancellation,
        worker: F,
    ) -> Result<()>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if tasks.is_empty() {
            return Ok(());
        }

        let tasks = Arc::new(tasks);
        let index = Arc::new(AtomicUsize::new(0));
        let first_error: Arc<Mutex<Option<TosError>>> = Arc::new(Mutex::new(None));
        let worker = Arc::new(worker);
        let worker_count = self.concurrency.min(tasks.len());

        let mut set = JoinSet::new();
        for _ in 0..worker_count {
            let tasks = tasks.clone();
            let index = index.clone();
            let first_error = first_error.clone();
            let worker = worker.clone();
            let cancellation = cancellation.clone();
            set.spawn(async move {
                loop {
                    if cancellation.is_cancelled() {
                        return Err(TosError::Cancelled);
                    }
                    let i = index.fetch_add(1, Ordering::SeqCst);
                    if i >= tasks.len() {
                        return Ok(());
                    }
                    let task = tasks[i].clone();
                    if let Err(e) = worker(task).await {
                        let mut slot = first_error.lock().unwrap();
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                    }
                }
            });
        }

        let mut terminal_error = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => terminal_error.get_or_insert(e),
                Err(join_err) => terminal_error.get_or_insert(TosError::ClientUsage(format!(
                    "transfer worker panicked: {join_err}"
                ))),
            };
        }

        if let Some(e) = terminal_error {
            return Err(e);
        }

        match first_error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    #[tokio::test]
    async fn runs_every_task_exactly_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let scheduler = Scheduler::new(4);
        let tasks: Vec<u32> = (0..20).collect();
        let seen2 = seen.clone();
        scheduler
            .run(tasks, TransferCancellation::new(), move |task| {
                let seen = seen2.clone();
                async move {
                    seen.lock().unwrap().push(task);
                    Ok(())
                }
            })
            .await
            .unwrap();
        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_task_list_is_ok() {
        let scheduler = Scheduler::new(4);
        scheduler
            .run(Vec::<u32>::new(), TransferCancellation::new(), |_: u32| async { Ok(()) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn first_error_is_propagated() {
        let scheduler = Scheduler::new(2);
        let tasks: Vec<u32> = (0..10).collect();
        let result = scheduler
            .run(tasks, TransferCancellation::new(), |task| async move {
                if task == 3 {
                    Err(TosError::ClientUsage("boom".into()))
                } else {
                    Ok(())
                }
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn keeps_draining_remaining_tasks_after_a_failure() {
        let claimed = Arc::new(AtomicU32::new(0));
        let scheduler = Scheduler::new(1);
        let tasks: Vec<u32> = (0..1000).collect();
        let claimed2 = claimed.clone();
        let result = scheduler
            .run(tasks, TransferCancellation::new(), move |task| {
                let claimed = claimed2.clone();
                async move {
                    claimed.fetch_add(1, Ordering::SeqCst);
                    if task == 0 {
                        Err(TosError::ClientUsage("boom".into()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(claimed.load(Ordering::SeqCst), 1000);
    }

    #[tokio::test]
    async fn first_error_in_claim_order_wins_when_several_tasks_fail() {
        let scheduler = Scheduler::new(1);
        let tasks: Vec<u32> = (0..10).collect();
        let result = scheduler
            .run(tasks, TransferCancellation::new(), move |task| async move {
                if task == 2 || task == 5 {
                    Err(TosError::TransientPart {
                        part_number: task,
                        source: Box::new(TosError::ClientUsage("boom".into())),
                    })
                } else {
                    Ok(())
                }
            })
            .await;
        match result {
            Err(TosError::TransientPart { part_number, .. }) => assert_eq!(part_number, 2),
            other => panic!("expected TransientPart for part 2, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_short_circuits_remaining_tasks() {
        let cancellation = TransferCancellation::new();
        cancellation.cancel();
        let scheduler = Scheduler::new(2);
        let tasks: Vec<u32> = (0..5).collect();
        let result = scheduler
            .run(tasks, cancellation, |_: u32| async { Ok(()) })
            .await;
        assert!(matches!(result, Err(TosError::Cancelled)));
    }
}
