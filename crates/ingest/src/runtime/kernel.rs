use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{RwLock, Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::warn;

use crate::error::IngestError;
use crate::runtime::{DynCommitSink, DynExecutor, DynQueueObserver};
use crate::types::{ExecutionResult, ExecutionStatus, GroupKey, RuntimeConfig, Task};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelStats {
    pub executed: usize,
    pub retried: usize,
    pub failed: usize,
}

#[derive(Default)]
struct KernelCounters {
    executed: AtomicUsize,
    retried: AtomicUsize,
    failed: AtomicUsize,
}

impl KernelCounters {
    fn snapshot(&self) -> KernelStats {
        KernelStats {
            executed: self.executed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

struct GroupState<P> {
    queue: VecDeque<Task<P>>,
    running: bool,
}

impl<P> Default for GroupState<P> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            running: false,
        }
    }
}

struct KernelShared<P, Op> {
    groups: DashMap<GroupKey, GroupState<P>>,
    /// Exclusive tasks take the write side; group runners hold the read
    /// side for the duration of one task.
    barrier: RwLock<()>,
    in_flight: Semaphore,
    executor: DynExecutor<P, Op>,
    sink: DynCommitSink<Op>,
    observer: DynQueueObserver,
    config: RuntimeConfig,
    counters: KernelCounters,
}

/// Drains the intake channel until it closes, then waits for every group
/// runner to finish its backlog.
///
/// Ordering: tasks of one group are queued FIFO and processed by a single
/// runner at a time, so same-group submission order is preserved and no two
/// workers ever mutate the same group concurrently. Distinct groups run in
/// parallel, bounded by the worker-count semaphore.
pub async fn run_queue<P, Op>(
    mut intake_rx: mpsc::UnboundedReceiver<Task<P>>,
    executor: DynExecutor<P, Op>,
    sink: DynCommitSink<Op>,
    observer: DynQueueObserver,
    config: RuntimeConfig,
) -> Result<KernelStats, IngestError>
where
    P: Clone + Send + Sync + 'static,
    Op: Send + 'static,
{
    let shared = Arc::new(KernelShared {
        groups: DashMap::new(),
        barrier: RwLock::new(()),
        in_flight: Semaphore::new(config.worker_count.max(1)),
        executor,
        sink,
        observer,
        config,
        counters: KernelCounters::default(),
    });

    let mut runners: JoinSet<()> = JoinSet::new();

    while let Some(task) = intake_rx.recv().await {
        if task.exclusive {
            // Runs inline on the dispatcher: no new group work is picked up
            // and active runners finish their current task first.
            let _guard = shared.barrier.write().await;
            process_task(&shared, task).await;
            continue;
        }

        let group = task.group.clone();
        let spawn_runner = {
            let mut state = shared.groups.entry(group.clone()).or_default();
            state.queue.push_back(task);
            if state.running {
                false
            } else {
                state.running = true;
                true
            }
        };
        if spawn_runner {
            runners.spawn(run_group(Arc::clone(&shared), group));
        }
    }

    while runners.join_next().await.is_some() {}

    Ok(shared.counters.snapshot())
}

async fn run_group<P, Op>(shared: Arc<KernelShared<P, Op>>, group: GroupKey)
where
    P: Clone + Send + Sync + 'static,
    Op: Send + 'static,
{
    loop {
        let task = {
            let Some(mut state) = shared.groups.get_mut(&group) else {
                return;
            };
            match state.queue.pop_front() {
                Some(task) => task,
                None => {
                    state.running = false;
                    return;
                }
            }
        };

        let _read = shared.barrier.read().await;
        let _permit = match shared.in_flight.acquire().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        process_task(&shared, task).await;
    }
}

async fn process_task<P, Op>(shared: &KernelShared<P, Op>, task: Task<P>)
where
    P: Clone + Send + Sync + 'static,
    Op: Send + 'static,
{
    let mut attempt: u32 = 0;
    loop {
        let executor = Arc::clone(&shared.executor);
        let input = task.clone();
        let outcome = tokio::task::spawn_blocking(move || executor.execute(&input)).await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                ExecutionResult::failed(&task, ExecutionStatus::FatalError, err.to_string())
            }
            Err(err) => ExecutionResult::failed(
                &task,
                ExecutionStatus::FatalError,
                format!("execute join failure: {err}"),
            ),
        };

        match result.status {
            ExecutionStatus::Done => {
                commit(shared, &task, result).await;
                return;
            }
            ExecutionStatus::RetryableError if attempt < shared.config.max_retries => {
                attempt += 1;
                shared.counters.retried.fetch_add(1, Ordering::Relaxed);
                let backoff = shared.config.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
            ExecutionStatus::RetryableError | ExecutionStatus::FatalError => {
                let error = result
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown failure".to_string());
                warn!(
                    task_id = %task.task_id,
                    group = %task.group,
                    attempts = attempt + 1,
                    "task failed: {error}"
                );
                // The failure still flows through the sink exactly once so
                // downstream state tracking observes it.
                commit_silent(shared, result).await;
                shared
                    .observer
                    .on_task_failed(&task.task_id, &task.group, &error);
                shared.counters.failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
    }
}

async fn commit<P, Op>(shared: &KernelShared<P, Op>, task: &Task<P>, result: ExecutionResult<Op>)
where
    P: Clone + Send + Sync + 'static,
    Op: Send + 'static,
{
    let sink = Arc::clone(&shared.sink);
    let outcome = tokio::task::spawn_blocking(move || sink.commit(result)).await;
    match outcome {
        Ok(Ok(())) => {
            shared
                .observer
                .on_task_committed(&task.task_id, &task.group);
            shared.counters.executed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Err(err)) => {
            warn!(task_id = %task.task_id, group = %task.group, "commit failed: {err}");
            shared
                .observer
                .on_task_failed(&task.task_id, &task.group, &err.to_string());
            shared.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
        Err(err) => {
            warn!(task_id = %task.task_id, group = %task.group, "commit join failure: {err}");
            shared.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

async fn commit_silent<P, Op>(shared: &KernelShared<P, Op>, result: ExecutionResult<Op>)
where
    Op: Send + 'static,
{
    let sink = Arc::clone(&shared.sink);
    match tokio::task::spawn_blocking(move || sink.commit(result)).await {
        Ok(Ok(())) | Ok(Err(_)) => {}
        Err(err) => warn!("commit join failure: {err}"),
    }
}
