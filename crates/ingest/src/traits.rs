use crate::error::IngestError;
use crate::types::{ExecutionResult, Task};

/// Turns one task into operations. Runs on a blocking worker; must be pure
/// enough that re-execution after a retryable failure is safe.
pub trait Executor<P, Op>: Send + Sync {
    fn execute(&self, task: &Task<P>) -> Result<ExecutionResult<Op>, IngestError>;
}

/// Applies the outcome of exactly one task, success or failure. Called once
/// per task after retries are exhausted or the task completed.
pub trait CommitSink<Op>: Send + Sync {
    fn commit(&self, result: ExecutionResult<Op>) -> Result<(), IngestError>;
}

pub trait QueueObserver: Send + Sync {
    fn on_task_committed(&self, task_id: &str, group: &str);
    fn on_task_failed(&self, task_id: &str, group: &str, error: &str);
}

#[derive(Debug, Default)]
pub struct NoopQueueObserver;

impl QueueObserver for NoopQueueObserver {
    fn on_task_committed(&self, _task_id: &str, _group: &str) {}
    fn on_task_failed(&self, _task_id: &str, _group: &str, _error: &str) {}
}
