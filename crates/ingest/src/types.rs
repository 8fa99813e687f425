pub type TaskId = String;
pub type GroupKey = String;

/// One unit of queued work.
///
/// Tasks sharing a group are applied in submission order under mutual
/// exclusion; tasks in distinct groups may run concurrently. An exclusive
/// task serializes against every group.
#[derive(Debug, Clone)]
pub struct Task<P> {
    pub task_id: TaskId,
    pub group: GroupKey,
    pub seq: u64,
    pub exclusive: bool,
    pub payload: P,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Done,
    RetryableError,
    FatalError,
}

#[derive(Debug, Clone)]
pub struct ExecutionResult<Op> {
    pub task_id: TaskId,
    pub group: GroupKey,
    pub status: ExecutionStatus,
    pub operations: Vec<Op>,
    pub error: Option<String>,
}

impl<Op> ExecutionResult<Op> {
    pub fn done<P>(task: &Task<P>, operations: Vec<Op>) -> Self {
        Self {
            task_id: task.task_id.clone(),
            group: task.group.clone(),
            status: ExecutionStatus::Done,
            operations,
            error: None,
        }
    }

    pub fn failed<P>(task: &Task<P>, status: ExecutionStatus, error: impl Into<String>) -> Self {
        Self {
            task_id: task.task_id.clone(),
            group: task.group.clone(),
            status,
            operations: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub worker_count: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            max_retries: 3,
            retry_backoff_ms: 25,
        }
    }
}
