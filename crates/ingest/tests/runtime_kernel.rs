use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use symdex_ingest::runtime::kernel;
use symdex_ingest::{
    CommitSink, ExecutionResult, ExecutionStatus, Executor, IngestError, NoopQueueObserver,
    QueueObserver, RuntimeConfig, Task,
};
use tokio::sync::mpsc;

fn task(id: &str, group: &str, seq: u64, payload: u8) -> Task<u8> {
    Task {
        task_id: id.to_string(),
        group: group.to_string(),
        seq,
        exclusive: false,
        payload,
    }
}

/// payload 0 => succeed; payload N>0 => retryable failure on the first N
/// attempts, success afterwards; payload 255 => always retryable failure.
struct TestExecutor {
    attempts: Mutex<std::collections::HashMap<String, u32>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    exclusive_overlapped: AtomicUsize,
}

impl TestExecutor {
    fn new() -> Self {
        Self {
            attempts: Mutex::new(std::collections::HashMap::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            exclusive_overlapped: AtomicUsize::new(0),
        }
    }
}

impl Executor<u8, String> for TestExecutor {
    fn execute(&self, task: &Task<u8>) -> Result<ExecutionResult<String>, IngestError> {
        let current = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(current, Ordering::SeqCst);
        if task.exclusive && current > 1 {
            self.exclusive_overlapped.fetch_add(1, Ordering::SeqCst);
        }
        std::thread::sleep(Duration::from_millis(5));

        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(task.task_id.clone()).or_insert(0);
            *entry += 1;
            *entry
        };

        let result = if task.payload == 255 || u32::from(task.payload) >= attempt {
            ExecutionResult::failed(task, ExecutionStatus::RetryableError, "flaky")
        } else {
            ExecutionResult::done(task, vec![task.task_id.clone()])
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(result)
    }
}

#[derive(Default)]
struct TestSink {
    committed: Mutex<Vec<(String, ExecutionStatus)>>,
}

impl CommitSink<String> for TestSink {
    fn commit(&self, result: ExecutionResult<String>) -> Result<(), IngestError> {
        self.committed
            .lock()
            .unwrap()
            .push((result.task_id, result.status));
        Ok(())
    }
}

#[derive(Default)]
struct TestObserver {
    failed: Mutex<Vec<String>>,
}

impl QueueObserver for TestObserver {
    fn on_task_committed(&self, _task_id: &str, _group: &str) {}
    fn on_task_failed(&self, task_id: &str, _group: &str, _error: &str) {
        self.failed.lock().unwrap().push(task_id.to_string());
    }
}

#[tokio::test]
async fn test_same_group_submission_order_preserved() {
    let (tx, rx) = mpsc::unbounded_channel();
    for i in 0..6u64 {
        tx.send(task(&format!("t{i}"), "jar-a", i, 0)).unwrap();
    }
    drop(tx);

    let sink = Arc::new(TestSink::default());
    let stats = kernel::run_queue(
        rx,
        Arc::new(TestExecutor::new()),
        Arc::clone(&sink) as Arc<dyn CommitSink<String>>,
        Arc::new(NoopQueueObserver),
        RuntimeConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(stats.executed, 6);
    let committed = sink.committed.lock().unwrap();
    let ids: Vec<&str> = committed.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["t0", "t1", "t2", "t3", "t4", "t5"]);
}

#[tokio::test]
async fn test_distinct_groups_run_concurrently() {
    let (tx, rx) = mpsc::unbounded_channel();
    for i in 0..4u64 {
        tx.send(task(&format!("a{i}"), &format!("jar-{i}"), i, 0))
            .unwrap();
    }
    drop(tx);

    let executor = Arc::new(TestExecutor::new());
    let sink = Arc::new(TestSink::default());
    let stats = kernel::run_queue(
        rx,
        Arc::clone(&executor) as Arc<dyn Executor<u8, String>>,
        Arc::clone(&sink) as Arc<dyn CommitSink<String>>,
        Arc::new(NoopQueueObserver),
        RuntimeConfig {
            worker_count: 4,
            ..RuntimeConfig::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(stats.executed, 4);
    assert!(executor.max_active.load(Ordering::SeqCst) > 1);
}

#[tokio::test]
async fn test_retryable_failure_recovers() {
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(task("flaky", "jar-a", 0, 2)).unwrap();
    drop(tx);

    let sink = Arc::new(TestSink::default());
    let stats = kernel::run_queue(
        rx,
        Arc::new(TestExecutor::new()),
        Arc::clone(&sink) as Arc<dyn CommitSink<String>>,
        Arc::new(NoopQueueObserver),
        RuntimeConfig {
            retry_backoff_ms: 1,
            ..RuntimeConfig::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(stats.executed, 1);
    assert_eq!(stats.retried, 2);
    assert_eq!(stats.failed, 0);
    let committed = sink.committed.lock().unwrap();
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].1, ExecutionStatus::Done);
}

#[tokio::test]
async fn test_retry_exhaustion_reports_failure() {
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(task("doomed", "jar-a", 0, 255)).unwrap();
    tx.send(task("fine", "jar-a", 1, 0)).unwrap();
    drop(tx);

    let sink = Arc::new(TestSink::default());
    let observer = Arc::new(TestObserver::default());
    let stats = kernel::run_queue(
        rx,
        Arc::new(TestExecutor::new()),
        Arc::clone(&sink) as Arc<dyn CommitSink<String>>,
        Arc::clone(&observer) as Arc<dyn QueueObserver>,
        RuntimeConfig {
            max_retries: 1,
            retry_backoff_ms: 1,
            ..RuntimeConfig::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.executed, 1);
    assert_eq!(observer.failed.lock().unwrap().as_slice(), ["doomed"]);

    // The failure still reached the sink, and did not block later work in
    // the same group.
    let committed = sink.committed.lock().unwrap();
    assert_eq!(committed.len(), 2);
    assert_eq!(committed[0], ("doomed".to_string(), ExecutionStatus::RetryableError));
    assert_eq!(committed[1], ("fine".to_string(), ExecutionStatus::Done));
}

#[tokio::test]
async fn test_exclusive_task_runs_alone() {
    let (tx, rx) = mpsc::unbounded_channel();
    for i in 0..3u64 {
        tx.send(task(&format!("pre{i}"), &format!("jar-{i}"), i, 0))
            .unwrap();
    }
    tx.send(Task {
        task_id: "reset".to_string(),
        group: String::new(),
        seq: 3,
        exclusive: true,
        payload: 0,
    })
    .unwrap();
    for i in 4..7u64 {
        tx.send(task(&format!("post{i}"), &format!("jar-{i}"), i, 0))
            .unwrap();
    }
    drop(tx);

    let executor = Arc::new(TestExecutor::new());
    let sink = Arc::new(TestSink::default());
    let stats = kernel::run_queue(
        rx,
        Arc::clone(&executor) as Arc<dyn Executor<u8, String>>,
        Arc::clone(&sink) as Arc<dyn CommitSink<String>>,
        Arc::new(NoopQueueObserver),
        RuntimeConfig {
            worker_count: 4,
            ..RuntimeConfig::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(stats.executed, 7);
    assert_eq!(executor.exclusive_overlapped.load(Ordering::SeqCst), 0);
    let committed = sink.committed.lock().unwrap();
    assert!(committed.iter().any(|(id, _)| id == "reset"));
}
