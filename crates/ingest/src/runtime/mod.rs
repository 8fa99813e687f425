use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::error::IngestError;
use crate::traits::{CommitSink, Executor, QueueObserver};
use crate::types::{RuntimeConfig, Task};

pub mod kernel;

pub use kernel::KernelStats;

pub type DynExecutor<P, Op> = Arc<dyn Executor<P, Op>>;
pub type DynCommitSink<Op> = Arc<dyn CommitSink<Op>>;
pub type DynQueueObserver = Arc<dyn QueueObserver>;

/// Cheap, cloneable producer side of the queue. Submission never blocks.
#[derive(Clone)]
pub struct IntakeHandle<P> {
    tx: mpsc::UnboundedSender<Task<P>>,
}

impl<P> IntakeHandle<P> {
    pub fn submit(&self, task: Task<P>) -> Result<(), IngestError> {
        self.tx
            .send(task)
            .map_err(|_| IngestError::Closed("queue intake handle closed".to_string()))
    }
}

/// Owns the queue wiring; `run` drives the kernel until the last intake
/// handle is dropped and the backlog drains.
pub struct IngestRuntime<P, Op> {
    executor: DynExecutor<P, Op>,
    sink: DynCommitSink<Op>,
    observer: DynQueueObserver,
    config: RuntimeConfig,
    intake_tx: mpsc::UnboundedSender<Task<P>>,
    intake_rx: Mutex<Option<mpsc::UnboundedReceiver<Task<P>>>>,
}

impl<P, Op> IngestRuntime<P, Op>
where
    P: Clone + Send + Sync + 'static,
    Op: Send + 'static,
{
    pub fn new(
        config: RuntimeConfig,
        executor: DynExecutor<P, Op>,
        sink: DynCommitSink<Op>,
        observer: DynQueueObserver,
    ) -> Self {
        let (intake_tx, intake_rx) = mpsc::unbounded_channel();
        Self {
            executor,
            sink,
            observer,
            config,
            intake_tx,
            intake_rx: Mutex::new(Some(intake_rx)),
        }
    }

    pub fn intake_handle(&self) -> IntakeHandle<P> {
        IntakeHandle {
            tx: self.intake_tx.clone(),
        }
    }

    pub async fn run(&self) -> Result<KernelStats, IngestError> {
        let intake_rx = self
            .intake_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| IngestError::Execution("runtime already started".to_string()))?;

        kernel::run_queue(
            intake_rx,
            Arc::clone(&self.executor),
            Arc::clone(&self.sink),
            Arc::clone(&self.observer),
            self.config.clone(),
        )
        .await
    }
}
