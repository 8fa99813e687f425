pub mod error;
pub mod runtime;
pub mod traits;
pub mod types;

pub use error::IngestError;
pub use runtime::{
    DynCommitSink, DynExecutor, DynQueueObserver, IngestRuntime, IntakeHandle, KernelStats,
};
pub use traits::{CommitSink, Executor, NoopQueueObserver, QueueObserver};
pub use types::{ExecutionResult, ExecutionStatus, GroupKey, RuntimeConfig, Task, TaskId};
