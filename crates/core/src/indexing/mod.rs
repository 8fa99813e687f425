//! Wiring between the generic queue runtime and the index store.
//!
//! The executor turns one queued request into store operations off the
//! caller's thread; the commit sink applies them, drives the status board,
//! and reports build events. Failures degrade to a `Stale` container and an
//! event, never a crash.

use std::sync::Arc;

use tokio::sync::broadcast;

use symdex_api::models::{ContainerRef, TypeEntry};
use symdex_api::reader::ContainerReader;
use symdex_ingest::{
    CommitSink, ExecutionResult, ExecutionStatus, Executor, IngestError, Task,
};

use crate::shared::SharedIndexRegistry;
use crate::status::IndexStatusBoard;
use crate::store::IndexStore;

#[derive(Debug, Clone)]
pub enum IndexRequest {
    Build(ContainerRef),
    Remove(ContainerRef),
    Reset,
}

#[derive(Debug, Clone)]
pub enum StoreOp {
    Upsert {
        container: ContainerRef,
        entries: Vec<TypeEntry>,
    },
    AdoptShared {
        container_key: String,
    },
    Remove {
        container_key: String,
    },
    Reset,
}

#[derive(Debug, Clone)]
pub enum BuildEvent {
    Built { container_key: String },
    AdoptedShared { container_key: String },
    Removed { container_key: String },
    Failed { container_key: String, error: String },
    ResetDone,
}

pub struct IndexExecutor {
    reader: Arc<dyn ContainerReader>,
    registry: Arc<SharedIndexRegistry>,
}

impl IndexExecutor {
    pub fn new(reader: Arc<dyn ContainerReader>, registry: Arc<SharedIndexRegistry>) -> Self {
        Self { reader, registry }
    }
}

impl Executor<IndexRequest, StoreOp> for IndexExecutor {
    fn execute(&self, task: &Task<IndexRequest>) -> Result<ExecutionResult<StoreOp>, IngestError> {
        match &task.payload {
            IndexRequest::Build(container) => {
                if let Some(shared) = self.registry.covering(container) {
                    tracing::debug!(
                        container = %container.path.display(),
                        shared = %shared.location().display(),
                        "container covered by shared index, skipping scan"
                    );
                    return Ok(ExecutionResult::done(
                        task,
                        vec![StoreOp::AdoptShared {
                            container_key: container.key(),
                        }],
                    ));
                }

                if !self.reader.can_read(&container.path) {
                    return Ok(ExecutionResult::failed(
                        task,
                        ExecutionStatus::FatalError,
                        format!("unsupported container: {}", container.path.display()),
                    ));
                }

                match self.reader.read_container(container) {
                    Ok(entries) => Ok(ExecutionResult::done(
                        task,
                        vec![StoreOp::Upsert {
                            container: container.clone(),
                            entries,
                        }],
                    )),
                    // Archive I/O problems are retryable storage failures.
                    Err(err) => Ok(ExecutionResult::failed(
                        task,
                        ExecutionStatus::RetryableError,
                        err.to_string(),
                    )),
                }
            }
            IndexRequest::Remove(container) => Ok(ExecutionResult::done(
                task,
                vec![StoreOp::Remove {
                    container_key: container.key(),
                }],
            )),
            IndexRequest::Reset => Ok(ExecutionResult::done(task, vec![StoreOp::Reset])),
        }
    }
}

pub struct StoreCommitSink {
    store: Arc<IndexStore>,
    board: Arc<IndexStatusBoard>,
    events: broadcast::Sender<BuildEvent>,
}

impl StoreCommitSink {
    pub fn new(
        store: Arc<IndexStore>,
        board: Arc<IndexStatusBoard>,
        events: broadcast::Sender<BuildEvent>,
    ) -> Self {
        Self {
            store,
            board,
            events,
        }
    }

    fn emit(&self, event: BuildEvent) {
        let _ = self.events.send(event);
    }
}

impl CommitSink<StoreOp> for StoreCommitSink {
    fn commit(&self, result: ExecutionResult<StoreOp>) -> Result<(), IngestError> {
        if result.status != ExecutionStatus::Done {
            let error = result
                .error
                .unwrap_or_else(|| "unknown build failure".to_string());
            tracing::warn!(container = %result.group, "build failed, container left stale: {error}");
            self.board.note_stale(&result.group);
            self.emit(BuildEvent::Failed {
                container_key: result.group,
                error,
            });
            return Ok(());
        }

        for op in result.operations {
            match op {
                StoreOp::Upsert { container, entries } => {
                    let container_key = container.key();
                    let count = entries.len();
                    match self.store.upsert_container(container, entries) {
                        Ok(()) => {
                            tracing::debug!(
                                container = %container_key,
                                entries = count,
                                "container indexed"
                            );
                            self.board.note_clean(&container_key);
                            self.emit(BuildEvent::Built { container_key });
                        }
                        Err(err) => {
                            tracing::warn!(
                                container = %container_key,
                                "segment persist failed, container left stale: {err}"
                            );
                            self.board.note_stale(&container_key);
                            self.emit(BuildEvent::Failed {
                                container_key,
                                error: err.to_string(),
                            });
                        }
                    }
                }
                StoreOp::AdoptShared { container_key } => {
                    self.board.note_clean(&container_key);
                    self.emit(BuildEvent::AdoptedShared { container_key });
                }
                StoreOp::Remove { container_key } => match self.store.remove_container(&container_key) {
                    Ok(()) => {
                        self.board.note_absent(&container_key);
                        self.emit(BuildEvent::Removed { container_key });
                    }
                    Err(err) => {
                        tracing::warn!(
                            container = %container_key,
                            "removal failed, container left stale: {err}"
                        );
                        self.board.note_stale(&container_key);
                        self.emit(BuildEvent::Failed {
                            container_key,
                            error: err.to_string(),
                        });
                    }
                },
                StoreOp::Reset => {
                    if let Err(err) = self.store.reset() {
                        tracing::warn!("reset left residual segment files: {err}");
                    }
                    self.board.note_reset_done();
                    self.emit(BuildEvent::ResetDone);
                }
            }
        }

        Ok(())
    }
}
