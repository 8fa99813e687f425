//! Engine facade tying the store, the build queue and the query layer
//! together behind one handle.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;

use symdex_api::models::{
    ContainerRef, MatchRule, Readiness, SearchScope, TypeKindFilter, TypeNameSink, WaitPolicy,
};
use symdex_api::reader::ContainerReader;
use symdex_ingest::{
    DynCommitSink, DynExecutor, IngestRuntime, IntakeHandle, QueueObserver, RuntimeConfig, Task,
};

use crate::error::{Result, SymdexError};
use crate::hierarchy::{self, TypeHierarchy};
use crate::indexing::{BuildEvent, IndexExecutor, IndexRequest, StoreCommitSink, StoreOp};
use crate::query::{ScanOutcome, TypeNamePattern, scan_snapshot};
use crate::shared::SharedIndexRegistry;
use crate::status::{IndexState, IndexStatusBoard};
use crate::store::{IndexSnapshot, IndexStore};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub queue: RuntimeConfig,
    /// Deadline applied to the readiness wait of `WaitUntilReady` queries.
    /// A query that times out degrades to scanning the current snapshot, so
    /// a permanently stale container can never hang a search.
    pub ready_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue: RuntimeConfig::default(),
            ready_timeout: Some(Duration::from_secs(30)),
        }
    }
}

pub struct SymdexEngineBuilder {
    index_dir: PathBuf,
    reader: Option<Arc<dyn ContainerReader>>,
    registry: Option<Arc<SharedIndexRegistry>>,
    config: EngineConfig,
}

impl SymdexEngineBuilder {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            reader: None,
            registry: None,
            config: EngineConfig::default(),
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn ContainerReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Inject a registry shared with other engines; by default every engine
    /// gets its own.
    pub fn with_registry(mut self, registry: Arc<SharedIndexRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the engine and spawns its queue runtime. Must run inside a
    /// tokio runtime. Previously persisted segments become queryable
    /// immediately.
    pub fn build(self) -> Result<SymdexEngine> {
        let reader = self
            .reader
            .ok_or_else(|| SymdexError::Internal("engine requires a container reader".to_string()))?;

        let store = Arc::new(IndexStore::new(self.index_dir));
        let board = Arc::new(IndexStatusBoard::new());
        let registry = self.registry.unwrap_or_default();

        let loaded = store.load_persisted()?;
        if loaded > 0 {
            for key in store.snapshot_local().keys() {
                board.note_loaded(key);
            }
            tracing::info!("Reloaded {loaded} container segments from {}", store.index_dir().display());
        }

        let (events, _) = broadcast::channel(64);
        let executor: DynExecutor<IndexRequest, StoreOp> =
            Arc::new(IndexExecutor::new(reader, Arc::clone(&registry)));
        let sink: DynCommitSink<StoreOp> = Arc::new(StoreCommitSink::new(
            Arc::clone(&store),
            Arc::clone(&board),
            events.clone(),
        ));
        let runtime = Arc::new(IngestRuntime::new(
            self.config.queue,
            executor,
            sink,
            Arc::new(TracingQueueObserver),
        ));
        let intake = runtime.intake_handle();

        let runtime_task = tokio::spawn(async move {
            if let Err(err) = runtime.run().await {
                tracing::error!("index queue runtime exited: {err}");
            }
        });

        Ok(SymdexEngine {
            store,
            board,
            registry,
            intake,
            events,
            ready_timeout: self.config.ready_timeout,
            seq: AtomicU64::new(0),
            runtime_task,
        })
    }
}

pub struct SymdexEngine {
    store: Arc<IndexStore>,
    board: Arc<IndexStatusBoard>,
    registry: Arc<SharedIndexRegistry>,
    intake: IntakeHandle<IndexRequest>,
    events: broadcast::Sender<BuildEvent>,
    ready_timeout: Option<Duration>,
    seq: AtomicU64,
    runtime_task: tokio::task::JoinHandle<()>,
}

impl SymdexEngine {
    pub fn builder(index_dir: impl Into<PathBuf>) -> SymdexEngineBuilder {
        SymdexEngineBuilder::new(index_dir)
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    // ---- Build trigger API ----

    pub fn enqueue_build(&self, container: ContainerRef) -> Result<()> {
        let key = container.key();
        self.board.note_enqueued(&key);
        let seq = self.next_seq();
        let task = Task {
            task_id: format!("build:{key}#{seq}"),
            group: key.clone(),
            seq,
            exclusive: false,
            payload: IndexRequest::Build(container),
        };
        if let Err(err) = self.intake.submit(task) {
            self.board.note_stale(&key);
            return Err(SymdexError::Internal(err.to_string()));
        }
        Ok(())
    }

    pub fn enqueue_removal(&self, container: ContainerRef) -> Result<()> {
        let key = container.key();
        self.board.note_enqueued(&key);
        let seq = self.next_seq();
        let task = Task {
            task_id: format!("remove:{key}#{seq}"),
            group: key.clone(),
            seq,
            exclusive: false,
            payload: IndexRequest::Remove(container),
        };
        if let Err(err) = self.intake.submit(task) {
            self.board.note_stale(&key);
            return Err(SymdexError::Internal(err.to_string()));
        }
        Ok(())
    }

    pub fn enqueue_reset(&self) -> Result<()> {
        self.board.note_enqueued_exclusive();
        let seq = self.next_seq();
        let task = Task {
            task_id: format!("reset#{seq}"),
            group: String::new(),
            seq,
            exclusive: true,
            payload: IndexRequest::Reset,
        };
        if let Err(err) = self.intake.submit(task) {
            self.board.note_dropped();
            return Err(SymdexError::Internal(err.to_string()));
        }
        Ok(())
    }

    // ---- Readiness API ----

    pub async fn wait_until_ready(&self, timeout: Option<Duration>) -> Readiness {
        self.board.wait_until_ready(timeout).await
    }

    // ---- Shared-index control API ----

    pub fn set_shared_location(&self, logical_key: &str, location: Option<PathBuf>) {
        self.registry.set_shared_location(logical_key, location);
    }

    // ---- Query API ----

    /// Streams matching type names to the sink. The rule bits and the
    /// pattern are validated before anything else; `WaitUntilReady` blocks
    /// on the readiness barrier up to the configured deadline and then
    /// scans whatever is queryable.
    pub async fn search_type_names(
        &self,
        pattern: &str,
        rule_bits: u32,
        kind: TypeKindFilter,
        scope: &dyn SearchScope,
        sink: &mut dyn TypeNameSink,
        wait_policy: WaitPolicy,
    ) -> Result<ScanOutcome> {
        let rule = MatchRule::from_bits(rule_bits)?;
        let compiled = TypeNamePattern::compile(pattern, rule)?;

        if wait_policy == WaitPolicy::WaitUntilReady {
            let _ = self.board.wait_until_ready(self.ready_timeout).await;
        }

        let snapshot = self.snapshot();
        Ok(scan_snapshot(&snapshot, &compiled, kind, scope, sink))
    }

    pub fn compute_hierarchy(&self, root: &str, scope: &dyn SearchScope) -> TypeHierarchy {
        hierarchy::compute_hierarchy(&self.snapshot(), root, scope)
    }

    // ---- Introspection ----

    /// Point-in-time read view: local containers overlaid by the shared
    /// bindings current at call time.
    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot::new(self.store.snapshot_local(), self.registry.snapshot())
    }

    pub fn container_state(&self, container_key: &str) -> IndexState {
        self.board.state_of(container_key)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<BuildEvent> {
        self.events.subscribe()
    }
}

impl Drop for SymdexEngine {
    fn drop(&mut self) {
        self.runtime_task.abort();
    }
}

struct TracingQueueObserver;

impl QueueObserver for TracingQueueObserver {
    fn on_task_committed(&self, task_id: &str, _group: &str) {
        tracing::trace!(task_id, "index task committed");
    }

    fn on_task_failed(&self, task_id: &str, group: &str, error: &str) {
        tracing::warn!(task_id, container = group, "index task failed: {error}");
    }
}
