use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use symdex_api::models::{
    Accessibility, ContainerRef, modifiers, R_PATTERN_MATCH, Readiness, TypeEntry, TypeKind, TypeKindFilter,
    VecSink, WaitPolicy, WorkspaceScope,
};
use symdex_api::reader::{BoxError, ContainerReader};
use symdex_core::engine::SymdexEngine;
use symdex_core::query::{TypeNamePattern, scan_snapshot};
use symdex_core::store::segment::SEGMENT_EXT;
use symdex_api::models::MatchRule;
use tempfile::tempdir;

struct MockReader {
    contents: Mutex<HashMap<String, Vec<TypeEntry>>>,
    reads: AtomicUsize,
}

impl MockReader {
    fn new() -> Self {
        Self {
            contents: Mutex::new(HashMap::new()),
            reads: AtomicUsize::new(0),
        }
    }

    fn put(&self, container: &ContainerRef, entries: Vec<TypeEntry>) {
        self.contents.lock().unwrap().insert(container.key(), entries);
    }
}

impl ContainerReader for MockReader {
    fn can_read(&self, _path: &std::path::Path) -> bool {
        true
    }

    fn read_container(&self, container: &ContainerRef) -> Result<Vec<TypeEntry>, BoxError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.contents
            .lock()
            .unwrap()
            .get(&container.key())
            .cloned()
            .ok_or_else(|| format!("no fixture for {}", container.key()).into())
    }
}

fn entry(package: &str, simple_name: &str) -> TypeEntry {
    TypeEntry {
        simple_name: simple_name.to_string(),
        package: package.to_string(),
        enclosing: vec![],
        kind: TypeKind::Class,
        modifiers: modifiers::PUBLIC,
        accessibility: Accessibility::Accessible,
        super_types: vec![],
        member_path: format!("{}/{simple_name}.class", package.replace('.', "/")),
    }
}

fn runtime_container() -> ContainerRef {
    ContainerRef::new("/cp/runtime.jar", 7).with_logical_key("jdk")
}

/// Builds a shared artifact by letting an engine persist its segments into
/// the shared directory.
async fn build_shared_artifact(shared_dir: &std::path::Path) {
    let reader = Arc::new(MockReader::new());
    let container = runtime_container();
    reader.put(
        &container,
        vec![entry("java.lang", "Object"), entry("java.util", "List")],
    );

    let engine = SymdexEngine::builder(shared_dir)
        .with_reader(reader as Arc<dyn ContainerReader>)
        .build()
        .unwrap();
    engine.enqueue_build(container).unwrap();
    assert_eq!(engine.wait_until_ready(None).await, Readiness::Ready);
}

fn segment_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.path().extension().and_then(|x| x.to_str()) == Some(SEGMENT_EXT)
                })
                .count()
        })
        .unwrap_or(0)
}

async fn scan_count(engine: &SymdexEngine, pattern: &str) -> usize {
    let mut sink = VecSink::default();
    engine
        .search_type_names(
            pattern,
            R_PATTERN_MATCH,
            TypeKindFilter::Any,
            &WorkspaceScope,
            &mut sink,
            WaitPolicy::DoNotWait,
        )
        .await
        .unwrap();
    sink.matches.len()
}

#[tokio::test]
async fn test_shared_binding_skips_scan_and_survives_reset() {
    let shared_dir = tempdir().unwrap();
    let local_dir = tempdir().unwrap();
    build_shared_artifact(shared_dir.path()).await;

    let reader = Arc::new(MockReader::new());
    let engine = SymdexEngine::builder(local_dir.path())
        .with_reader(Arc::clone(&reader) as Arc<dyn ContainerReader>)
        .build()
        .unwrap();

    engine.set_shared_location("jdk", Some(shared_dir.path().to_path_buf()));

    // The build is adopted from the shared artifact; the reader never runs.
    engine.enqueue_build(runtime_container()).unwrap();
    assert_eq!(engine.wait_until_ready(None).await, Readiness::Ready);
    assert_eq!(reader.reads.load(Ordering::SeqCst), 0);
    assert_eq!(scan_count(&engine, "java.*").await, 2);

    // Resetting the local logical index must not erase shared data.
    engine.enqueue_reset().unwrap();
    assert_eq!(engine.wait_until_ready(None).await, Readiness::Ready);
    assert_eq!(scan_count(&engine, "java.*").await, 2);
    assert_eq!(segment_files(shared_dir.path()), 1);
    assert_eq!(segment_files(local_dir.path()), 0);
}

#[tokio::test]
async fn test_clearing_binding_reverts_to_local_builds() {
    let shared_dir = tempdir().unwrap();
    let local_dir = tempdir().unwrap();
    build_shared_artifact(shared_dir.path()).await;

    let reader = Arc::new(MockReader::new());
    let container = runtime_container();
    reader.put(&container, vec![entry("java.lang", "Object")]);

    let engine = SymdexEngine::builder(local_dir.path())
        .with_reader(Arc::clone(&reader) as Arc<dyn ContainerReader>)
        .build()
        .unwrap();

    engine.set_shared_location("jdk", Some(shared_dir.path().to_path_buf()));
    engine.enqueue_build(container.clone()).unwrap();
    engine.wait_until_ready(None).await;
    assert_eq!(reader.reads.load(Ordering::SeqCst), 0);

    engine.set_shared_location("jdk", None);
    assert_eq!(scan_count(&engine, "java.*").await, 0);

    // With the binding gone, the same container builds locally.
    engine.enqueue_build(container).unwrap();
    assert_eq!(engine.wait_until_ready(None).await, Readiness::Ready);
    assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
    assert_eq!(scan_count(&engine, "java.*").await, 1);
}

#[tokio::test]
async fn test_pinned_snapshot_outlives_binding_swap() {
    let shared_dir = tempdir().unwrap();
    let local_dir = tempdir().unwrap();
    build_shared_artifact(shared_dir.path()).await;

    let engine = SymdexEngine::builder(local_dir.path())
        .with_reader(Arc::new(MockReader::new()) as Arc<dyn ContainerReader>)
        .build()
        .unwrap();
    engine.set_shared_location("jdk", Some(shared_dir.path().to_path_buf()));

    let pinned = engine.snapshot();
    engine.set_shared_location("jdk", None);

    // The in-flight snapshot still resolves against the pre-transition
    // binding; a fresh snapshot does not.
    let pattern = TypeNamePattern::compile("java.*", MatchRule::pattern()).unwrap();
    let mut sink = VecSink::default();
    scan_snapshot(
        &pinned,
        &pattern,
        TypeKindFilter::Any,
        &WorkspaceScope,
        &mut sink,
    );
    assert_eq!(sink.matches.len(), 2);

    let mut sink = VecSink::default();
    scan_snapshot(
        &engine.snapshot(),
        &pattern,
        TypeKindFilter::Any,
        &WorkspaceScope,
        &mut sink,
    );
    assert!(sink.matches.is_empty());
}
