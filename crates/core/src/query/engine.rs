use symdex_api::models::{SearchScope, TypeKindFilter, TypeNameMatch, TypeNameSink};

use crate::query::pattern::TypeNamePattern;
use crate::store::IndexSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    Cancelled,
}

/// Streams every matching entry of the snapshot to the sink. Containers
/// outside the scope are never offered; a sink returning `false` stops the
/// scan between deliveries. The snapshot is immutable, so concurrent builds
/// cannot interleave old and new state of one container into the stream.
pub fn scan_snapshot(
    snapshot: &IndexSnapshot,
    pattern: &TypeNamePattern,
    kind: TypeKindFilter,
    scope: &dyn SearchScope,
    sink: &mut dyn TypeNameSink,
) -> ScanOutcome {
    for index in snapshot.containers() {
        if !scope.contains(&index.container) {
            continue;
        }
        let container_key = index.container.key();

        for entry in &index.entries {
            if !kind.admits(entry.kind) {
                continue;
            }
            let fqn = entry.fqn();
            if !pattern.matches(&entry.simple_name, &fqn) {
                continue;
            }

            let delivered = sink.accept(TypeNameMatch {
                fqn,
                simple_name: entry.simple_name.clone(),
                package: entry.package.clone(),
                kind: entry.kind,
                modifiers: entry.modifiers,
                accessibility: entry.accessibility,
                container_key: container_key.clone(),
                member_path: entry.member_path.clone(),
            });
            if !delivered {
                return ScanOutcome::Cancelled;
            }
        }
    }
    ScanOutcome::Completed
}
