//! Type hierarchy resolution over the resolved index snapshot.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, Reversed};

use symdex_api::models::SearchScope;

use crate::store::IndexSnapshot;

/// Transitive supertype/subtype closure around one focus type. Membership
/// is deterministic for a given snapshot; iteration order is not specified.
#[derive(Debug, Clone)]
pub struct TypeHierarchy {
    pub focus: String,
    pub supertypes: HashSet<String>,
    pub subtypes: HashSet<String>,
}

impl TypeHierarchy {
    pub fn contains(&self, fqn: &str) -> bool {
        self.focus == fqn || self.supertypes.contains(fqn) || self.subtypes.contains(fqn)
    }

    pub fn types(&self) -> HashSet<String> {
        let mut all = HashSet::with_capacity(self.supertypes.len() + self.subtypes.len() + 1);
        all.insert(self.focus.clone());
        all.extend(self.supertypes.iter().cloned());
        all.extend(self.subtypes.iter().cloned());
        all
    }
}

/// Computes the hierarchy by following extends/implements edges recorded on
/// the in-scope entries. Traversal is BFS with a visited set, so malformed
/// cyclic edges terminate: a revisited node is already included.
///
/// The caller gates readiness; the computation runs against whatever the
/// snapshot holds.
pub fn compute_hierarchy(
    snapshot: &IndexSnapshot,
    root: &str,
    scope: &dyn SearchScope,
) -> TypeHierarchy {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();

    for index in snapshot.containers() {
        if !scope.contains(&index.container) {
            continue;
        }
        for entry in &index.entries {
            let sub = intern(&mut graph, &mut nodes, &entry.fqn());
            for super_type in &entry.super_types {
                let sup = intern(&mut graph, &mut nodes, super_type);
                graph.update_edge(sub, sup, ());
            }
        }
    }

    let Some(&root_idx) = nodes.get(root) else {
        return TypeHierarchy {
            focus: root.to_string(),
            supertypes: HashSet::new(),
            subtypes: HashSet::new(),
        };
    };

    let mut supertypes = HashSet::new();
    let mut bfs = Bfs::new(&graph, root_idx);
    while let Some(node) = bfs.next(&graph) {
        if node != root_idx {
            supertypes.insert(graph[node].clone());
        }
    }

    let mut subtypes = HashSet::new();
    let mut bfs = Bfs::new(Reversed(&graph), root_idx);
    while let Some(node) = bfs.next(Reversed(&graph)) {
        if node != root_idx {
            subtypes.insert(graph[node].clone());
        }
    }

    TypeHierarchy {
        focus: root.to_string(),
        supertypes,
        subtypes,
    }
}

fn intern(
    graph: &mut DiGraph<String, ()>,
    nodes: &mut HashMap<String, NodeIndex>,
    name: &str,
) -> NodeIndex {
    if let Some(&idx) = nodes.get(name) {
        return idx;
    }
    let idx = graph.add_node(name.to_string());
    nodes.insert(name.to_string(), idx);
    idx
}
