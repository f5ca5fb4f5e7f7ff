//! Dependency tracking between field keys
//!
//! Tracks which fields recompute when a given field changes. Nodes are
//! interned into an arena of integer ids with adjacency lists by index, so
//! propagation never hashes strings while walking edges. Edges are
//! schema-level: one edge per formula reference, independent of row count.

use ahash::AHashMap;

/// Index of a field key in the graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Dependency graph over generic field keys
///
/// Built once during engine construction and immutable afterwards.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Node id → key text
    keys: Vec<String>,
    /// Key text → node id
    index: AHashMap<String, NodeId>,
    /// Node id → fields that recompute when it changes
    dependents: Vec<Vec<NodeId>>,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a key, returning its node id (idempotent)
    pub fn add_node(&mut self, key: &str) -> NodeId {
        if let Some(&id) = self.index.get(key) {
            return id;
        }
        let id = NodeId(self.keys.len());
        self.keys.push(key.to_string());
        self.index.insert(key.to_string(), id);
        self.dependents.push(Vec::new());
        id
    }

    /// Record that `target` recomputes when `source` changes
    pub fn add_dependency(&mut self, source: &str, target: &str) {
        let source = self.add_node(source);
        let target = self.add_node(target);
        let edges = &mut self.dependents[source.0];
        if !edges.contains(&target) {
            edges.push(target);
        }
    }

    /// The key text of a node
    pub fn key(&self, id: NodeId) -> &str {
        &self.keys[id.0]
    }

    /// Fields that recompute when the given key changes
    pub fn direct_dependents(&self, key: &str) -> impl Iterator<Item = &str> {
        self.index
            .get(key)
            .map(|id| self.dependents[id.0].as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|id| self.keys[id.0].as_str())
    }

    /// Number of interned keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Find a dependency cycle, if any
    ///
    /// Depth-first search driven by an explicit frame stack (no host
    /// recursion). Returns the offending key sequence with the repeated
    /// key closing the loop, e.g. `["a", "b", "a"]`.
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.keys.len()];

        for start in 0..self.keys.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }

            // (node, next outgoing edge to explore)
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            marks[start] = Mark::InProgress;

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                if frame.1 < self.dependents[node].len() {
                    let next = self.dependents[node][frame.1].0;
                    frame.1 += 1;
                    match marks[next] {
                        Mark::Unvisited => {
                            marks[next] = Mark::InProgress;
                            stack.push((next, 0));
                        }
                        Mark::InProgress => {
                            // Close the loop from next's place on the stack
                            let from = stack
                                .iter()
                                .position(|&(n, _)| n == next)
                                .unwrap_or(0);
                            let mut path: Vec<String> = stack[from..]
                                .iter()
                                .map(|&(n, _)| self.keys[n].clone())
                                .collect();
                            path.push(self.keys[next].clone());
                            return Some(path);
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }

        None
    }
}
