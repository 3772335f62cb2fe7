use crate::tree::{SourceTree, preorder_named};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tree_sitter::Node;

/// Stable integer identity of one named parse-tree node (or one synthetic
/// graph node). The same syntactic span gets the same id in every view.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ids start above zero so a zeroed record is visibly invalid.
const FIRST_ID: u32 = 1;

type SpanKey = (usize, usize, u16);

fn key_of(node: Node<'_>) -> SpanKey {
    (node.start_byte(), node.end_byte(), node.kind_id())
}

/// Identity table over the named nodes of one tree.
///
/// Built once per file with a pre-order walk; every view draws its node ids
/// from here, including synthetic nodes (function exits, headerless loop
/// conditions, call stubs), which share the same monotonic counter.
pub struct NodeTable {
    next: u32,
    index: HashMap<SpanKey, NodeId>,
    synthetic: Vec<(NodeId, &'static str)>,
}

impl NodeTable {
    pub fn build(src: &SourceTree) -> Self {
        let mut table = NodeTable {
            next: FIRST_ID,
            index: HashMap::new(),
            synthetic: Vec::new(),
        };
        for node in preorder_named(src.root()) {
            let key = key_of(node);
            let next = &mut table.next;
            table.index.entry(key).or_insert_with(|| {
                let id = NodeId(*next);
                *next += 1;
                id
            });
        }
        tracing::debug!(target: "index", named = table.index.len(), "identity table built");
        table
    }

    /// Id of a named tree node. `None` for anonymous tokens.
    pub fn id_of(&self, node: Node<'_>) -> Option<NodeId> {
        if !node.is_named() {
            return None;
        }
        self.index.get(&key_of(node)).copied()
    }

    /// Allocate an id for a node that has no syntactic span.
    pub fn alloc_synthetic(&mut self, kind: &'static str) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.synthetic.push((id, kind));
        id
    }

    pub fn named_len(&self) -> usize {
        self.index.len()
    }
}
