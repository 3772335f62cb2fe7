use crate::index::NodeId;
use bitflags::bitflags;
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};

bitflags! {
    /// Which view(s) a node or edge belongs to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct View: u8 {
        const AST = 0b001;
        const CFG = 0b010;
        const DFG = 0b100;
    }
}

impl View {
    pub fn tags(self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.contains(View::AST) {
            out.push("ast");
        }
        if self.contains(View::CFG) {
            out.push("cfg");
        }
        if self.contains(View::DFG) {
            out.push("dfg");
        }
        out
    }

    /// Tag for single-view edges; composed edges keep their origin view.
    pub fn tag(self) -> &'static str {
        if self == View::AST {
            "ast"
        } else if self == View::CFG {
            "cfg"
        } else if self == View::DFG {
            "dfg"
        } else {
            "mixed"
        }
    }
}

/// Typed edges across all views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    /// AST parent → child.
    Child,
    /// Straight-line succession.
    Seq,
    True,
    False,
    /// Switch dispatch on a matched case value.
    Case(String),
    DefaultCase,
    /// Into a loop header from its body's end.
    LoopBack,
    /// Out of a loop header when the condition fails.
    LoopExit,
    Call,
    Return,
    Throw,
    Catch,
    Goto,
    /// DFG: a definition reaches this use.
    Reaches,
}

impl EdgeKind {
    pub fn name(&self) -> String {
        match self {
            EdgeKind::Child => "child".into(),
            EdgeKind::Seq => "seq".into(),
            EdgeKind::True => "true".into(),
            EdgeKind::False => "false".into(),
            EdgeKind::Case(value) => format!("case({value})"),
            EdgeKind::DefaultCase => "default".into(),
            EdgeKind::LoopBack => "loop_back".into(),
            EdgeKind::LoopExit => "loop_exit".into(),
            EdgeKind::Call => "call".into(),
            EdgeKind::Return => "return".into(),
            EdgeKind::Throw => "throw".into(),
            EdgeKind::Catch => "catch".into(),
            EdgeKind::Goto => "goto".into(),
            EdgeKind::Reaches => "reaches".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewNode {
    pub id: NodeId,
    pub kind: String,
    pub label: String,
    pub line: Option<usize>,
    /// Views this node belongs to. Empty means "whatever graph holds it";
    /// the composer fills in the union.
    pub views: View,
    pub extra: BTreeMap<String, String>,
}

impl ViewNode {
    pub fn new(id: NodeId, kind: impl Into<String>, label: impl Into<String>) -> Self {
        ViewNode {
            id,
            kind: kind.into(),
            label: label.into(),
            line: None,
            views: View::empty(),
            extra: BTreeMap::new(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ViewEdge {
    pub view: View,
    pub kind: EdgeKind,
    pub extra: BTreeMap<String, String>,
}

/// A labeled directed multigraph addressed by stable `NodeId`s.
///
/// Wraps `StableDiGraph` so removals (AST blacklist / collapse) never
/// invalidate ids, and keeps an id → index map so views can address nodes by
/// the identity table's ids rather than petgraph internals.
pub struct ViewGraph {
    pub view: View,
    inner: StableDiGraph<ViewNode, ViewEdge>,
    ids: HashMap<NodeId, NodeIndex>,
}

impl ViewGraph {
    pub fn new(view: View) -> Self {
        ViewGraph {
            view,
            inner: StableDiGraph::new(),
            ids: HashMap::new(),
        }
    }

    /// Insert a node, or return the index it already has. First insertion
    /// wins; later attribute merging is the composer's business.
    pub fn add_node(&mut self, node: ViewNode) -> NodeIndex {
        if let Some(&idx) = self.ids.get(&node.id) {
            return idx;
        }
        let id = node.id;
        let idx = self.inner.add_node(node);
        self.ids.insert(id, idx);
        idx
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ids.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&ViewNode> {
        self.ids.get(&id).and_then(|&idx| self.inner.node_weight(idx))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ViewNode> {
        let idx = *self.ids.get(&id)?;
        self.inner.node_weight_mut(idx)
    }

    pub fn add_edge(&mut self, source: NodeId, target: NodeId, kind: EdgeKind) {
        self.add_edge_with(source, target, kind, BTreeMap::new());
    }

    pub fn add_edge_with(
        &mut self,
        source: NodeId,
        target: NodeId,
        kind: EdgeKind,
        extra: BTreeMap<String, String>,
    ) {
        let view = self.view;
        self.add_edge_full(source, target, ViewEdge { view, kind, extra });
    }

    /// Insert an edge keeping the caller's view tag; composition uses this
    /// so merged edges remember the view they came from. Edges to ids the
    /// graph does not hold are dropped.
    pub fn add_edge_full(&mut self, source: NodeId, target: NodeId, edge: ViewEdge) {
        let (Some(&s), Some(&t)) = (self.ids.get(&source), self.ids.get(&target)) else {
            tracing::debug!(target: "graph", ?source, ?target, "edge endpoint missing, dropped");
            return;
        };
        self.inner.add_edge(s, t, edge);
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ViewNode> {
        self.inner.node_indices().filter_map(|idx| self.inner.node_weight(idx))
    }

    /// Edges in insertion order as `(source, target, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &ViewEdge)> {
        self.inner.edge_indices().filter_map(|idx| {
            let (s, t) = self.inner.edge_endpoints(idx)?;
            Some((
                self.inner[s].id,
                self.inner[t].id,
                self.inner.edge_weight(idx)?,
            ))
        })
    }

    pub fn has_edge(&self, source: NodeId, target: NodeId, kind: &EdgeKind) -> bool {
        self.edges_from(source)
            .any(|(t, e)| t == target && &e.kind == kind)
    }

    pub fn edges_from(&self, source: NodeId) -> impl Iterator<Item = (NodeId, &ViewEdge)> {
        self.ids
            .get(&source)
            .into_iter()
            .flat_map(|&idx| self.inner.edges_directed(idx, Direction::Outgoing))
            .map(|e| (self.inner[e.target()].id, e.weight()))
    }

    pub fn edges_to(&self, target: NodeId) -> impl Iterator<Item = (NodeId, &ViewEdge)> {
        self.ids
            .get(&target)
            .into_iter()
            .flat_map(|&idx| self.inner.edges_directed(idx, Direction::Incoming))
            .map(|e| (self.inner[e.source()].id, e.weight()))
    }

    /// Predecessor ids, edges of `skip` kinds excluded.
    pub fn preds_excluding(&self, target: NodeId, skip: &[EdgeKind]) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .edges_to(target)
            .filter(|(_, e)| !skip.contains(&e.kind))
            .map(|(s, _)| s)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Successor ids, edges of `skip` kinds excluded.
    pub fn succs_excluding(&self, source: NodeId, skip: &[EdgeKind]) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .edges_from(source)
            .filter(|(_, e)| !skip.contains(&e.kind))
            .map(|(t, _)| t)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Remove a node, bridging every incoming edge to every outgoing edge so
    /// paths through the removed node survive (AST blacklist minimize).
    pub fn remove_and_bridge(&mut self, id: NodeId) {
        let Some(&idx) = self.ids.get(&id) else { return };
        let incoming: Vec<(NodeIndex, ViewEdge)> = self
            .inner
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight().clone()))
            .collect();
        let outgoing: Vec<NodeIndex> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
            .collect();
        for (src, edge) in &incoming {
            for &dst in &outgoing {
                if !self.has_edge_idx(*src, dst, &edge.kind) {
                    self.inner.add_edge(*src, dst, edge.clone());
                }
            }
        }
        self.inner.remove_node(idx);
        self.ids.remove(&id);
    }

    /// Reroute every edge touching `dup` onto `rep`, dropping `dup` and any
    /// duplicate `(source, target, kind)` edges the reroute would create
    /// (AST name collapse).
    pub fn collapse_into(&mut self, rep: NodeId, dup: NodeId) {
        if rep == dup {
            return;
        }
        let (Some(&rep_idx), Some(&dup_idx)) = (self.ids.get(&rep), self.ids.get(&dup)) else {
            return;
        };
        let incoming: Vec<(NodeIndex, ViewEdge)> = self
            .inner
            .edges_directed(dup_idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight().clone()))
            .collect();
        let outgoing: Vec<(NodeIndex, ViewEdge)> = self
            .inner
            .edges_directed(dup_idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight().clone()))
            .collect();
        for (src, edge) in incoming {
            let src = if src == dup_idx { rep_idx } else { src };
            if !self.has_edge_idx(src, rep_idx, &edge.kind) {
                self.inner.add_edge(src, rep_idx, edge);
            }
        }
        for (dst, edge) in outgoing {
            let dst = if dst == dup_idx { rep_idx } else { dst };
            if !self.has_edge_idx(rep_idx, dst, &edge.kind) {
                self.inner.add_edge(rep_idx, dst, edge);
            }
        }
        self.inner.remove_node(dup_idx);
        self.ids.remove(&dup);
    }

    fn has_edge_idx(&self, src: NodeIndex, dst: NodeIndex, kind: &EdgeKind) -> bool {
        self.inner
            .edges_directed(src, Direction::Outgoing)
            .any(|e| e.target() == dst && &e.weight().kind == kind)
    }

    /// Ids reachable from `start` along any edge, `start` included.
    pub fn reachable_from(&self, start: NodeId) -> Vec<NodeId> {
        let Some(&start_idx) = self.ids.get(&start) else {
            return Vec::new();
        };
        let mut bfs = petgraph::visit::Bfs::new(&self.inner, start_idx);
        let mut out = Vec::new();
        while let Some(idx) = bfs.next(&self.inner) {
            out.push(self.inner[idx].id);
        }
        out
    }
}

impl std::fmt::Debug for ViewGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewGraph")
            .field("view", &self.view)
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}
