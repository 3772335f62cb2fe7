use crate::graph::{View, ViewGraph, ViewNode};
use crate::index::NodeId;
use std::collections::BTreeMap;
use tracing::debug;

fn label_rank(view: View) -> u8 {
    // label/kind resolution: CFG is the most informative, then DFG, then AST
    if view == View::AST {
        0
    } else if view == View::DFG {
        1
    } else if view == View::CFG {
        2
    } else {
        3
    }
}

fn edge_rank(view: View) -> u8 {
    if view == View::AST {
        0
    } else if view == View::CFG {
        1
    } else if view == View::DFG {
        2
    } else {
        3
    }
}

/// Union of view graphs under the shared node namespace: nodes with the same
/// id merge (attributes prefixed by their view tag, labels resolved CFG >
/// DFG > AST), every edge survives with its own view tag, and nothing is
/// bridged between views.
pub fn compose(graphs: &[ViewGraph]) -> ViewGraph {
    let mut union_view = View::empty();
    for g in graphs {
        union_view |= g.view;
    }
    let mut out = ViewGraph::new(union_view);

    let mut by_label_priority: Vec<&ViewGraph> = graphs.iter().collect();
    by_label_priority.sort_by_key(|g| label_rank(g.view));

    let mut merged: BTreeMap<NodeId, ViewNode> = BTreeMap::new();
    for g in by_label_priority {
        let prefix = g.view.tag();
        for node in g.nodes() {
            let slot = merged.entry(node.id).or_insert_with(|| {
                let mut fresh = ViewNode::new(node.id, node.kind.clone(), node.label.clone());
                fresh.views = View::empty();
                fresh
            });
            slot.views |= g.view;
            slot.kind = node.kind.clone();
            slot.label = node.label.clone();
            if node.line.is_some() {
                slot.line = node.line;
            }
            for (key, value) in &node.extra {
                slot.extra.insert(format!("{prefix}.{key}"), value.clone());
            }
        }
    }
    for (_, node) in merged {
        out.add_node(node);
    }

    let mut by_edge_order: Vec<&ViewGraph> = graphs.iter().collect();
    by_edge_order.sort_by_key(|g| edge_rank(g.view));
    for g in by_edge_order {
        for (source, target, edge) in g.edges() {
            out.add_edge_full(source, target, edge.clone());
        }
    }

    debug!(
        target: "compose",
        views = ?union_view,
        nodes = out.node_count(),
        edges = out.edge_count(),
        "views composed"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeKind;

    fn graph(view: View, ids: &[u32]) -> ViewGraph {
        let mut g = ViewGraph::new(view);
        for &id in ids {
            let mut n = ViewNode::new(NodeId(id), "stmt", format!("{}-{id}", view.tag()));
            n.extra.insert("note".into(), view.tag().into());
            g.add_node(n);
        }
        g
    }

    #[test]
    fn edge_counts_add_up_and_tags_survive() {
        let mut ast = graph(View::AST, &[1, 2, 3]);
        ast.add_edge(NodeId(1), NodeId(2), EdgeKind::Child);
        ast.add_edge(NodeId(1), NodeId(3), EdgeKind::Child);
        let mut cfg = graph(View::CFG, &[2, 3]);
        cfg.add_edge(NodeId(2), NodeId(3), EdgeKind::Seq);

        let composed = compose(&[ast, cfg]);
        assert_eq!(composed.edge_count(), 3);
        let views: Vec<View> = composed.edges().map(|(_, _, e)| e.view).collect();
        assert_eq!(views.iter().filter(|v| **v == View::AST).count(), 2);
        assert_eq!(views.iter().filter(|v| **v == View::CFG).count(), 1);
    }

    #[test]
    fn shared_nodes_merge_with_cfg_label_winning() {
        let ast = graph(View::AST, &[7]);
        let cfg = graph(View::CFG, &[7]);
        let composed = compose(&[ast, cfg]);
        assert_eq!(composed.node_count(), 1);
        let node = composed.node(NodeId(7)).unwrap();
        assert_eq!(node.label, "cfg-7");
        assert_eq!(node.views, View::AST | View::CFG);
        // each view's attributes kept apart by prefix
        assert_eq!(node.extra.get("ast.note").map(String::as_str), Some("ast"));
        assert_eq!(node.extra.get("cfg.note").map(String::as_str), Some("cfg"));
    }

    #[test]
    fn composition_never_bridges_views() {
        let mut ast = graph(View::AST, &[1, 2]);
        ast.add_edge(NodeId(1), NodeId(2), EdgeKind::Child);
        let dfg = graph(View::DFG, &[3]);
        let composed = compose(&[ast, dfg]);
        // node 3 stays isolated; no edge appears between views
        assert_eq!(composed.edge_count(), 1);
        assert_eq!(composed.edges_from(NodeId(3)).count(), 0);
        assert_eq!(composed.edges_to(NodeId(3)).count(), 0);
    }

    #[test]
    fn single_view_composition_is_the_identity_on_edges() {
        let mut cfg = graph(View::CFG, &[1, 2]);
        cfg.add_edge(NodeId(1), NodeId(2), EdgeKind::True);
        let composed = compose(&[cfg]);
        assert_eq!(composed.edge_count(), 1);
        assert!(composed.has_edge(NodeId(1), NodeId(2), &EdgeKind::True));
    }
}
