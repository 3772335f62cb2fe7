use crate::graph::{View, ViewGraph};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A soft failure: the stream is still complete, the trailer says what was
/// skipped or approximated, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, line: usize, col: usize) -> Self {
        Diagnostic {
            message: message.into(),
            line,
            col,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u32,
    pub views: Vec<String>,
    pub kind: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: u32,
    pub target: u32,
    pub view: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trailer {
    pub diagnostics: Vec<Diagnostic>,
}

/// The core's entire outbound contract: nodes, edges, and a trailer that is
/// present exactly when processing ran to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordStream {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer: Option<Trailer>,
}

fn view_rank(view: View) -> u8 {
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

/// Materialize a graph as a record stream. Nodes come out in ascending id
/// order; edges grouped by view (AST, CFG, DFG) and stably ordered by source
/// id within each group, so identical inputs give byte-identical streams.
pub fn stream(graph: &ViewGraph, diagnostics: Vec<Diagnostic>) -> RecordStream {
    let mut nodes: Vec<NodeRecord> = graph
        .nodes()
        .map(|n| {
            let views = if n.views.is_empty() { graph.view } else { n.views };
            NodeRecord {
                id: n.id.0,
                views: views.tags().into_iter().map(str::to_owned).collect(),
                kind: n.kind.clone(),
                label: n.label.clone(),
                line: n.line,
                extra: n.extra.clone(),
            }
        })
        .collect();
    nodes.sort_by_key(|n| n.id);

    let mut edges: Vec<(u8, u32, usize, EdgeRecord)> = graph
        .edges()
        .enumerate()
        .map(|(i, (s, t, e))| {
            (
                view_rank(e.view),
                s.0,
                i,
                EdgeRecord {
                    source: s.0,
                    target: t.0,
                    view: e.view.tag().to_owned(),
                    kind: e.kind.name(),
                    extra: e.extra.clone(),
                },
            )
        })
        .collect();
    edges.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));

    RecordStream {
        nodes,
        edges: edges.into_iter().map(|(_, _, _, e)| e).collect(),
        trailer: Some(Trailer { diagnostics }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, ViewNode};
    use crate::index::NodeId;

    #[test]
    fn nodes_sorted_by_id_edges_by_source() {
        let mut g = ViewGraph::new(View::CFG);
        for id in [4u32, 2, 9] {
            g.add_node(ViewNode::new(NodeId(id), "stmt", format!("n{id}")));
        }
        g.add_edge(NodeId(9), NodeId(4), EdgeKind::Seq);
        g.add_edge(NodeId(2), NodeId(9), EdgeKind::Seq);

        let stream = stream(&g, vec![]);
        let ids: Vec<u32> = stream.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 4, 9]);
        let sources: Vec<u32> = stream.edges.iter().map(|e| e.source).collect();
        assert_eq!(sources, vec![2, 9]);
        assert!(stream.trailer.is_some());
    }

    #[test]
    fn stream_serializes_without_empty_noise() {
        let mut g = ViewGraph::new(View::AST);
        g.add_node(ViewNode::new(NodeId(1), "identifier", "x"));
        let json = serde_json::to_string(&stream(&g, vec![])).unwrap();
        assert!(!json.contains("\"extra\""));
        assert!(!json.contains("\"line\""));
        assert!(json.contains("\"ast\""));
    }
}
