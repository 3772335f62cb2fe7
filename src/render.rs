use codeviews::RecordStream;
use codeviews::errors::CvResult;
use std::fmt::Write;

/// JSON node-link rendering: the record stream already is the node-link
/// shape, so this is a straight serialization.
pub fn to_json(stream: &RecordStream) -> CvResult<String> {
    serde_json::to_string_pretty(stream).map_err(|e| e.to_string().into())
}

fn dot_color(view: &str) -> &'static str {
    match view {
        "ast" => "gray50",
        "cfg" => "red3",
        "dfg" => "blue3",
        _ => "black",
    }
}

fn dot_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Graphviz rendering with one color per view and edge kinds as labels.
pub fn to_dot(stream: &RecordStream) -> String {
    let mut out = String::from("digraph codeviews {\n  node [shape=box, fontsize=10];\n");
    for node in &stream.nodes {
        let _ = writeln!(
            out,
            "  n{} [label=\"{}\"];",
            node.id,
            dot_escape(&node.label)
        );
    }
    for edge in &stream.edges {
        let _ = writeln!(
            out,
            "  n{} -> n{} [label=\"{}\", color={}];",
            edge.source,
            edge.target,
            dot_escape(&edge.kind),
            dot_color(&edge.view)
        );
    }
    out.push_str("}\n");
    out
}
