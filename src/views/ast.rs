use crate::catalog::catalog;
use crate::config::AstConfig;
use crate::graph::{EdgeKind, View, ViewGraph, ViewNode};
use crate::index::{NodeId, NodeTable};
use crate::symbols::SymbolTable;
use crate::tree::{SourceTree, preorder_named};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Project the named tree into an AST view graph, then apply the optional
/// transforms: blacklist minimize first (so we never collapse into a node
/// about to disappear), name collapse second.
pub fn build(
    src: &SourceTree,
    table: &NodeTable,
    symbols: &SymbolTable,
    cfg: &AstConfig,
) -> ViewGraph {
    let mut g = ViewGraph::new(View::AST);

    for node in preorder_named(src.root()) {
        let Some(id) = table.id_of(node) else { continue };
        g.add_node(ViewNode::new(id, node.kind(), src.text(node)).at_line(src.line(node)));
    }
    for node in preorder_named(src.root()) {
        let Some(pid) = table.id_of(node) else { continue };
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if let Some(cid) = table.id_of(child) {
                g.add_edge(pid, cid, EdgeKind::Child);
            }
        }
    }

    if !cfg.blacklist.is_empty() {
        blacklist_minimize(&mut g, &cfg.blacklist);
    }
    if cfg.collapse {
        collapse_names(&mut g, src, symbols);
    }
    debug!(target: "ast", nodes = g.node_count(), edges = g.edge_count(), "ast view built");
    g
}

/// Remove every node of a blacklisted kind, bridging each predecessor to
/// each successor so every surviving node keeps its path to the root.
fn blacklist_minimize(g: &mut ViewGraph, blacklist: &[String]) {
    let black: HashSet<&str> = blacklist.iter().map(String::as_str).collect();
    let mut doomed: Vec<NodeId> = g
        .nodes()
        .filter(|n| black.contains(n.kind.as_str()))
        .map(|n| n.id)
        .collect();
    doomed.sort_unstable();
    for id in doomed {
        g.remove_and_bridge(id);
    }
}

/// Collapse same-text identifier leaves onto the minimum-id representative.
fn collapse_names(g: &mut ViewGraph, src: &SourceTree, symbols: &SymbolTable) {
    let cat = catalog(src.lang());
    let mut groups: BTreeMap<&str, Vec<NodeId>> = BTreeMap::new();
    for tok in &symbols.tokens {
        let Some(node) = g.node(*tok) else { continue };
        if cat.identifiers.contains(node.kind.as_str()) {
            groups.entry(symbols.label[tok].as_str()).or_default().push(*tok);
        }
    }
    for ids in groups.into_values() {
        let Some(&rep) = ids.iter().min() else { continue };
        for dup in ids {
            g.collapse_into(rep, dup);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols;
    use crate::tree::{Lang, parse_fixture};

    fn ast_of(code: &str, cfg: &AstConfig) -> (ViewGraph, NodeTable) {
        let src = parse_fixture(code, Lang::C);
        let table = NodeTable::build(&src);
        let syms = symbols::extract(&src, &table).unwrap();
        (build(&src, &table, &syms, cfg), table)
    }

    fn root_id(g: &ViewGraph) -> NodeId {
        g.nodes()
            .find(|n| n.kind == "translation_unit")
            .map(|n| n.id)
            .unwrap()
    }

    #[test]
    fn plain_projection_mirrors_the_tree() {
        let src = parse_fixture("int f() { return 0; }", Lang::C);
        let table = NodeTable::build(&src);
        let syms = symbols::extract(&src, &table).unwrap();
        let g = build(&src, &table, &syms, &AstConfig::default());
        assert_eq!(g.node_count(), table.named_len());
        // a tree with n nodes has n-1 parent edges
        assert_eq!(g.edge_count(), table.named_len() - 1);
    }

    #[test]
    fn blacklist_bridges_over_removed_kinds() {
        let cfg = AstConfig {
            blacklist: vec!["compound_statement".into()],
            collapse: false,
        };
        let (g, _) = ast_of("int f() { return 0; }", &cfg);
        assert!(g.nodes().all(|n| n.kind != "compound_statement"));
        // every surviving node still reachable from the root
        let reachable = g.reachable_from(root_id(&g));
        assert_eq!(reachable.len(), g.node_count());
    }

    #[test]
    fn collapse_leaves_one_node_per_name() {
        let cfg = AstConfig {
            blacklist: vec![],
            collapse: true,
        };
        let (g, _) = ast_of("int f() { int a = 1; a = a + 2; return a; }", &cfg);
        let a_nodes: Vec<_> = g.nodes().filter(|n| n.label == "a" && n.kind == "identifier").collect();
        assert_eq!(a_nodes.len(), 1);
    }

    #[test]
    fn collapse_picks_minimum_id_representative() {
        let cfg = AstConfig {
            blacklist: vec![],
            collapse: true,
        };
        let code = "int f() { int a = 1; a = 2; return a; }";
        let (collapsed, _) = ast_of(code, &cfg);
        let (plain, _) = ast_of(code, &AstConfig::default());
        let min_a = plain
            .nodes()
            .filter(|n| n.label == "a" && n.kind == "identifier")
            .map(|n| n.id)
            .min()
            .unwrap();
        assert!(collapsed.contains(min_a));
    }

    #[test]
    fn collapse_is_idempotent() {
        let src = parse_fixture("int f() { int a = 1; a = 2; return a; }", Lang::C);
        let table = NodeTable::build(&src);
        let syms = symbols::extract(&src, &table).unwrap();
        let mut g = build(
            &src,
            &table,
            &syms,
            &AstConfig { blacklist: vec![], collapse: true },
        );
        let (nodes, edges) = (g.node_count(), g.edge_count());
        collapse_names(&mut g, &src, &syms);
        assert_eq!((g.node_count(), g.edge_count()), (nodes, edges));
    }

    #[test]
    fn blacklist_then_collapse_commutes_with_prefiltered_collapse() {
        // Collapsing after removing a kind gives the same shape as collapsing
        // a graph that never had it.
        let code = "int f() { int a = 1; a = 2; return a; }";
        let both = AstConfig {
            blacklist: vec!["number_literal".into()],
            collapse: true,
        };
        let (g1, _) = ast_of(code, &both);
        let (mut g2, _) = ast_of(
            code,
            &AstConfig { blacklist: vec!["number_literal".into()], collapse: false },
        );
        let src = parse_fixture(code, Lang::C);
        let table = NodeTable::build(&src);
        let syms = symbols::extract(&src, &table).unwrap();
        collapse_names(&mut g2, &src, &syms);

        let mut ids1: Vec<NodeId> = g1.nodes().map(|n| n.id).collect();
        let mut ids2: Vec<NodeId> = g2.nodes().map(|n| n.id).collect();
        ids1.sort_unstable();
        ids2.sort_unstable();
        assert_eq!(ids1, ids2);
        assert_eq!(g1.edge_count(), g2.edge_count());
    }
}
