use crate::catalog::{Catalog, Family, catalog, family};
use crate::config::DfgConfig;
use crate::errors::{CvError, CvResult};
use crate::graph::{EdgeKind, View, ViewGraph, ViewNode};
use crate::index::{NodeId, NodeTable};
use crate::symbols::SymbolTable;
use crate::tree::{SourceTree, preorder_named};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use tracing::debug;
use tree_sitter::Node;

/// What a definition or use is *of*. Resolved bindings keep shadowed names
/// apart; unresolved identifiers fall back to their spelling.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum VarKey {
    Binding(NodeId),
    Named(String),
}

/// One definition: a variable and the CFG node that writes it. `undef`
/// marks declarators without an initializer, which still generate and kill.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Def {
    var: VarKey,
    site: NodeId,
    undef: bool,
}

#[derive(Debug, Default, Clone)]
struct StmtFacts {
    defs: Vec<(VarKey, bool)>,
    uses: Vec<VarKey>,
}

/// Build the statement-level DFG: run reaching definitions to a fixed point
/// over each function's CFG, then emit one `reaches` edge per definition
/// arriving at a use.
pub fn build(
    src: &SourceTree,
    table: &NodeTable,
    symbols: &SymbolTable,
    cfg_graph: &ViewGraph,
    cfg: &DfgConfig,
) -> CvResult<ViewGraph> {
    let cat = catalog(src.lang());
    let mut by_id: HashMap<NodeId, Node<'_>> = HashMap::new();
    for node in preorder_named(src.root()) {
        if let Some(id) = table.id_of(node) {
            by_id.insert(id, node);
        }
    }

    let mut out = ViewGraph::new(View::DFG);
    for node in preorder_named(src.root()) {
        if family(src.lang(), node.kind()) != Family::FunctionDef {
            continue;
        }
        let Some(entry) = table.id_of(node) else { continue };
        if !cfg_graph.contains(entry) {
            continue;
        }
        analyze_function(src, table, symbols, cfg_graph, cfg, cat, &by_id, entry, &mut out)?;
    }
    debug!(target: "rda", nodes = out.node_count(), edges = out.edge_count(), "dfg view built");
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn analyze_function(
    src: &SourceTree,
    table: &NodeTable,
    symbols: &SymbolTable,
    cfg_graph: &ViewGraph,
    cfg: &DfgConfig,
    cat: &'static Catalog,
    by_id: &HashMap<NodeId, Node<'_>>,
    entry: NodeId,
    out: &mut ViewGraph,
) -> CvResult<()> {
    // the function's own CFG slice: everything reachable without leaving
    // through a call edge
    let skip = [EdgeKind::Call];
    let mut nodes: Vec<NodeId> = Vec::new();
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut queue = VecDeque::from([entry]);
    seen.insert(entry);
    while let Some(n) = queue.pop_front() {
        nodes.push(n);
        for succ in cfg_graph.succs_excluding(n, &skip) {
            if seen.insert(succ) {
                queue.push_back(succ);
            }
        }
    }
    nodes.sort_unstable();
    let in_function: HashSet<NodeId> = nodes.iter().copied().collect();

    let mut facts: HashMap<NodeId, StmtFacts> = HashMap::new();
    for &n in &nodes {
        let f = match by_id.get(&n) {
            Some(&tn) => node_facts(src, table, symbols, cat, tn, &in_function),
            None => StmtFacts::default(),
        };
        facts.insert(n, f);
    }

    // GEN / KILL
    let mut universe: BTreeSet<Def> = BTreeSet::new();
    let mut gen_sets: HashMap<NodeId, BTreeSet<Def>> = HashMap::new();
    for &n in &nodes {
        let mut set = BTreeSet::new();
        for (var, undef) in &facts[&n].defs {
            let def = Def { var: var.clone(), site: n, undef: *undef };
            universe.insert(def.clone());
            set.insert(def);
        }
        gen_sets.insert(n, set);
    }
    let mut kill_sets: HashMap<NodeId, BTreeSet<Def>> = HashMap::new();
    for &n in &nodes {
        let vars: BTreeSet<&VarKey> = gen_sets[&n].iter().map(|d| &d.var).collect();
        let killed = universe
            .iter()
            .filter(|d| vars.contains(&d.var))
            .cloned()
            .collect();
        kill_sets.insert(n, killed);
    }

    let preds: HashMap<NodeId, Vec<NodeId>> = nodes
        .iter()
        .map(|&n| {
            let ps = cfg_graph
                .preds_excluding(n, &skip)
                .into_iter()
                .filter(|p| in_function.contains(p))
                .collect();
            (n, ps)
        })
        .collect();
    let succs: HashMap<NodeId, Vec<NodeId>> = nodes
        .iter()
        .map(|&n| {
            let ss = cfg_graph
                .succs_excluding(n, &skip)
                .into_iter()
                .filter(|s| in_function.contains(s))
                .collect();
            (n, ss)
        })
        .collect();

    // worklist fixed point
    let mut in_sets: HashMap<NodeId, BTreeSet<Def>> = HashMap::new();
    let mut out_sets: HashMap<NodeId, BTreeSet<Def>> =
        nodes.iter().map(|&n| (n, BTreeSet::new())).collect();
    let mut work: VecDeque<NodeId> = nodes.iter().copied().collect();
    let mut queued: HashSet<NodeId> = work.iter().copied().collect();
    let budget = (nodes.len() + 1) * (universe.len() + 2) * 4 + 64;
    let mut steps = 0usize;
    while let Some(n) = work.pop_front() {
        queued.remove(&n);
        steps += 1;
        if steps > budget {
            return Err(CvError::Rda(format!(
                "{} steps over {} nodes", steps, nodes.len()
            )));
        }
        let mut in_set: BTreeSet<Def> = BTreeSet::new();
        for p in &preds[&n] {
            in_set.extend(out_sets[p].iter().cloned());
        }
        let mut new_out: BTreeSet<Def> = gen_sets[&n].clone();
        for d in in_set.difference(&kill_sets[&n]) {
            new_out.insert(d.clone());
        }
        in_sets.insert(n, in_set);
        if out_sets[&n] != new_out {
            out_sets.insert(n, new_out);
            for &s in &succs[&n] {
                if queued.insert(s) {
                    work.push_back(s);
                }
            }
        }
    }

    let use_lines = if cfg.last_use {
        Some(reaching_use_lines(&nodes, &facts, &preds, &succs, cfg_graph))
    } else {
        None
    };

    // materialize edges in (source, target) order
    let mut pairs: BTreeSet<(NodeId, NodeId, VarKey, bool)> = BTreeSet::new();
    for &n in &nodes {
        let used: BTreeSet<&VarKey> = facts[&n].uses.iter().collect();
        let Some(in_set) = in_sets.get(&n) else { continue };
        for var in used {
            for d in in_set.iter().filter(|d| d.var == *var) {
                pairs.insert((d.site, n, d.var.clone(), d.undef));
            }
        }
    }
    for (site, target, var, undef) in pairs {
        ensure_node(out, cfg_graph, site);
        ensure_node(out, cfg_graph, target);
        let mut extra = BTreeMap::new();
        if undef {
            extra.insert("undef".to_owned(), "true".to_owned());
        }
        if cfg.last_def
            && let Some(line) = cfg_graph.node(site).and_then(|n| n.line)
        {
            extra.insert("last_def".to_owned(), line.to_string());
        }
        if let Some(lines) = &use_lines
            && let Some(line) = lines.get(&(target, var.clone()))
        {
            extra.insert("last_use".to_owned(), line.to_string());
        }
        out.add_edge_with(site, target, EdgeKind::Reaches, extra);
    }
    Ok(())
}

fn ensure_node(out: &mut ViewGraph, cfg_graph: &ViewGraph, id: NodeId) {
    if out.contains(id) {
        return;
    }
    if let Some(n) = cfg_graph.node(id) {
        let mut copy = ViewNode::new(n.id, n.kind.clone(), n.label.clone());
        copy.line = n.line;
        out.add_node(copy);
    }
}

/// Symmetric "reaching uses" pass for the `last_use` annotation: a use of v
/// survives until v is used or redefined again, so what arrives at a node is
/// exactly the most recent prior use along each path. Merges take the
/// maximum line for determinism.
fn reaching_use_lines(
    nodes: &[NodeId],
    facts: &HashMap<NodeId, StmtFacts>,
    preds: &HashMap<NodeId, Vec<NodeId>>,
    succs: &HashMap<NodeId, Vec<NodeId>>,
    cfg_graph: &ViewGraph,
) -> HashMap<(NodeId, VarKey), usize> {
    type UseFact = (VarKey, NodeId);
    let mut gen_u: HashMap<NodeId, BTreeSet<UseFact>> = HashMap::new();
    let mut touched: HashMap<NodeId, BTreeSet<VarKey>> = HashMap::new();
    for &n in nodes {
        let f = &facts[&n];
        gen_u.insert(n, f.uses.iter().map(|v| (v.clone(), n)).collect());
        let mut t: BTreeSet<VarKey> = f.uses.iter().cloned().collect();
        t.extend(f.defs.iter().map(|(v, _)| v.clone()));
        touched.insert(n, t);
    }

    let mut out_sets: HashMap<NodeId, BTreeSet<UseFact>> =
        nodes.iter().map(|&n| (n, BTreeSet::new())).collect();
    let mut in_sets: HashMap<NodeId, BTreeSet<UseFact>> = HashMap::new();
    let mut work: VecDeque<NodeId> = nodes.iter().copied().collect();
    let mut queued: HashSet<NodeId> = work.iter().copied().collect();
    while let Some(n) = work.pop_front() {
        queued.remove(&n);
        let mut in_set: BTreeSet<UseFact> = BTreeSet::new();
        for p in &preds[&n] {
            in_set.extend(out_sets[p].iter().cloned());
        }
        let mut new_out = gen_u[&n].clone();
        for u in &in_set {
            if !touched[&n].contains(&u.0) {
                new_out.insert(u.clone());
            }
        }
        in_sets.insert(n, in_set);
        if out_sets[&n] != new_out {
            out_sets.insert(n, new_out);
            for &s in &succs[&n] {
                if queued.insert(s) {
                    work.push_back(s);
                }
            }
        }
    }

    let mut lines: HashMap<(NodeId, VarKey), usize> = HashMap::new();
    for &n in nodes {
        let Some(in_set) = in_sets.get(&n) else { continue };
        for (var, site) in in_set {
            if let Some(line) = cfg_graph.node(*site).and_then(|s| s.line) {
                let slot = lines.entry((n, var.clone())).or_insert(line);
                *slot = (*slot).max(line);
            }
        }
    }
    lines
}

/// Defs and uses visible at one CFG node: its own expressions only, not the
/// nested statements (those are CFG nodes of their own).
fn node_facts(
    src: &SourceTree,
    table: &NodeTable,
    symbols: &SymbolTable,
    cat: &'static Catalog,
    root: Node<'_>,
    cfg_nodes: &HashSet<NodeId>,
) -> StmtFacts {
    let mut facts = StmtFacts::default();
    let mut stack: Vec<Node<'_>> = Vec::new();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        stack.push(child);
    }

    while let Some(n) = stack.pop() {
        // nested statements and sibling CFG nodes keep their own facts
        if cat.statements.contains(n.kind()) {
            continue;
        }
        if table.id_of(n).is_some_and(|id| cfg_nodes.contains(&id)) {
            continue;
        }
        if n.named_child_count() > 0 {
            let mut c = n.walk();
            for child in n.named_children(&mut c) {
                stack.push(child);
            }
            continue;
        }
        classify_leaf(src, table, symbols, cat, n, &mut facts);
    }
    // the root's own leaves (e.g. an identifier expression statement)
    if root.named_child_count() == 0 {
        classify_leaf(src, table, symbols, cat, root, &mut facts);
    }
    facts
}

fn classify_leaf(
    src: &SourceTree,
    table: &NodeTable,
    symbols: &SymbolTable,
    cat: &'static Catalog,
    leaf: Node<'_>,
    facts: &mut StmtFacts,
) {
    let Some(id) = table.id_of(leaf) else { return };
    if symbols.methods.contains(&id) {
        return;
    }
    if symbols.declaration.contains_key(&id) {
        facts.defs.push((VarKey::Binding(id), !has_initializer(leaf)));
        return;
    }
    if !cat.identifiers.contains(leaf.kind()) {
        return;
    }
    let key = match symbols.binding_of(id) {
        Some(b) => VarKey::Binding(b),
        None => VarKey::Named(src.text(leaf)),
    };
    let Some(parent) = leaf.parent() else {
        facts.uses.push(key);
        return;
    };
    let assigned = parent.kind() == "assignment_expression"
        && parent
            .child_by_field_name("left")
            .is_some_and(|l| l == leaf);
    if assigned {
        facts.defs.push((key.clone(), false));
        let compound = parent
            .child_by_field_name("operator")
            .is_some_and(|op| src.text(op) != "=");
        if compound {
            facts.uses.push(key);
        }
        return;
    }
    if parent.kind() == "update_expression" {
        facts.defs.push((key.clone(), false));
        facts.uses.push(key);
        return;
    }
    facts.uses.push(key);
}

/// Does this declared identifier come with a value? Parameters and loop/catch
/// bindings count as initialized; a bare declarator does not.
fn has_initializer(leaf: Node<'_>) -> bool {
    let mut parent = leaf.parent();
    while let Some(p) = parent {
        match p.kind() {
            "pointer_declarator" | "array_declarator" => parent = p.parent(),
            "init_declarator" | "variable_declarator" => {
                return p.child_by_field_name("value").is_some();
            }
            "declaration" => return false,
            _ => return true,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols;
    use crate::tree::{Lang, parse_fixture};
    use crate::views::cfg;

    fn dfg_of(code: &str, lang: Lang, dcfg: &DfgConfig) -> (ViewGraph, ViewGraph) {
        let src = parse_fixture(code, lang);
        let mut table = NodeTable::build(&src);
        let syms = symbols::extract(&src, &table).unwrap();
        let (cfg_graph, diags) = cfg::build(&src, &mut table).unwrap();
        assert!(diags.is_empty());
        let dfg_graph = build(&src, &table, &syms, &cfg_graph, dcfg).unwrap();
        (dfg_graph, cfg_graph)
    }

    fn id_of(g: &ViewGraph, label: &str) -> NodeId {
        g.nodes()
            .find(|n| n.label == label)
            .map(|n| n.id)
            .unwrap_or_else(|| panic!("no node labeled {label:?}"))
    }

    fn reaches(g: &ViewGraph, from: &str, to: &str) -> bool {
        let (f, t) = (id_of(g, from), id_of(g, to));
        g.edges_from(f)
            .any(|(target, e)| target == t && e.kind == EdgeKind::Reaches)
    }

    fn sources_into(g: &ViewGraph, to: &str) -> Vec<String> {
        let t = id_of(g, to);
        let mut out: Vec<String> = g
            .edges_to(t)
            .filter(|(_, e)| e.kind == EdgeKind::Reaches)
            .map(|(s, _)| g.node(s).unwrap().label.clone())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn branch_definitions_merge_at_the_join() {
        let (g, _) = dfg_of(
            "int f(int x) { int a = 1; if (x > 0) { a = 2; } else { a = 3; } return a; }",
            Lang::C,
            &DfgConfig::default(),
        );
        assert_eq!(sources_into(&g, "return a;"), vec!["a = 2;", "a = 3;"]);
        // the parameter reaches the branch condition
        assert!(reaches(&g, "f(int x)", "if(x > 0)"));
    }

    #[test]
    fn loop_carried_definitions_reach_the_header() {
        let (g, _) = dfg_of(
            "int g(int n) { int s = 0; int i = 0; \
             while (i < n) { if (i % 2 == 0) { i = i + 1; continue; } s = s + i; } \
             return s; }",
            Lang::C,
            &DfgConfig::default(),
        );
        let into_header = sources_into(&g, "while(i < n)");
        assert!(into_header.contains(&"int i = 0;".to_owned()));
        assert!(into_header.contains(&"i = i + 1;".to_owned()));
        assert_eq!(sources_into(&g, "return s;"), vec!["int s = 0;", "s = s + i;"]);
    }

    #[test]
    fn goto_paths_carry_definitions() {
        let (g, _) = dfg_of(
            "int k(int x) { int r = 0; if (x < 0) goto err; r = x * 2; goto end; \
             err: r = -1; end: return r; }",
            Lang::C,
            &DfgConfig::default(),
        );
        assert_eq!(sources_into(&g, "return r;"), vec!["r = -1;", "r = x * 2;"]);
    }

    #[test]
    fn shadowed_bindings_stay_apart() {
        let (g, _) = dfg_of(
            "int f() { int x = 1; { int x = 2; use(x); } use(x); return x; }",
            Lang::C,
            &DfgConfig::default(),
        );
        // two distinct use(x); statements: find both nodes by line
        let uses: Vec<NodeId> = g
            .nodes()
            .filter(|n| n.label == "use(x);")
            .map(|n| n.id)
            .collect();
        assert_eq!(uses.len(), 2);
        let inner = *uses.iter().min().unwrap();
        let outer = *uses.iter().max().unwrap();
        let label_of = |id: NodeId| g.node(id).unwrap().label.clone();
        let srcs = |t: NodeId| -> Vec<String> {
            let mut v: Vec<String> = g
                .edges_to(t)
                .filter(|(_, e)| e.kind == EdgeKind::Reaches)
                .map(|(s, _)| label_of(s))
                .collect();
            v.sort();
            v
        };
        assert_eq!(srcs(inner), vec!["int x = 2;"]);
        assert_eq!(srcs(outer), vec!["int x = 1;"]);
    }

    #[test]
    fn uninitialized_declarator_is_an_undef_definition() {
        let (g, _) = dfg_of(
            "int f(int c) { int r; if (c) { r = 1; } return r; }",
            Lang::C,
            &DfgConfig::default(),
        );
        let srcs = sources_into(&g, "return r;");
        assert_eq!(srcs, vec!["int r;", "r = 1;"]);
        let t = id_of(&g, "return r;");
        let undef_edges: Vec<_> = g
            .edges_to(t)
            .filter(|(_, e)| e.extra.get("undef").map(String::as_str) == Some("true"))
            .collect();
        assert_eq!(undef_edges.len(), 1);
    }

    #[test]
    fn assignment_kills_the_undef_definition() {
        let (g, _) = dfg_of("int f() { int r; r = 1; return r; }", Lang::C, &DfgConfig::default());
        assert_eq!(sources_into(&g, "return r;"), vec!["r = 1;"]);
    }

    #[test]
    fn no_edge_for_never_defined_names() {
        // library globals have no in-file definition: P5 forbids inventing one
        let (g, _) = dfg_of("int f() { return errno; }", Lang::C, &DfgConfig::default());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn last_def_and_last_use_annotations_coexist() {
        let code = "int f(int x) {\n int a = x;\n use(a);\n return a;\n}";
        let (g, _) = dfg_of(
            code,
            Lang::C,
            &DfgConfig { last_def: true, last_use: true },
        );
        let t = id_of(&g, "return a;");
        let edge = g
            .edges_to(t)
            .find(|(s, e)| e.kind == EdgeKind::Reaches && *s == id_of(&g, "int a = x;"))
            .map(|(_, e)| e.clone())
            .expect("a's definition reaches the return");
        assert_eq!(edge.extra.get("last_def").map(String::as_str), Some("2"));
        // the prior use(a); on line 3 is the latest use before the return
        assert_eq!(edge.extra.get("last_use").map(String::as_str), Some("3"));
    }

    #[test]
    fn java_parameters_and_catch_bindings_define() {
        let code = "class A { int f(int x) { int y = 0; \
                    try { y = x; } catch (Exception e) { y = 2; } return y; } }";
        let (g, _) = dfg_of(code, Lang::Java, &DfgConfig::default());
        assert!(reaches(&g, "f(int x)", "y = x;"));
        assert_eq!(sources_into(&g, "return y;"), vec!["y = 2;", "y = x;"]);
    }

    #[test]
    fn compound_assignment_reads_and_writes() {
        let (g, _) = dfg_of(
            "int f() { int a = 1; a += 2; return a; }",
            Lang::C,
            &DfgConfig::default(),
        );
        // a += 2 both uses the initial a and redefines it
        assert!(reaches(&g, "int a = 1;", "a += 2;"));
        assert_eq!(sources_into(&g, "return a;"), vec!["a += 2;"]);
    }
}
