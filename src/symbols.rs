use crate::catalog::{Catalog, catalog};
use crate::errors::{CvError, CvResult};
use crate::index::{NodeId, NodeTable};
use crate::tree::SourceTree;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use tree_sitter::Node;

/// Everything the view builders need to know about names: every leaf token,
/// its text and line, which identifiers declare bindings, which use them,
/// and the lexical scope chain active at every node.
#[derive(Debug, Default)]
pub struct SymbolTable {
    /// Leaf node ids in source order.
    pub tokens: Vec<NodeId>,
    pub label: HashMap<NodeId, String>,
    pub start_line: HashMap<NodeId, usize>,
    /// Method/function identifiers, declarations and call sites both.
    pub methods: HashSet<NodeId>,
    /// The subset of `methods` that appear at a call site.
    pub calls: HashSet<NodeId>,
    /// Identifier nodes that introduce a binding, with the declared name.
    pub declaration: HashMap<NodeId, String>,
    /// Use → resolved declaration. Unresolved uses are simply absent.
    pub declaration_map: HashMap<NodeId, NodeId>,
    /// Active scope stack at each named node, outermost first.
    pub scope_map: HashMap<NodeId, Vec<u32>>,
    /// Declared type text, where the declaring construct carries one.
    pub data_type: HashMap<NodeId, String>,
}

impl SymbolTable {
    /// The binding a leaf belongs to: itself if it declares, its resolved
    /// declaration if it uses one.
    pub fn binding_of(&self, leaf: NodeId) -> Option<NodeId> {
        if self.declaration.contains_key(&leaf) {
            return Some(leaf);
        }
        self.declaration_map.get(&leaf).copied()
    }
}

pub fn extract(src: &SourceTree, table: &NodeTable) -> CvResult<SymbolTable> {
    let mut ex = Extractor {
        src,
        table,
        cat: catalog(src.lang()),
        scopes: Vec::new(),
        next_scope: 0,
        out: SymbolTable::default(),
        uses: Vec::new(),
    };
    ex.walk(src.root())?;
    if !ex.scopes.is_empty() {
        return Err(CvError::Scope(format!(
            "{} scopes left open after the walk",
            ex.scopes.len()
        )));
    }
    ex.resolve();
    debug!(
        target: "symbols",
        tokens = ex.out.tokens.len(),
        decls = ex.out.declaration.len(),
        resolved = ex.out.declaration_map.len(),
        "extraction done"
    );
    Ok(ex.out)
}

struct Extractor<'a> {
    src: &'a SourceTree,
    table: &'a NodeTable,
    cat: &'static Catalog,
    scopes: Vec<u32>,
    next_scope: u32,
    out: SymbolTable,
    uses: Vec<(NodeId, String, Vec<u32>)>,
}

/// Is `node` one of the children filling `field` on `parent`?
fn in_field(parent: Node<'_>, node: Node<'_>, field: &str) -> bool {
    let mut cursor = parent.walk();
    parent
        .children_by_field_name(field, &mut cursor)
        .any(|c| c == node)
}

impl Extractor<'_> {
    fn walk(&mut self, node: Node<'_>) -> CvResult<()> {
        let kind = node.kind();
        let introduces = self.cat.scope_introducers.contains(kind);
        if introduces {
            self.scopes.push(self.next_scope);
            self.next_scope += 1;
        }

        if let Some(id) = self.table.id_of(node) {
            self.out.scope_map.insert(id, self.scopes.clone());
            if node.named_child_count() == 0 && !self.cat.comments.contains(kind) {
                self.leaf(node, id);
            }
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children {
            self.walk(child)?;
        }

        if introduces {
            self.scopes
                .pop()
                .ok_or_else(|| CvError::Scope("pop on empty scope stack".into()))?;
        }
        Ok(())
    }

    fn leaf(&mut self, node: Node<'_>, id: NodeId) {
        let text = self.src.text(node);
        self.out.tokens.push(id);
        self.out.label.insert(id, text.clone());
        self.out.start_line.insert(id, self.src.line(node));

        let Some(parent) = node.parent() else { return };
        let pk = parent.kind();

        // method name at its declaration
        if self.cat.method_decl_parents.contains(pk)
            && (in_field(parent, node, "declarator") || in_field(parent, node, "name"))
        {
            self.out.methods.insert(id);
            return;
        }

        // callee at a call site; the argument list sibling confirms the call
        if self.cat.call_parents.contains(pk)
            && (in_field(parent, node, "function") || in_field(parent, node, "name"))
        {
            self.out.methods.insert(id);
            let called = node
                .next_named_sibling()
                .is_some_and(|s| self.cat.argument_lists.contains(s.kind()));
            if called {
                self.out.calls.insert(id);
            }
            return;
        }

        if !self.cat.identifiers.contains(node.kind()) {
            return;
        }

        if self.cat.declarators.contains(pk)
            && (in_field(parent, node, "declarator") || in_field(parent, node, "name"))
        {
            self.out.declaration.insert(id, text);
            if let Some(ty) = self.declared_type(node) {
                self.out.data_type.insert(id, ty);
            }
        } else {
            self.uses.push((id, text, self.scopes.clone()));
        }
    }

    /// The declaring construct's type child, looked up a few ancestors deep:
    /// `int a = 1` puts it on the declaration, two levels above the name.
    fn declared_type(&self, node: Node<'_>) -> Option<String> {
        let mut anc = node.parent();
        for _ in 0..4 {
            let a = anc?;
            if let Some(t) = a.child_by_field_name("type")
                && self.cat.type_kinds.contains(t.kind())
            {
                return Some(self.src.text(t));
            }
            anc = a.parent();
        }
        None
    }

    /// Link each use to the innermost visible declaration of the same name:
    /// candidates are declarations whose scope chain is a prefix of the
    /// use's; the longest prefix wins, ties go to the greatest id.
    fn resolve(&mut self) {
        let mut by_name: HashMap<&str, Vec<NodeId>> = HashMap::new();
        for (id, name) in &self.out.declaration {
            by_name.entry(name.as_str()).or_default().push(*id);
        }
        for ids in by_name.values_mut() {
            ids.sort_unstable();
        }

        let mut resolved = Vec::new();
        for (use_id, name, scope) in &self.uses {
            let Some(cands) = by_name.get(name.as_str()) else {
                continue;
            };
            let mut best: Option<(usize, NodeId)> = None;
            for &decl in cands {
                let decl_scope = &self.out.scope_map[&decl];
                let visible = decl_scope.len() <= scope.len()
                    && scope[..decl_scope.len()] == decl_scope[..];
                if !visible {
                    continue;
                }
                let key = (decl_scope.len(), decl);
                if best.is_none_or(|b| key > b) {
                    best = Some(key);
                }
            }
            if let Some((_, decl)) = best {
                resolved.push((*use_id, decl));
            }
        }
        self.out.declaration_map.extend(resolved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Lang, parse_fixture};

    fn tables(code: &str, lang: Lang) -> (SymbolTable, NodeTable) {
        let src = parse_fixture(code, lang);
        let table = NodeTable::build(&src);
        let symbols = extract(&src, &table).unwrap();
        (symbols, table)
    }

    fn decl_ids(sym: &SymbolTable, name: &str) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = sym
            .declaration
            .iter()
            .filter(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn use_ids(sym: &SymbolTable, name: &str) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = sym
            .declaration_map
            .keys()
            .filter(|id| sym.label[id] == name)
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn declarations_record_name_and_type() {
        let (sym, _) = tables("int f() { int a = 1; return a; }", Lang::C);
        let decls = decl_ids(&sym, "a");
        assert_eq!(decls.len(), 1);
        assert_eq!(sym.data_type[&decls[0]], "int");
    }

    #[test]
    fn initializer_rhs_is_a_use_not_a_declaration() {
        let (sym, _) = tables("int f(int b) { int a = b; return a; }", Lang::C);
        assert_eq!(decl_ids(&sym, "b").len(), 1, "parameter declares b");
        let b_uses = use_ids(&sym, "b");
        assert_eq!(b_uses.len(), 1, "rhs b resolves as a use");
        assert_eq!(sym.declaration_map[&b_uses[0]], decl_ids(&sym, "b")[0]);
    }

    #[test]
    fn scope_chain_of_decl_prefixes_every_use() {
        let (sym, _) = tables(
            "int f(int x) { int a = 1; if (x > 0) { a = 2; } return a; }",
            Lang::C,
        );
        for (use_id, decl_id) in &sym.declaration_map {
            let ds = &sym.scope_map[decl_id];
            let us = &sym.scope_map[use_id];
            assert!(ds.len() <= us.len() && us[..ds.len()] == ds[..]);
        }
    }

    #[test]
    fn shadowing_resolves_to_innermost() {
        let code = "int f() { int x = 1; { int x = 2; use(x); } use(x); return x; }";
        let (sym, _) = tables(code, Lang::C);
        let decls = decl_ids(&sym, "x");
        assert_eq!(decls.len(), 2);
        let (outer, inner) = (decls[0], decls[1]);

        let uses = use_ids(&sym, "x");
        assert_eq!(uses.len(), 3);
        // first use is inside the inner block
        assert_eq!(sym.declaration_map[&uses[0]], inner);
        // trailing uses see only the outer binding
        assert_eq!(sym.declaration_map[&uses[1]], outer);
        assert_eq!(sym.declaration_map[&uses[2]], outer);
    }

    #[test]
    fn methods_and_calls_are_tracked() {
        let (sym, _) = tables("int g(int v) { return v; } int f() { return g(1); }", Lang::C);
        let names: Vec<&str> = sym.methods.iter().map(|id| sym.label[id].as_str()).collect();
        assert!(names.iter().filter(|n| **n == "g").count() >= 2);
        assert_eq!(sym.calls.len(), 1);
        assert!(sym.calls.is_subset(&sym.methods));
    }

    #[test]
    fn unresolved_library_use_is_omitted() {
        let (sym, _) = tables("int f() { return printf; }", Lang::C);
        let printf_leaf = sym
            .tokens
            .iter()
            .find(|id| sym.label[id] == "printf")
            .copied()
            .unwrap();
        assert!(!sym.declaration_map.contains_key(&printf_leaf));
    }

    #[test]
    fn java_catch_parameter_declares() {
        let code = r#"
            class A {
                void f() {
                    try { g(); } catch (Exception e) { use(e); }
                }
            }
        "#;
        let (sym, _) = tables(code, Lang::Java);
        let decls = decl_ids(&sym, "e");
        assert_eq!(decls.len(), 1);
        let uses = use_ids(&sym, "e");
        assert_eq!(uses.len(), 1);
        assert_eq!(sym.declaration_map[&uses[0]], decls[0]);
    }

    #[test]
    fn tokens_come_out_in_source_order() {
        let (sym, _) = tables("int f() { int a = 1; int b = 2; return a; }", Lang::C);
        let labels: Vec<&str> = sym.tokens.iter().map(|id| sym.label[id].as_str()).collect();
        let a_decl = labels.iter().position(|l| *l == "a").unwrap();
        let b_decl = labels.iter().position(|l| *l == "b").unwrap();
        assert!(a_decl < b_decl);
    }
}
