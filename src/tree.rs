use crate::errors::{CvError, CvResult};
use std::cell::RefCell;
use std::path::Path;
use tree_sitter::{Language, Node, Tree};

thread_local! {
    static PARSER: RefCell<tree_sitter::Parser> = RefCell::new(tree_sitter::Parser::new());
}

/// Languages with a full catalog + CFG front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    C,
    Java,
}

impl Lang {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("c") | Some("h") => Some(Lang::C),
            Some("java") => Some(Lang::Java),
            _ => None,
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug.to_ascii_lowercase().as_str() {
            "c" => Some(Lang::C),
            "java" => Some(Lang::Java),
            _ => None,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Lang::C => "c",
            Lang::Java => "java",
        }
    }

    pub fn grammar(self) -> Language {
        match self {
            Lang::C => Language::from(tree_sitter_c::LANGUAGE),
            Lang::Java => Language::from(tree_sitter_java::LANGUAGE),
        }
    }
}

/// One parsed file: the concrete tree plus the bytes it spans.
///
/// This is the whole surface the core sees of the external parser; everything
/// downstream goes through `root()`, child enumeration, field lookup and the
/// text helpers here.
pub struct SourceTree {
    tree: Tree,
    code: Vec<u8>,
    lang: Lang,
}

impl SourceTree {
    /// Parse `code`. With `strict` set, any syntax error in the tree aborts;
    /// otherwise the tree is returned as-is and error nodes surface later as
    /// trailer diagnostics.
    pub fn parse(code: Vec<u8>, lang: Lang, strict: bool) -> CvResult<Self> {
        let tree = PARSER.with(|cell| {
            let mut parser = cell.borrow_mut();
            parser.set_language(&lang.grammar())?;
            parser
                .parse(&*code, None)
                .ok_or_else(|| CvError::Parse("tree-sitter returned no tree".into()))
        })?;

        if strict && tree.root_node().has_error() {
            let pos = first_error_position(tree.root_node());
            return Err(CvError::Parse(format!(
                "syntax error at {}:{}",
                pos.0, pos.1
            )));
        }

        tracing::debug!(
            target: "tree",
            lang = lang.slug(),
            bytes = code.len(),
            "parsed"
        );
        Ok(SourceTree { tree, code, lang })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Text of the node's span. Lossy on invalid UTF-8 rather than failing:
    /// the parser already accepted the bytes.
    pub fn text(&self, node: Node<'_>) -> String {
        String::from_utf8_lossy(&self.code[node.start_byte()..node.end_byte()]).into_owned()
    }

    /// 1-based source line of the node's start.
    pub fn line(&self, node: Node<'_>) -> usize {
        node.start_position().row + 1
    }

    /// `(line, col)` of the node's start, both 1-based.
    pub fn position(&self, node: Node<'_>) -> (usize, usize) {
        let p = node.start_position();
        (p.row + 1, p.column + 1)
    }

    /// Positions of every ERROR / missing node, for the diagnostics trailer.
    pub fn syntax_errors(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        collect_errors(self.root(), &mut out);
        out
    }
}

fn collect_errors(node: Node<'_>, out: &mut Vec<(usize, usize)>) {
    if !node.has_error() {
        return;
    }
    if node.is_error() || node.is_missing() {
        let p = node.start_position();
        out.push((p.row + 1, p.column + 1));
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors(child, out);
    }
}

fn first_error_position(root: Node<'_>) -> (usize, usize) {
    let mut found = Vec::new();
    collect_errors(root, &mut found);
    found.first().copied().unwrap_or((1, 1))
}

/// Pre-order sequence of the *named* nodes under `root`, root included.
pub fn preorder_named<'t>(root: Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(n) = stack.pop() {
        out.push(n);
        let mut cursor = n.walk();
        let children: Vec<Node<'t>> = n.named_children(&mut cursor).collect();
        for c in children.into_iter().rev() {
            stack.push(c);
        }
    }
    out
}

#[cfg(test)]
pub(crate) fn parse_fixture(code: &str, lang: Lang) -> SourceTree {
    SourceTree::parse(code.as_bytes().to_vec(), lang, true).expect("fixture should parse")
}

#[test]
fn parses_trivial_c() {
    let src = parse_fixture("int main() { return 0; }", Lang::C);
    assert_eq!(src.root().kind(), "translation_unit");
    assert!(src.syntax_errors().is_empty());
}

#[test]
fn strict_mode_rejects_garbage() {
    let res = SourceTree::parse(b"int main( {{{".to_vec(), Lang::C, true);
    assert!(matches!(res, Err(CvError::Parse(_))));
}

#[test]
fn lenient_mode_keeps_partial_tree() {
    let src = SourceTree::parse(b"int main( {{{".to_vec(), Lang::C, false).unwrap();
    assert!(!src.syntax_errors().is_empty());
}

#[test]
fn preorder_visits_parents_before_children() {
    let src = parse_fixture("int main() { int a = 1; return a; }", Lang::C);
    let order = preorder_named(src.root());
    let unit = order.iter().position(|n| n.kind() == "translation_unit");
    let decl = order.iter().position(|n| n.kind() == "declaration");
    let ret = order.iter().position(|n| n.kind() == "return_statement");
    assert!(unit < decl && decl < ret);
}

#[test]
fn lang_detection_by_extension() {
    assert_eq!(Lang::from_path(Path::new("x/y/foo.java")), Some(Lang::Java));
    assert_eq!(Lang::from_path(Path::new("bar.h")), Some(Lang::C));
    assert_eq!(Lang::from_path(Path::new("bar.py")), None);
}
