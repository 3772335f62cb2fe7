mod c;
mod java;

use crate::tree::Lang;
use once_cell::sync::Lazy;
use phf::{Map, Set};
use std::collections::HashMap;

/// Coarse classification of a tree-node kind, used by the CFG front ends to
/// dispatch on statements without string-matching at every site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    If,
    While,
    DoWhile,
    For,
    RangeFor,
    Switch,
    Break,
    Continue,
    Return,
    Goto,
    Label,
    Try,
    Throw,
    Sync,
    Block,
    SourceFile,
    FunctionDef,
    Simple,
    Trivia,
    Other,
}

/// Per-language classification tables. Pure data: adding a language is this
/// table plus one CFG front end.
pub struct Catalog {
    pub families: &'static Map<&'static str, Family>,

    /// Every kind that counts as a statement (CFG node boundaries, DFG
    /// statement granularity).
    pub statements: &'static Set<&'static str>,
    /// Plain assignments, declarations, expression statements.
    pub simple_statements: &'static Set<&'static str>,
    pub control_statements: &'static Set<&'static str>,
    pub loops: &'static Set<&'static str>,
    pub jumps: &'static Set<&'static str>,
    /// Kinds whose children form a statement block.
    pub block_holders: &'static Set<&'static str>,
    /// Method/function/class/constructor/field declarations.
    pub definitions: &'static Set<&'static str>,
    /// Kinds that open a lexical scope.
    pub scope_introducers: &'static Set<&'static str>,

    /// Parent kinds under which an identifier introduces a binding.
    pub declarators: &'static Set<&'static str>,
    /// Kinds whose text is recorded as a declared type.
    pub type_kinds: &'static Set<&'static str>,
    /// Parent kinds marking a method-name identifier at a declaration.
    pub method_decl_parents: &'static Set<&'static str>,
    /// Parent kinds marking a callee identifier at a call site.
    pub call_parents: &'static Set<&'static str>,
    pub argument_lists: &'static Set<&'static str>,
    /// Leaf kinds that participate in name binding and use resolution.
    pub identifiers: &'static Set<&'static str>,
    pub comments: &'static Set<&'static str>,
}

pub fn catalog(lang: Lang) -> &'static Catalog {
    match lang {
        Lang::C => &c::CATALOG,
        Lang::Java => &java::CATALOG,
    }
}

/// Slug-keyed registry, for driver-side introspection.
pub static CATALOGS: Lazy<HashMap<&'static str, &'static Catalog>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("c", &c::CATALOG);
    m.insert("java", &java::CATALOG);
    m
});

/// Classify a raw kind string. Unrecognized kinds are opaque non-statement
/// content (`Family::Other`), per the grammar-mismatch contract.
#[inline(always)]
pub fn family(lang: Lang, raw: &str) -> Family {
    catalog(lang).families.get(raw).copied().unwrap_or(Family::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_statement_kinds_cover_control_and_simple() {
        let cat = catalog(Lang::C);
        for kind in ["if_statement", "goto_statement", "declaration"] {
            assert!(cat.statements.contains(kind), "{kind} should be a statement");
        }
        assert!(cat.loops.contains("do_statement"));
        assert!(!cat.statements.contains("binary_expression"));
    }

    #[test]
    fn jump_kinds_are_control_kinds() {
        for lang in [Lang::C, Lang::Java] {
            let cat = catalog(lang);
            for kind in cat.jumps.iter() {
                assert!(
                    cat.control_statements.contains(kind),
                    "{} jump kind {kind} missing from control set",
                    lang.slug()
                );
            }
        }
    }

    #[test]
    fn block_holders_introduce_scopes() {
        for lang in [Lang::C, Lang::Java] {
            let cat = catalog(lang);
            for kind in cat.block_holders.iter() {
                // class/switch bodies hang off their declaration's scope
                if matches!(*kind, "class_body" | "switch_block") {
                    continue;
                }
                assert!(
                    cat.scope_introducers.contains(kind),
                    "{} block holder {kind} should open a scope",
                    lang.slug()
                );
            }
        }
    }

    #[test]
    fn unknown_kind_is_other() {
        assert_eq!(family(Lang::C, "no_such_kind"), Family::Other);
        assert_eq!(family(Lang::Java, "try_statement"), Family::Try);
    }

    #[test]
    fn registry_knows_both_slugs() {
        assert!(CATALOGS.contains_key("c"));
        assert!(CATALOGS.contains_key("java"));
    }
}
