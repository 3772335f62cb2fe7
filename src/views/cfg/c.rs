use super::{CaseGroup, CfgBuilder, CfgLang, Flow, Frontier};
use crate::catalog::Family;
use crate::errors::CvResult;
use tree_sitter::Node;

/// C front end. Everything structured is shared machinery; the C-specific
/// parts are the declarator chain around function names and the flat
/// `case_statement` switch body.
pub(crate) struct CFront;

impl CfgLang for CFront {
    fn fn_signature(&self, b: &CfgBuilder<'_>, node: Node<'_>) -> (String, String) {
        // unwrap pointer/array declarators until the function declarator
        let mut decl = node.child_by_field_name("declarator");
        let mut func_decl = None;
        while let Some(d) = decl {
            if d.kind() == "function_declarator" {
                func_decl = Some(d);
                break;
            }
            decl = d.child_by_field_name("declarator");
        }
        match func_decl {
            Some(fd) => {
                let name = fd
                    .child_by_field_name("declarator")
                    .map(|n| b.src.text(n))
                    .unwrap_or_else(|| "<anon>".into());
                (name, b.stmt_label(fd))
            }
            None => ("<anon>".into(), b.stmt_label(node)),
        }
    }

    fn switch_groups<'t>(&self, b: &CfgBuilder<'_>, node: Node<'t>) -> Vec<CaseGroup<'t>> {
        let mut out = Vec::new();
        let Some(body) = node.child_by_field_name("body") else {
            return out;
        };
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            if child.kind() != "case_statement" {
                continue;
            }
            let value = child.child_by_field_name("value");
            let mut stmts = Vec::new();
            let mut inner = child.walk();
            for stmt in child.named_children(&mut inner) {
                if value.is_some_and(|v| v == stmt) {
                    continue;
                }
                stmts.push(stmt);
            }
            out.push(CaseGroup {
                labels: vec![value.map(|v| b.src.text(v))],
                stmts,
                no_fall_through: false,
            });
        }
        out
    }

    fn special(
        &self,
        b: &mut CfgBuilder<'_>,
        node: Node<'_>,
        _fam: Family,
        preds: Frontier,
    ) -> CvResult<Flow> {
        // C has no try/throw/synchronized/range-for; nothing routes here
        // unless the catalog grows a kind the dispatcher cannot place.
        Ok(b.statement(node, preds))
    }
}
