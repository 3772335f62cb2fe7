use super::{CaseGroup, CfgBuilder, CfgLang, FinallyFrame, Flow, Frontier};
use crate::catalog::Family;
use crate::errors::CvResult;
use crate::graph::EdgeKind;
use tree_sitter::Node;

/// Java front end: structured exception flow, synchronized blocks, enhanced
/// for, labeled jumps, and grouped switch bodies (classic and arrow arms).
pub(crate) struct JavaFront;

impl CfgLang for JavaFront {
    fn fn_signature(&self, b: &CfgBuilder<'_>, node: Node<'_>) -> (String, String) {
        let name = node
            .child_by_field_name("name")
            .map(|n| b.src.text(n))
            .unwrap_or_else(|| "<anon>".into());
        let params = node
            .child_by_field_name("parameters")
            .map(|p| b.stmt_label(p))
            .unwrap_or_else(|| "()".into());
        let label = format!("{name}{params}");
        (name, label)
    }

    fn switch_groups<'t>(&self, b: &CfgBuilder<'_>, node: Node<'t>) -> Vec<CaseGroup<'t>> {
        let mut out = Vec::new();
        let Some(body) = node.child_by_field_name("body") else {
            return out;
        };
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            let arrow = match child.kind() {
                "switch_block_statement_group" => false,
                "switch_rule" => true,
                _ => continue,
            };
            let mut labels = Vec::new();
            let mut stmts = Vec::new();
            let mut inner = child.walk();
            for part in child.named_children(&mut inner) {
                if part.kind() == "switch_label" {
                    // `case <expr>` carries a named child, `default` does not
                    labels.push(part.named_child(0).map(|v| b.src.text(v)));
                } else {
                    stmts.push(part);
                }
            }
            out.push(CaseGroup { labels, stmts, no_fall_through: arrow });
        }
        out
    }

    fn special(
        &self,
        b: &mut CfgBuilder<'_>,
        node: Node<'_>,
        fam: Family,
        preds: Frontier,
    ) -> CvResult<Flow> {
        match fam {
            Family::Try => self.try_stmt(b, node, preds),
            Family::Throw => Ok(self.throw_stmt(b, node, preds)),
            Family::Sync => self.sync_stmt(b, node, preds),
            Family::RangeFor => self.range_for(b, node, preds),
            _ => Ok(b.statement(node, preds)),
        }
    }
}

impl JavaFront {
    /// Try/catch/finally. The try head arms its handlers with `catch` edges;
    /// throw sites reach them with `throw` edges; every path leaving the
    /// construct runs through the finally block when one exists, including
    /// returns captured inside the try.
    fn try_stmt(
        &self,
        b: &mut CfgBuilder<'_>,
        node: Node<'_>,
        preds: Frontier,
    ) -> CvResult<Flow> {
        let Some(id) = b.table.id_of(node) else {
            return Ok(Flow::through(preds));
        };
        b.add_stmt_node(id, node, "try".into());
        b.connect(&preds, id);

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        let catches: Vec<Node<'_>> = children
            .iter()
            .copied()
            .filter(|c| c.kind() == "catch_clause")
            .collect();
        let finally = children.iter().copied().find(|c| c.kind() == "finally_clause");

        let mut heads = Vec::new();
        for clause in &catches {
            let cid = b.table.id_of(*clause).expect("catch clause is a named node");
            let param = first_child_of_kind(*clause, "catch_formal_parameter")
                .map(|p| b.stmt_label(p))
                .unwrap_or_default();
            b.add_stmt_node(cid, *clause, format!("catch({param})"));
            b.g.add_edge(id, cid, EdgeKind::Catch);
            heads.push(cid);
        }

        let has_finally = finally.is_some();
        if has_finally {
            b.push_finally_frame();
        }
        b.push_throw_targets(heads.clone());
        let body_flow = match node.child_by_field_name("body") {
            Some(body) => b.dispatch(self, body, vec![(id, EdgeKind::Seq)])?,
            None => Flow::through(vec![(id, EdgeKind::Seq)]),
        };
        b.pop_throw_targets();

        let mut after = body_flow.dangling;
        for (clause, cid) in catches.iter().zip(&heads) {
            let flow = match clause.child_by_field_name("body") {
                Some(cb) => b.dispatch(self, cb, vec![(*cid, EdgeKind::Seq)])?,
                None => Flow::through(vec![(*cid, EdgeKind::Seq)]),
            };
            after.extend(flow.dangling);
        }
        let frame = if has_finally {
            b.pop_finally_frame()
        } else {
            FinallyFrame::default()
        };

        match finally {
            Some(f) => {
                let block = first_child_of_kind(f, "block");
                let mut fpreds = after;
                for site in frame.jump_sites() {
                    fpreds.push((site, EdgeKind::Seq));
                }
                let fflow = match block {
                    Some(fb) => b.dispatch(self, fb, fpreds)?,
                    None => Flow::through(fpreds),
                };
                b.replay_finally_jumps(&frame, &fflow.dangling);
                Ok(Flow { entries: vec![id], dangling: fflow.dangling })
            }
            None => Ok(Flow { entries: vec![id], dangling: after }),
        }
    }

    fn throw_stmt(&self, b: &mut CfgBuilder<'_>, node: Node<'_>, preds: Frontier) -> Flow {
        let Some(id) = b.table.id_of(node) else {
            return Flow::through(preds);
        };
        b.add_stmt_node(id, node, b.stmt_label(node));
        b.connect(&preds, id);
        b.scan_calls(node, id);
        match b.throw_destinations() {
            Some(heads) => {
                for head in heads {
                    b.g.add_edge(id, head, EdgeKind::Throw);
                }
            }
            None => {
                let exit = b.exit_id();
                b.g.add_edge(id, exit, EdgeKind::Throw);
            }
        }
        Flow { entries: vec![id], dangling: Vec::new() }
    }

    fn sync_stmt(
        &self,
        b: &mut CfgBuilder<'_>,
        node: Node<'_>,
        preds: Frontier,
    ) -> CvResult<Flow> {
        let Some(id) = b.table.id_of(node) else {
            return Ok(Flow::through(preds));
        };
        let lock = first_child_of_kind(node, "parenthesized_expression");
        let label = format!(
            "synchronized({})",
            lock.map(|l| b.cond_text(l)).unwrap_or_default()
        );
        b.add_stmt_node(id, node, label);
        b.connect(&preds, id);
        if let Some(l) = lock {
            b.scan_calls(l, id);
        }
        let flow = match node.child_by_field_name("body") {
            Some(body) => b.dispatch(self, body, vec![(id, EdgeKind::Seq)])?,
            None => Flow::through(vec![(id, EdgeKind::Seq)]),
        };
        Ok(Flow { entries: vec![id], dangling: flow.dangling })
    }

    /// `for (T x : expr)`: the statement itself is the loop header; the
    /// bound name is its definition, the iterable its use.
    fn range_for(
        &self,
        b: &mut CfgBuilder<'_>,
        node: Node<'_>,
        preds: Frontier,
    ) -> CvResult<Flow> {
        let Some(id) = b.table.id_of(node) else {
            return Ok(Flow::through(preds));
        };
        let name = node
            .child_by_field_name("name")
            .map(|n| b.src.text(n))
            .unwrap_or_default();
        let value = node.child_by_field_name("value");
        let label = format!(
            "for({name} : {})",
            value.map(|v| b.stmt_label(v)).unwrap_or_default()
        );
        b.add_stmt_node(id, node, label);
        b.connect(&preds, id);
        if let Some(v) = value {
            b.scan_calls(v, id);
        }

        b.push_breakable(Some(id));
        let body_flow = match node.child_by_field_name("body") {
            Some(body) => b.dispatch(self, body, vec![(id, EdgeKind::True)])?,
            None => Flow::through(vec![(id, EdgeKind::True)]),
        };
        let frame = b.pop_breakable();
        for (n, _) in &body_flow.dangling {
            b.g.add_edge(*n, id, EdgeKind::LoopBack);
        }
        let mut dangling = vec![(id, EdgeKind::LoopExit)];
        dangling.extend(frame.breaks);
        Ok(Flow { entries: vec![id], dangling })
    }
}

fn first_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}
