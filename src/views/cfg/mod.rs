mod c;
mod java;

use crate::catalog::{Catalog, Family, catalog, family};
use crate::errors::CvResult;
use crate::graph::{EdgeKind, View, ViewGraph, ViewNode};
use crate::index::{NodeId, NodeTable};
use crate::records::Diagnostic;
use crate::tree::{Lang, SourceTree, preorder_named};
use std::collections::HashMap;
use tracing::debug;
use tree_sitter::Node;

/// Pending out-edges of the statements processed so far: each entry is glued
/// to the next construct's entry with the recorded edge kind.
pub(crate) type Frontier = Vec<(NodeId, EdgeKind)>;

/// What one processed statement or block hands back: where incoming edges
/// attached, and which nodes still dangle.
pub(crate) struct Flow {
    pub entries: Vec<NodeId>,
    pub dangling: Frontier,
}

impl Flow {
    /// Nothing here: the predecessors stay dangling for the next construct.
    fn through(preds: Frontier) -> Self {
        Flow { entries: Vec::new(), dangling: preds }
    }
}

/// One case arm of a switch: its dispatch labels (None = default) and the
/// statements it runs. `no_fall_through` marks arrow-style arms.
pub(crate) struct CaseGroup<'t> {
    pub labels: Vec<Option<String>>,
    pub stmts: Vec<Node<'t>>,
    pub no_fall_through: bool,
}

/// The language-specific sliver of the builder: everything the shared
/// structured-statement machinery cannot know from the catalog alone.
pub(crate) trait CfgLang {
    /// Function name and display label for a definition node.
    fn fn_signature(&self, b: &CfgBuilder<'_>, node: Node<'_>) -> (String, String);

    /// Case arms of a switch, in source order.
    fn switch_groups<'t>(&self, b: &CfgBuilder<'_>, node: Node<'t>) -> Vec<CaseGroup<'t>>;

    /// Constructs the shared dispatcher does not handle (try/throw/…).
    fn special(
        &self,
        b: &mut CfgBuilder<'_>,
        node: Node<'_>,
        fam: Family,
        preds: Frontier,
    ) -> CvResult<Flow>;
}

fn front_for(lang: Lang) -> &'static dyn CfgLang {
    match lang {
        Lang::C => &c::CFront,
        Lang::Java => &java::JavaFront,
    }
}

/// Loop or switch that `break`/`continue` can target.
pub(crate) struct Breakable {
    /// Where `continue` goes; `None` marks a switch.
    continue_target: Option<NodeId>,
    breaks: Frontier,
    label: Option<String>,
}

/// Jumps captured by a try-with-finally, replayed once its finally block is
/// built: the jump site runs `seq` into the finally, and the finally's end
/// takes the jump's place.
#[derive(Default)]
pub(crate) struct FinallyFrame {
    /// Breakable-stack depth when the frame was armed. A jump targeting a
    /// frame below this leaves the try and must run the finally first.
    breakable_depth: usize,
    returns: Vec<NodeId>,
    /// (site, index of the targeted breakable).
    breaks: Vec<(NodeId, usize)>,
    /// (site, continue destination).
    continues: Vec<(NodeId, NodeId)>,
}

impl FinallyFrame {
    /// Every captured jump site, in capture order.
    pub(crate) fn jump_sites(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.returns
            .iter()
            .copied()
            .chain(self.breaks.iter().map(|(site, _)| *site))
            .chain(self.continues.iter().map(|(site, _)| *site))
    }
}

/// Per-function state, reset at every definition.
#[derive(Default)]
pub(crate) struct FnCtx {
    entry: NodeId,
    exit: NodeId,
    breakables: Vec<Breakable>,
    /// Statement labels resolved so far, by name.
    labels: HashMap<String, NodeId>,
    /// Label waiting to be claimed by the loop it prefixes.
    pending_label: Option<String>,
    /// goto sites awaiting resolution: (site, label, line).
    gotos: Vec<(NodeId, String, usize)>,
    /// Innermost-first stacks of catch heads for throw routing.
    throw_targets: Vec<Vec<NodeId>>,
    /// Jump sites captured by enclosing try-with-finally constructs.
    finally_frames: Vec<FinallyFrame>,
    diag_count: usize,
}

pub(crate) struct CfgBuilder<'a> {
    pub(crate) src: &'a SourceTree,
    pub(crate) table: &'a mut NodeTable,
    pub(crate) cat: &'static Catalog,
    pub(crate) g: ViewGraph,
    pub(crate) diags: Vec<Diagnostic>,
    funcs: HashMap<String, NodeId>,
    pending_calls: Vec<(NodeId, String)>,
    ctx: FnCtx,
}

/// Build the CFG view: one entry/exit pair per function definition, typed
/// control edges, call edges resolved in-file (stubs otherwise). Soft
/// problems (unresolved gotos, jumps outside any construct) come back as
/// diagnostics, attached to the offending function's entry node.
pub fn build(src: &SourceTree, table: &mut NodeTable) -> CvResult<(ViewGraph, Vec<Diagnostic>)> {
    let front = front_for(src.lang());
    let mut b = CfgBuilder {
        src,
        table,
        cat: catalog(src.lang()),
        g: ViewGraph::new(View::CFG),
        diags: Vec::new(),
        funcs: HashMap::new(),
        pending_calls: Vec::new(),
        ctx: FnCtx::default(),
    };

    for node in preorder_named(src.root()) {
        if family(src.lang(), node.kind()) == Family::FunctionDef {
            b.function(front, node)?;
        }
    }
    b.resolve_calls();

    debug!(
        target: "cfg",
        nodes = b.g.node_count(),
        edges = b.g.edge_count(),
        functions = b.funcs.len(),
        "cfg view built"
    );
    Ok((b.g, b.diags))
}

impl<'a> CfgBuilder<'a> {
    fn function(&mut self, front: &dyn CfgLang, node: Node<'_>) -> CvResult<()> {
        let Some(entry) = self.table.id_of(node) else {
            return Ok(());
        };
        let (name, label) = front.fn_signature(self, node);
        self.g
            .add_node(ViewNode::new(entry, node.kind(), label).at_line(self.src.line(node)));
        let exit = self.table.alloc_synthetic("exit");
        self.g
            .add_node(ViewNode::new(exit, "exit", format!("exit {name}")));
        self.funcs.entry(name).or_insert(entry);

        self.ctx = FnCtx { entry, exit, ..FnCtx::default() };

        let flow = match node.child_by_field_name("body") {
            Some(body) => self.dispatch(front, body, vec![(entry, EdgeKind::Seq)])?,
            None => Flow::through(vec![(entry, EdgeKind::Seq)]),
        };
        for (n, kind) in flow.dangling {
            self.g.add_edge(n, exit, kind);
        }

        // gotos resolve once the whole body has been seen
        for (site, label, line) in std::mem::take(&mut self.ctx.gotos) {
            match self.ctx.labels.get(&label) {
                Some(&target) => {
                    self.g.add_edge(site, target, EdgeKind::Goto);
                }
                None => self.soft_error(format!("goto to undeclared label '{label}'"), line),
            }
        }
        Ok(())
    }

    pub(crate) fn dispatch(
        &mut self,
        front: &dyn CfgLang,
        node: Node<'_>,
        preds: Frontier,
    ) -> CvResult<Flow> {
        let kind = node.kind();
        match family(self.src.lang(), kind) {
            Family::Trivia | Family::SourceFile | Family::FunctionDef => Ok(Flow::through(preds)),
            Family::Block => self.block(front, node, preds),
            Family::Simple => Ok(self.statement(node, preds)),
            Family::If => self.if_stmt(front, node, preds),
            Family::While => self.while_stmt(front, node, preds),
            Family::DoWhile => self.do_while_stmt(front, node, preds),
            Family::For => self.for_stmt(front, node, preds),
            Family::Switch => self.switch_stmt(front, node, preds),
            Family::Break => Ok(self.break_stmt(node, preds)),
            Family::Continue => Ok(self.continue_stmt(node, preds)),
            Family::Return => Ok(self.return_stmt(node, preds)),
            Family::Goto => Ok(self.goto_stmt(node, preds)),
            Family::Label => self.label_stmt(front, node, preds),
            fam @ (Family::Try | Family::Throw | Family::Sync | Family::RangeFor) => {
                front.special(self, node, fam, preds)
            }
            Family::Other => {
                if self.cat.statements.contains(kind) {
                    Ok(self.statement(node, preds))
                } else {
                    // opaque non-statement content
                    Ok(Flow::through(preds))
                }
            }
        }
    }

    fn block(&mut self, front: &dyn CfgLang, node: Node<'_>, preds: Frontier) -> CvResult<Flow> {
        let mut frontier = preds;
        let mut entries: Vec<NodeId> = Vec::new();
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children {
            let flow = self.dispatch(front, child, frontier)?;
            if entries.is_empty() {
                entries = flow.entries.clone();
            }
            frontier = flow.dangling;
        }
        Ok(Flow { entries, dangling: frontier })
    }

    /// One CFG node for a plain statement (or an expression acting as one,
    /// like a for-loop init): entry = dangling = the statement itself.
    pub(crate) fn statement(&mut self, node: Node<'_>, preds: Frontier) -> Flow {
        let Some(id) = self.table.id_of(node) else {
            return Flow::through(preds);
        };
        self.add_stmt_node(id, node, self.stmt_label(node));
        self.connect(&preds, id);
        self.scan_calls(node, id);
        Flow { entries: vec![id], dangling: vec![(id, EdgeKind::Seq)] }
    }

    fn if_stmt(&mut self, front: &dyn CfgLang, node: Node<'_>, preds: Frontier) -> CvResult<Flow> {
        let Some(id) = self.table.id_of(node) else {
            return Ok(Flow::through(preds));
        };
        let cond = node.child_by_field_name("condition");
        let label = format!("if({})", cond.map(|c| self.cond_text(c)).unwrap_or_default());
        self.add_stmt_node(id, node, label);
        self.connect(&preds, id);
        if let Some(c) = cond {
            self.scan_calls(c, id);
        }

        let then_flow = match node.child_by_field_name("consequence") {
            Some(t) => self.dispatch(front, t, vec![(id, EdgeKind::True)])?,
            None => Flow::through(vec![(id, EdgeKind::True)]),
        };
        let mut dangling = then_flow.dangling;
        match self.else_branch(node) {
            Some(e) => {
                let else_flow = self.dispatch(front, e, vec![(id, EdgeKind::False)])?;
                dangling.extend(else_flow.dangling);
            }
            // no else: the false edge goes straight to the merge point
            None => dangling.push((id, EdgeKind::False)),
        }
        Ok(Flow { entries: vec![id], dangling })
    }

    /// The statement under `alternative`, unwrapping C's `else_clause`.
    fn else_branch<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        let alt = node.child_by_field_name("alternative")?;
        if alt.kind() == "else_clause" {
            return alt.named_child(0);
        }
        Some(alt)
    }

    fn while_stmt(
        &mut self,
        front: &dyn CfgLang,
        node: Node<'_>,
        preds: Frontier,
    ) -> CvResult<Flow> {
        let Some(id) = self.table.id_of(node) else {
            return Ok(Flow::through(preds));
        };
        let cond = node.child_by_field_name("condition");
        let label = format!("while({})", cond.map(|c| self.cond_text(c)).unwrap_or_default());
        self.add_stmt_node(id, node, label);
        self.connect(&preds, id);
        if let Some(c) = cond {
            self.scan_calls(c, id);
        }

        self.push_breakable(Some(id));
        let body_flow = match node.child_by_field_name("body") {
            Some(b) => self.dispatch(front, b, vec![(id, EdgeKind::True)])?,
            None => Flow::through(vec![(id, EdgeKind::True)]),
        };
        let frame = self.pop_breakable();
        for (n, _) in &body_flow.dangling {
            self.g.add_edge(*n, id, EdgeKind::LoopBack);
        }

        let mut dangling = vec![(id, EdgeKind::LoopExit)];
        dangling.extend(frame.breaks);
        Ok(Flow { entries: vec![id], dangling })
    }

    fn do_while_stmt(
        &mut self,
        front: &dyn CfgLang,
        node: Node<'_>,
        preds: Frontier,
    ) -> CvResult<Flow> {
        let Some(id) = self.table.id_of(node) else {
            return Ok(Flow::through(preds));
        };
        let cond = node.child_by_field_name("condition");
        let label = format!(
            "do-while({})",
            cond.map(|c| self.cond_text(c)).unwrap_or_default()
        );
        self.add_stmt_node(id, node, label);
        if let Some(c) = cond {
            self.scan_calls(c, id);
        }

        // body runs unconditionally first; the condition sits after it
        self.push_breakable(Some(id));
        let body_flow = match node.child_by_field_name("body") {
            Some(b) => self.dispatch(front, b, preds)?,
            None => Flow::through(preds),
        };
        let frame = self.pop_breakable();
        self.connect(&body_flow.dangling, id);
        let back_to = body_flow.entries.first().copied().unwrap_or(id);
        self.g.add_edge(id, back_to, EdgeKind::LoopBack);

        let entries = if body_flow.entries.is_empty() {
            vec![id]
        } else {
            body_flow.entries
        };
        let mut dangling = vec![(id, EdgeKind::LoopExit)];
        dangling.extend(frame.breaks);
        Ok(Flow { entries, dangling })
    }

    fn for_stmt(
        &mut self,
        front: &dyn CfgLang,
        node: Node<'_>,
        preds: Frontier,
    ) -> CvResult<Flow> {
        if self.table.id_of(node).is_none() {
            return Ok(Flow::through(preds));
        }
        let init = node
            .child_by_field_name("initializer")
            .or_else(|| node.child_by_field_name("init"));
        let cond = node.child_by_field_name("condition");
        let update = node.child_by_field_name("update");

        // init is a plain statement ahead of the header
        let mut frontier = preds;
        let mut entries: Vec<NodeId> = Vec::new();
        if let Some(i) = init {
            let flow = self.statement(i, frontier);
            entries = flow.entries.clone();
            frontier = flow.dangling;
        }

        let head_label = format!(
            "for({};{};{})",
            init.map(|i| self.stmt_label(i).trim_end_matches(';').to_owned())
                .unwrap_or_default(),
            cond.map(|c| self.cond_text(c)).unwrap_or_default(),
            update.map(|u| self.stmt_label(u)).unwrap_or_default(),
        );
        let header = match cond {
            Some(c) => {
                let hid = self.table.id_of(c).expect("condition is a named node");
                self.add_stmt_node(hid, c, head_label);
                self.scan_calls(c, hid);
                hid
            }
            None => {
                let hid = self.table.alloc_synthetic("for_header");
                self.g.add_node(
                    ViewNode::new(hid, "for_header", head_label).at_line(self.src.line(node)),
                );
                hid
            }
        };
        self.connect(&frontier, header);
        if entries.is_empty() {
            entries = vec![header];
        }

        // the update node exists before the body so continue can target it
        let update_id = update.map(|u| {
            let uid = self.table.id_of(u).expect("update is a named node");
            self.add_stmt_node(uid, u, self.src.text(u));
            self.scan_calls(u, uid);
            uid
        });

        self.push_breakable(Some(update_id.unwrap_or(header)));
        let body_flow = match node.child_by_field_name("body") {
            Some(b) => self.dispatch(front, b, vec![(header, EdgeKind::True)])?,
            None => Flow::through(vec![(header, EdgeKind::True)]),
        };
        let frame = self.pop_breakable();

        match update_id {
            Some(u) => {
                self.connect(&body_flow.dangling, u);
                self.g.add_edge(u, header, EdgeKind::LoopBack);
            }
            None => {
                for (n, _) in &body_flow.dangling {
                    self.g.add_edge(*n, header, EdgeKind::LoopBack);
                }
            }
        }

        let mut dangling = Frontier::new();
        // `for (;;)` has no false exit; only breaks leave it
        if cond.is_some() {
            dangling.push((header, EdgeKind::LoopExit));
        }
        dangling.extend(frame.breaks);
        Ok(Flow { entries, dangling })
    }

    fn switch_stmt(
        &mut self,
        front: &dyn CfgLang,
        node: Node<'_>,
        preds: Frontier,
    ) -> CvResult<Flow> {
        let Some(id) = self.table.id_of(node) else {
            return Ok(Flow::through(preds));
        };
        let cond = node.child_by_field_name("condition");
        let label = format!(
            "switch({})",
            cond.map(|c| self.cond_text(c)).unwrap_or_default()
        );
        self.add_stmt_node(id, node, label);
        self.connect(&preds, id);
        if let Some(c) = cond {
            self.scan_calls(c, id);
        }

        self.push_breakable(None);
        let groups = front.switch_groups(self, node);
        let mut carry = Frontier::new();
        let mut saw_default = false;
        for group in groups {
            let mut group_preds = std::mem::take(&mut carry);
            for value in &group.labels {
                let kind = match value {
                    Some(v) => EdgeKind::Case(v.clone()),
                    None => {
                        saw_default = true;
                        EdgeKind::DefaultCase
                    }
                };
                group_preds.push((id, kind));
            }
            let mut frontier = group_preds;
            for stmt in &group.stmts {
                let flow = self.dispatch(front, *stmt, frontier)?;
                frontier = flow.dangling;
            }
            if group.no_fall_through {
                // arrow arms never fall through; their ends leave the switch
                let frame = self.ctx.breakables.last_mut().expect("switch frame");
                frame.breaks.extend(frontier);
            } else {
                carry = frontier;
            }
        }
        let frame = self.pop_breakable();

        // trailing fall-through leaves the switch like a break would
        let mut dangling = carry;
        dangling.extend(frame.breaks);
        if !saw_default {
            // the scrutinee may match nothing
            dangling.push((id, EdgeKind::Seq));
        }
        Ok(Flow { entries: vec![id], dangling })
    }

    fn break_stmt(&mut self, node: Node<'_>, preds: Frontier) -> Flow {
        let Some(id) = self.table.id_of(node) else {
            return Flow::through(preds);
        };
        self.add_stmt_node(id, node, self.stmt_label(node));
        self.connect(&preds, id);

        let label = self.jump_label(node);
        let target = match &label {
            Some(name) => self
                .ctx
                .breakables
                .iter()
                .rposition(|f| f.label.as_deref() == Some(name)),
            None => self.ctx.breakables.len().checked_sub(1),
        };
        match target {
            Some(idx) => {
                // a break leaving a try-with-finally runs the finally first
                let detour = self
                    .ctx
                    .finally_frames
                    .last()
                    .is_some_and(|f| idx < f.breakable_depth);
                if detour {
                    let frame = self.ctx.finally_frames.last_mut().expect("frame just seen");
                    frame.breaks.push((id, idx));
                } else {
                    self.ctx.breakables[idx].breaks.push((id, EdgeKind::Seq));
                }
            }
            None => {
                let line = self.src.line(node);
                self.soft_error("break outside any enclosing construct".into(), line);
            }
        }
        Flow { entries: vec![id], dangling: Vec::new() }
    }

    fn continue_stmt(&mut self, node: Node<'_>, preds: Frontier) -> Flow {
        let Some(id) = self.table.id_of(node) else {
            return Flow::through(preds);
        };
        self.add_stmt_node(id, node, self.stmt_label(node));
        self.connect(&preds, id);

        let label = self.jump_label(node);
        let target = self
            .ctx
            .breakables
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, f)| f.continue_target.is_some())
            .find(|(_, f)| match &label {
                Some(name) => f.label.as_deref() == Some(name),
                None => true,
            })
            .and_then(|(idx, f)| f.continue_target.map(|t| (idx, t)));
        match target {
            Some((idx, to)) => {
                // same finally detour as break
                let detour = self
                    .ctx
                    .finally_frames
                    .last()
                    .is_some_and(|f| idx < f.breakable_depth);
                if detour {
                    let frame = self.ctx.finally_frames.last_mut().expect("frame just seen");
                    frame.continues.push((id, to));
                } else {
                    self.g.add_edge(id, to, EdgeKind::Seq);
                }
            }
            None => {
                let line = self.src.line(node);
                self.soft_error("continue outside any enclosing loop".into(), line);
            }
        }
        Flow { entries: vec![id], dangling: Vec::new() }
    }

    pub(crate) fn return_stmt(&mut self, node: Node<'_>, preds: Frontier) -> Flow {
        let Some(id) = self.table.id_of(node) else {
            return Flow::through(preds);
        };
        self.add_stmt_node(id, node, self.stmt_label(node));
        self.connect(&preds, id);
        self.scan_calls(node, id);

        // inside try-with-finally the return routes through the finally block
        match self.ctx.finally_frames.last_mut() {
            Some(frame) => frame.returns.push(id),
            None => {
                self.g.add_edge(id, self.ctx.exit, EdgeKind::Return);
            }
        }
        Flow { entries: vec![id], dangling: Vec::new() }
    }

    fn goto_stmt(&mut self, node: Node<'_>, preds: Frontier) -> Flow {
        let Some(id) = self.table.id_of(node) else {
            return Flow::through(preds);
        };
        self.add_stmt_node(id, node, self.stmt_label(node));
        self.connect(&preds, id);
        let label = node
            .child_by_field_name("label")
            .map(|l| self.src.text(l))
            .unwrap_or_default();
        let line = self.src.line(node);
        self.ctx.gotos.push((id, label, line));
        Flow { entries: vec![id], dangling: Vec::new() }
    }

    fn label_stmt(
        &mut self,
        front: &dyn CfgLang,
        node: Node<'_>,
        preds: Frontier,
    ) -> CvResult<Flow> {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        let name = children
            .first()
            .map(|n| self.src.text(*n))
            .unwrap_or_default();
        let inner = children.get(1).copied();

        self.ctx.pending_label = Some(name.clone());
        let flow = match inner {
            Some(stmt) => self.dispatch(front, stmt, preds)?,
            None => Flow::through(preds),
        };
        self.ctx.pending_label = None;
        if let Some(&entry) = flow.entries.first() {
            self.ctx.labels.insert(name, entry);
        }
        Ok(flow)
    }

    // ── helpers ──────────────────────────────────────────────────────────

    pub(crate) fn add_stmt_node(&mut self, id: NodeId, node: Node<'_>, label: String) {
        self.g
            .add_node(ViewNode::new(id, node.kind(), label).at_line(self.src.line(node)));
    }

    pub(crate) fn connect(&mut self, preds: &Frontier, to: NodeId) {
        for (p, kind) in preds {
            self.g.add_edge(*p, to, kind.clone());
        }
    }

    pub(crate) fn exit_id(&self) -> NodeId {
        self.ctx.exit
    }

    fn push_breakable(&mut self, continue_target: Option<NodeId>) {
        let label = self.ctx.pending_label.take();
        self.ctx.breakables.push(Breakable {
            continue_target,
            breaks: Frontier::new(),
            label,
        });
    }

    fn pop_breakable(&mut self) -> Breakable {
        self.ctx.breakables.pop().expect("breakable stack underflow")
    }

    pub(crate) fn push_throw_targets(&mut self, heads: Vec<NodeId>) {
        self.ctx.throw_targets.push(heads);
    }

    pub(crate) fn pop_throw_targets(&mut self) {
        self.ctx.throw_targets.pop();
    }

    /// Innermost non-empty set of catch heads, if any try is armed.
    pub(crate) fn throw_destinations(&self) -> Option<Vec<NodeId>> {
        self.ctx
            .throw_targets
            .iter()
            .rev()
            .find(|v| !v.is_empty())
            .cloned()
    }

    pub(crate) fn push_finally_frame(&mut self) {
        let breakable_depth = self.ctx.breakables.len();
        self.ctx.finally_frames.push(FinallyFrame {
            breakable_depth,
            ..FinallyFrame::default()
        });
    }

    pub(crate) fn pop_finally_frame(&mut self) -> FinallyFrame {
        self.ctx.finally_frames.pop().unwrap_or_default()
    }

    /// Replay the jumps a finally frame captured: the finally block's end
    /// stands in for each original site, so `return` leaves from here,
    /// captured breaks join their loop's break frontier, and captured
    /// continues head back to their loop.
    pub(crate) fn replay_finally_jumps(&mut self, frame: &FinallyFrame, dangling: &Frontier) {
        if !frame.returns.is_empty() {
            for (n, _) in dangling {
                self.g.add_edge(*n, self.ctx.exit, EdgeKind::Return);
            }
        }
        let mut break_targets: Vec<usize> = frame.breaks.iter().map(|(_, idx)| *idx).collect();
        break_targets.sort_unstable();
        break_targets.dedup();
        for idx in break_targets {
            if let Some(breakable) = self.ctx.breakables.get_mut(idx) {
                for (n, _) in dangling {
                    breakable.breaks.push((*n, EdgeKind::Seq));
                }
            }
        }
        let mut continue_targets: Vec<NodeId> =
            frame.continues.iter().map(|(_, to)| *to).collect();
        continue_targets.sort_unstable();
        continue_targets.dedup();
        for to in continue_targets {
            for (n, _) in dangling {
                self.g.add_edge(*n, to, EdgeKind::Seq);
            }
        }
    }

    /// Label operand of a Java `break foo;` / `continue foo;`.
    fn jump_label(&self, node: Node<'_>) -> Option<String> {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|c| self.cat.identifiers.contains(c.kind()));
        found.map(|c| self.src.text(c))
    }

    /// Record a per-function diagnostic and pin it on the entry node.
    pub(crate) fn soft_error(&mut self, message: String, line: usize) {
        self.diags.push(Diagnostic::new(message.clone(), line, 0));
        let key = format!("diag{}", self.ctx.diag_count);
        self.ctx.diag_count += 1;
        if let Some(entry) = self.g.node_mut(self.ctx.entry) {
            entry.extra.insert(key, message);
        }
    }

    /// Verbatim statement text, whitespace-collapsed into one line.
    pub(crate) fn stmt_label(&self, node: Node<'_>) -> String {
        let text = self.src.text(node);
        let mut out = String::with_capacity(text.len());
        let mut last_ws = false;
        for ch in text.chars() {
            if ch.is_whitespace() {
                if !last_ws {
                    out.push(' ');
                }
                last_ws = true;
            } else {
                out.push(ch);
                last_ws = false;
            }
        }
        out.trim().to_owned()
    }

    /// Condition text with the outer parentheses shed.
    pub(crate) fn cond_text(&self, cond: Node<'_>) -> String {
        let text = self.stmt_label(cond);
        let trimmed = text
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .unwrap_or(&text);
        trimmed.trim().to_owned()
    }

    /// Remember every call inside `root` so call edges can be laid once all
    /// function entries are known.
    pub(crate) fn scan_calls(&mut self, root: Node<'_>, site: NodeId) {
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            if self.cat.call_parents.contains(n.kind()) {
                let callee = n
                    .child_by_field_name("function")
                    .or_else(|| n.child_by_field_name("name"))
                    .map(|f| self.src.text(f));
                if let Some(name) = callee {
                    self.pending_calls.push((site, name));
                }
            }
            let mut cursor = n.walk();
            let children: Vec<Node<'_>> = n.named_children(&mut cursor).collect();
            for c in children.into_iter().rev() {
                stack.push(c);
            }
        }
    }

    fn resolve_calls(&mut self) {
        let mut stubs: HashMap<String, NodeId> = HashMap::new();
        for (site, name) in std::mem::take(&mut self.pending_calls) {
            let target = match self.funcs.get(&name) {
                Some(&entry) => entry,
                None => *stubs.entry(name.clone()).or_insert_with(|| {
                    let id = self.table.alloc_synthetic("stub");
                    self.g.add_node(ViewNode::new(id, "stub", name.clone()));
                    id
                }),
            };
            self.g.add_edge(site, target, EdgeKind::Call);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse_fixture;

    fn cfg_of(code: &str, lang: Lang) -> (ViewGraph, Vec<Diagnostic>) {
        let src = parse_fixture(code, lang);
        let mut table = NodeTable::build(&src);
        build(&src, &mut table).unwrap()
    }

    fn id_of(g: &ViewGraph, label: &str) -> NodeId {
        g.nodes()
            .find(|n| n.label == label)
            .map(|n| n.id)
            .unwrap_or_else(|| panic!("no node labeled {label:?}"))
    }

    fn edge_kinds(g: &ViewGraph, from: &str, to: &str) -> Vec<String> {
        let (f, t) = (id_of(g, from), id_of(g, to));
        g.edges_from(f)
            .filter(|(target, _)| *target == t)
            .map(|(_, e)| e.kind.name())
            .collect()
    }

    fn assert_edge(g: &ViewGraph, from: &str, kind: &str, to: &str) {
        let kinds = edge_kinds(g, from, to);
        assert!(
            kinds.iter().any(|k| k == kind),
            "expected {from:?} -{kind}-> {to:?}, found kinds {kinds:?}"
        );
    }

    #[test]
    fn sequential_and_if_shape() {
        let (g, diags) = cfg_of(
            "int f(int x) { int a = 1; if (x > 0) { a = 2; } else { a = 3; } return a; }",
            Lang::C,
        );
        assert!(diags.is_empty());
        assert_edge(&g, "f(int x)", "seq", "int a = 1;");
        assert_edge(&g, "int a = 1;", "seq", "if(x > 0)");
        assert_edge(&g, "if(x > 0)", "true", "a = 2;");
        assert_edge(&g, "if(x > 0)", "false", "a = 3;");
        assert_edge(&g, "a = 2;", "seq", "return a;");
        assert_edge(&g, "a = 3;", "seq", "return a;");
        assert_edge(&g, "return a;", "return", "exit f");
    }

    #[test]
    fn if_without_else_falls_to_merge() {
        let (g, _) = cfg_of("int f(int x) { if (x) { x = 1; } return x; }", Lang::C);
        assert_edge(&g, "if(x)", "false", "return x;");
        assert_edge(&g, "x = 1;", "seq", "return x;");
    }

    #[test]
    fn while_with_continue_rewires_to_header() {
        let (g, diags) = cfg_of(
            "int g(int n) { int s = 0; int i = 0; \
             while (i < n) { if (i % 2 == 0) { i = i + 1; continue; } s = s + i; } \
             return s; }",
            Lang::C,
        );
        assert!(diags.is_empty());
        assert_edge(&g, "int i = 0;", "seq", "while(i < n)");
        assert_edge(&g, "while(i < n)", "true", "if(i % 2 == 0)");
        assert_edge(&g, "continue;", "seq", "while(i < n)");
        // the body's straight-line end closes the loop
        assert_edge(&g, "s = s + i;", "loop_back", "while(i < n)");
        assert_edge(&g, "while(i < n)", "loop_exit", "return s;");
        // continue consumed its dangling: no seq out of it except to header
        let cont = id_of(&g, "continue;");
        assert_eq!(g.edges_from(cont).count(), 1);
    }

    #[test]
    fn do_while_runs_body_first() {
        let (g, _) = cfg_of("int f(int n) { do { n = n - 1; } while (n > 0); return n; }", Lang::C);
        assert_edge(&g, "f(int n)", "seq", "n = n - 1;");
        assert_edge(&g, "n = n - 1;", "seq", "do-while(n > 0)");
        assert_edge(&g, "do-while(n > 0)", "loop_back", "n = n - 1;");
        assert_edge(&g, "do-while(n > 0)", "loop_exit", "return n;");
    }

    #[test]
    fn for_loop_threads_init_header_update() {
        let (g, _) = cfg_of(
            "int f(int n) { int s = 0; for (int i = 0; i < n; i++) { s = s + i; } return s; }",
            Lang::C,
        );
        assert_edge(&g, "int i = 0;", "seq", "for(int i = 0;i < n;i++)");
        assert_edge(&g, "for(int i = 0;i < n;i++)", "true", "s = s + i;");
        assert_edge(&g, "s = s + i;", "seq", "i++");
        assert_edge(&g, "i++", "loop_back", "for(int i = 0;i < n;i++)");
        assert_edge(&g, "for(int i = 0;i < n;i++)", "loop_exit", "return s;");
    }

    #[test]
    fn switch_fall_through_and_breaks() {
        let (g, diags) = cfg_of(
            "int h(int x) { int r = 0; \
             switch (x) { case 1: r = 1; break; case 2: r = 2; case 3: r = r + 10; break; \
             default: r = -1; } return r; }",
            Lang::C,
        );
        assert!(diags.is_empty());
        assert_edge(&g, "switch(x)", "case(1)", "r = 1;");
        assert_edge(&g, "switch(x)", "case(2)", "r = 2;");
        assert_edge(&g, "switch(x)", "case(3)", "r = r + 10;");
        assert_edge(&g, "switch(x)", "default", "r = -1;");
        // explicit fall-through from case 2 into case 3
        assert_edge(&g, "r = 2;", "seq", "r = r + 10;");
        // break consumed case 1's dangling: nothing from r=1 to case 2
        assert!(edge_kinds(&g, "r = 1;", "r = 2;").is_empty());
        // default's end leaves the switch
        assert_edge(&g, "r = -1;", "seq", "return r;");
    }

    #[test]
    fn switch_without_default_keeps_head_dangling() {
        let (g, _) = cfg_of(
            "int f(int x) { switch (x) { case 1: x = 1; break; } return x; }",
            Lang::C,
        );
        assert_edge(&g, "switch(x)", "seq", "return x;");
    }

    #[test]
    fn goto_resolves_forward_labels() {
        let (g, diags) = cfg_of(
            "int k(int x) { int r = 0; if (x < 0) goto err; r = x * 2; goto end; \
             err: r = -1; end: return r; }",
            Lang::C,
        );
        assert!(diags.is_empty());
        assert_edge(&g, "goto err;", "goto", "r = -1;");
        assert_edge(&g, "goto end;", "goto", "return r;");
        assert_edge(&g, "if(x < 0)", "false", "r = x * 2;");
        // both assignments flow into the labeled return
        assert_edge(&g, "r = -1;", "seq", "return r;");
    }

    #[test]
    fn unresolved_goto_is_a_soft_error() {
        let (g, diags) = cfg_of("int f() { goto nowhere; return 0; }", Lang::C);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("nowhere"));
        let entry = g.nodes().find(|n| n.label == "f()").unwrap();
        assert!(entry.extra.contains_key("diag0"));
    }

    #[test]
    fn calls_resolve_in_file_and_stub_out() {
        let (g, _) = cfg_of(
            "int helper(int v) { return v; } int f() { int a = helper(1); lib(a); return a; }",
            Lang::C,
        );
        assert_edge(&g, "int a = helper(1);", "call", "helper(int v)");
        assert_edge(&g, "lib(a);", "call", "lib");
        let stub = g.nodes().find(|n| n.label == "lib").unwrap();
        assert_eq!(stub.kind, "stub");
    }

    #[test]
    fn every_node_reachable_from_some_entry() {
        let fixtures = [
            "int f(int x) { int a = 1; if (x > 0) { a = 2; } else { a = 3; } return a; }",
            "int g(int n) { int s = 0; while (s < n) { s = s + 1; } return s; }",
            "int k(int x) { if (x < 0) goto err; return 1; err: return 0; }",
        ];
        for code in fixtures {
            let (g, diags) = cfg_of(code, Lang::C);
            assert!(diags.is_empty(), "{code}");
            let entry = g
                .nodes()
                .map(|n| n.id)
                .min()
                .expect("graph has nodes");
            let reachable = g.reachable_from(entry);
            assert_eq!(reachable.len(), g.node_count(), "unreachable nodes in {code}");
        }
    }

    #[test]
    fn java_try_catch_finally_routes_returns() {
        let (g, diags) = cfg_of(
            "class A { int f(int x) { \
             try { risky(); return 1; } catch (Exception e) { x = 2; } finally { log(); } \
             return x; } }",
            Lang::Java,
        );
        assert!(diags.is_empty());
        assert_edge(&g, "try", "catch", "catch(Exception e)");
        assert_edge(&g, "try", "seq", "risky();");
        assert_edge(&g, "catch(Exception e)", "seq", "x = 2;");
        // the captured return runs the finally block, then leaves
        assert_edge(&g, "return 1;", "seq", "log();");
        assert_edge(&g, "log();", "return", "exit f");
        assert_edge(&g, "log();", "seq", "return x;");
    }

    #[test]
    fn java_break_out_of_try_runs_the_finally() {
        let (g, diags) = cfg_of(
            "class A { void f(int c) { \
             while (true) { try { if (c > 0) { break; } work(); } finally { cleanup(); } } \
             done(); } }",
            Lang::Java,
        );
        assert!(diags.is_empty());
        // the break heads into the finally, never straight to the loop exit
        assert_edge(&g, "break;", "seq", "cleanup();");
        let brk = id_of(&g, "break;");
        assert_eq!(g.edges_from(brk).count(), 1);
        // the finally's end takes the break's place in the loop's exit slot
        assert_edge(&g, "cleanup();", "seq", "done();");
    }

    #[test]
    fn java_continue_out_of_try_runs_the_finally() {
        let (g, diags) = cfg_of(
            "class A { void f(int n) { \
             while (n > 0) { try { if (n == 1) { continue; } n = step(n); } \
             finally { log(); } } } }",
            Lang::Java,
        );
        assert!(diags.is_empty());
        assert_edge(&g, "continue;", "seq", "log();");
        // after the finally, control re-enters the loop header
        assert_edge(&g, "log();", "seq", "while(n > 0)");
        let cont = id_of(&g, "continue;");
        assert_eq!(g.edges_from(cont).count(), 1);
    }

    #[test]
    fn java_break_inside_try_scoped_loop_needs_no_detour() {
        let (g, diags) = cfg_of(
            "class A { void f(int x) { try { while (x > 0) { break; } } \
             finally { log(); } } }",
            Lang::Java,
        );
        assert!(diags.is_empty());
        // the targeted loop sits inside the try: the break glues into the
        // finally as ordinary fall-through, and nothing replays afterwards
        assert_edge(&g, "break;", "seq", "log();");
        assert_edge(&g, "log();", "seq", "exit f");
        let log = id_of(&g, "log();");
        assert_eq!(g.edges_from(log).count(), 1);
    }

    #[test]
    fn java_throw_reaches_the_handler() {
        let (g, _) = cfg_of(
            "class A { void f() { try { throw new Exception(); } \
             catch (Exception e) { handle(); } } }",
            Lang::Java,
        );
        assert_edge(&g, "throw new Exception();", "throw", "catch(Exception e)");
    }

    #[test]
    fn java_throw_outside_try_exits() {
        let (g, _) = cfg_of(
            "class A { void f() { throw new IllegalStateException(); } }",
            Lang::Java,
        );
        assert_edge(&g, "throw new IllegalStateException();", "throw", "exit f");
    }

    #[test]
    fn java_labeled_break_targets_outer_loop() {
        let (g, diags) = cfg_of(
            "class A { void f() { outer: while (true) { while (true) { break outer; } } } }",
            Lang::Java,
        );
        assert!(diags.is_empty());
        assert_edge(&g, "break outer;", "seq", "exit f");
    }

    #[test]
    fn java_enhanced_for_loops_over_values() {
        let (g, _) = cfg_of(
            "class A { int f(int[] xs) { int s = 0; for (int x : xs) { s = s + x; } return s; } }",
            Lang::Java,
        );
        assert_edge(&g, "for(x : xs)", "true", "s = s + x;");
        assert_edge(&g, "s = s + x;", "loop_back", "for(x : xs)");
        assert_edge(&g, "for(x : xs)", "loop_exit", "return s;");
    }

    #[test]
    fn break_outside_loop_is_soft() {
        let (_, diags) = cfg_of("int f() { break; return 0; }", Lang::C);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("break"));
    }
}
