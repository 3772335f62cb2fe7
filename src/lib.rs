//! Multi-view code graph generator.
//!
//! One source file in, one record stream out: an AST, a CFG, and a
//! statement-level DFG (reaching definitions) over a shared node-id
//! namespace, composed into a single labeled multigraph. Parsing is
//! delegated to tree-sitter; everything downstream of the grammar is here.

pub mod catalog;
pub mod compose;
pub mod config;
pub mod errors;
pub mod graph;
pub mod index;
pub mod records;
pub mod symbols;
pub mod tree;
pub mod views;

pub use config::GraphConfig;
pub use errors::{CvError, CvResult};
pub use records::RecordStream;
pub use tree::Lang;

use crate::graph::View;
use crate::records::Diagnostic;

/// Run the configured view builders over one file and emit the composed
/// record stream. Soft problems (parse errors under lenient mode, jump
/// targets that do not resolve) end up in the trailer; `Err` is reserved
/// for invariant violations and strict-mode parse failures.
pub fn generate(code: &[u8], lang: Lang, config: &GraphConfig) -> CvResult<RecordStream> {
    let src = tree::SourceTree::parse(code.to_vec(), lang, config.strict_parse)?;
    let mut diagnostics: Vec<Diagnostic> = src
        .syntax_errors()
        .into_iter()
        .map(|(line, col)| Diagnostic::new("syntax error", line, col))
        .collect();

    let mut table = index::NodeTable::build(&src);
    let symbols = symbols::extract(&src, &table)?;

    let want = config.view_set();
    let mut graphs: Vec<graph::ViewGraph> = Vec::new();
    if want.contains(View::AST) {
        graphs.push(views::ast::build(&src, &table, &symbols, &config.ast));
    }
    if want.intersects(View::CFG | View::DFG) {
        let (cfg_graph, cfg_diags) = views::cfg::build(&src, &mut table)?;
        diagnostics.extend(cfg_diags);
        if want.contains(View::DFG) {
            let dfg_graph = views::dfg::build(&src, &table, &symbols, &cfg_graph, &config.dfg)?;
            if want.contains(View::CFG) {
                graphs.push(cfg_graph);
            }
            graphs.push(dfg_graph);
        } else {
            graphs.push(cfg_graph);
        }
    }

    let composed = compose::compose(&graphs);
    Ok(records::stream(&composed, diagnostics))
}
