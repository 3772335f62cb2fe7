use crate::graph::View;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewName {
    Ast,
    Cfg,
    Dfg,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AstConfig {
    /// Node kinds removed from the AST view, with reconnection.
    pub blacklist: Vec<String>,

    /// Collapse same-text identifier leaves onto one representative node.
    pub collapse: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DfgConfig {
    /// Annotate `reaches` edges with the defining statement's line.
    pub last_def: bool,

    /// Annotate `reaches` edges with the most recent prior use's line.
    pub last_use: bool,
}

/// The core's entire configuration surface. Everything else (output paths,
/// formats, batching) belongs to the driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
    /// Which views to build and emit.
    pub views: Vec<ViewName>,

    pub ast: AstConfig,
    pub dfg: DfgConfig,

    /// Abort on any parser error instead of emitting a best-effort graph.
    pub strict_parse: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            views: vec![ViewName::Ast, ViewName::Cfg, ViewName::Dfg],
            ast: AstConfig::default(),
            dfg: DfgConfig::default(),
            strict_parse: false,
        }
    }
}

impl GraphConfig {
    pub fn view_set(&self) -> View {
        let mut set = View::empty();
        for v in &self.views {
            set |= match v {
                ViewName::Ast => View::AST,
                ViewName::Cfg => View::CFG,
                ViewName::Dfg => View::DFG,
            };
        }
        set
    }
}

#[test]
fn default_requests_all_views() {
    let cfg = GraphConfig::default();
    assert_eq!(cfg.view_set(), View::AST | View::CFG | View::DFG);
    assert!(!cfg.strict_parse);
}

#[test]
fn view_names_deserialize_lowercase() {
    let cfg: GraphConfig = toml::from_str(
        r#"
        views = ["cfg", "dfg"]

        [dfg]
        last_def = true
    "#,
    )
    .unwrap();
    assert_eq!(cfg.view_set(), View::CFG | View::DFG);
    assert!(cfg.dfg.last_def);
    assert!(!cfg.dfg.last_use);
}
