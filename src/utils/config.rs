use codeviews::GraphConfig;
use codeviews::errors::CvResult;
use console::style;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

static DEFAULT_CONFIG_TOML: &str = include_str!("../../default-codeviews.conf");

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    /// The default output format ("json" or "dot").
    pub format: String,

    /// Where to write output files; `None` puts them next to the inputs.
    pub out_dir: Option<String>,

    /// Whether to print per-file progress to the console.
    pub quiet: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".into(),
            out_dir: None,
            quiet: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub graph: GraphConfig,
    pub output: OutputConfig,
}

impl Config {
    pub fn load(config_dir: &Path) -> CvResult<Self> {
        let mut config = Config::default();

        let default_config_path = config_dir.join("codeviews.conf");
        if !default_config_path.exists() {
            create_example_config(config_dir)?;
        }

        let user_config_path = config_dir.join("codeviews.local");
        if user_config_path.exists() {
            let user_config_content = fs::read_to_string(&user_config_path)?;
            let user_config: Config = toml::from_str(&user_config_content)?;

            config = merge_configs(config, user_config);

            println!(
                "{}: Loaded user config from: {}\n",
                style("note").green().bold(),
                style(user_config_path.display())
                    .underlined()
                    .white()
                    .bold()
            );
        }

        Ok(config)
    }
}

fn create_example_config(config_dir: &Path) -> CvResult<()> {
    let example_path = config_dir.join("codeviews.conf");
    if !example_path.exists() {
        fs::write(&example_path, DEFAULT_CONFIG_TOML)?;
        tracing::debug!("Example config created at: {}", example_path.display());
    }
    Ok(())
}

/// Merge user config into defaults: the blacklist accumulates, everything
/// else is overridden outright.
fn merge_configs(mut default: Config, user: Config) -> Config {
    default.graph.views = user.graph.views;
    default.graph.strict_parse = user.graph.strict_parse;
    default.graph.ast.collapse = user.graph.ast.collapse;
    default.graph.dfg = user.graph.dfg;

    default.graph.ast.blacklist.extend(user.graph.ast.blacklist);
    default.graph.ast.blacklist.sort_unstable();
    default.graph.ast.blacklist.dedup();

    default.output.format = user.output.format;
    default.output.out_dir = user.output.out_dir;
    default.output.quiet = user.output.quiet;

    default
}

#[test]
fn merge_accumulates_and_dedupes_the_blacklist() {
    let mut default_cfg = Config::default();
    default_cfg.graph.ast.blacklist = vec!["comment".into(), "parenthesized_expression".into()];

    let mut user_cfg = Config::default();
    user_cfg.graph.ast.blacklist = vec!["comment".into(), "number_literal".into()];

    let merged = merge_configs(default_cfg, user_cfg);
    assert_eq!(
        merged.graph.ast.blacklist,
        vec!["comment", "number_literal", "parenthesized_expression"]
    );
}

#[test]
fn load_creates_example_and_reads_user_overrides() {
    let cfg_dir = tempfile::tempdir().unwrap();
    let cfg_path = cfg_dir.path();

    let user_toml = r#"
        [graph]
        views = ["cfg"]
        strict_parse = true

        [output]
        format = "dot"
    "#;
    fs::write(cfg_path.join("codeviews.local"), user_toml).unwrap();

    let cfg = Config::load(cfg_path).expect("Config::load should succeed");

    assert!(cfg_path.join("codeviews.conf").is_file());
    assert!(cfg.graph.strict_parse);
    assert_eq!(cfg.output.format, "dot");
    assert_eq!(cfg.graph.views.len(), 1);
}

#[test]
fn default_example_config_parses_back() {
    let parsed: Result<Config, _> = toml::from_str(DEFAULT_CONFIG_TOML);
    assert!(parsed.is_ok());
}
