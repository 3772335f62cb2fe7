use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "codeviews")]
#[command(about = "Generate AST/CFG/DFG graph views from source files")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate graph views for a file or every supported file in a tree
    Generate {
        /// File or directory to process (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Views to build, comma separated (ast, cfg, dfg)
        #[arg(short, long, value_delimiter = ',')]
        views: Vec<String>,

        /// Output format
        #[arg(short, long, value_parser = ["json", "dot"])]
        format: Option<String>,

        /// Directory for output files (default: next to each input)
        #[arg(short, long)]
        out_dir: Option<String>,

        /// Abort on parse errors instead of emitting a partial graph
        #[arg(long)]
        strict: bool,

        /// Skip comment/blank-line pre-cleaning
        #[arg(long)]
        raw: bool,
    },

    /// Print the node-kind classification tables for a language
    Kinds {
        /// Language slug (c, java)
        lang: String,
    },
}
