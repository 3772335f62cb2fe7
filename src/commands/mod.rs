pub mod generate;
pub mod kinds;

use crate::cli::Commands;
use crate::utils::config::Config;
use codeviews::errors::CvResult;

pub fn handle_command(command: Commands, config: &mut Config) -> CvResult<()> {
    match command {
        Commands::Generate {
            path,
            views,
            format,
            out_dir,
            strict,
            raw,
        } => {
            if !views.is_empty() {
                config.graph.views = generate::parse_views(&views)?;
            }
            if let Some(fmt) = format {
                config.output.format = fmt;
            }
            if let Some(dir) = out_dir {
                config.output.out_dir = Some(dir);
            }
            if strict {
                config.graph.strict_parse = true;
            }
            generate::handle(&path, raw, config)
        }
        Commands::Kinds { lang } => kinds::handle(&lang),
    }
}
