use crate::render;
use crate::utils::clean::clean_source;
use crate::utils::config::Config;
use crate::walk::collect_sources;
use codeviews::config::ViewName;
use codeviews::errors::{CvError, CvResult};
use codeviews::{Lang, generate};
use console::style;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

pub fn parse_views(names: &[String]) -> CvResult<Vec<ViewName>> {
    names
        .iter()
        .map(|name| match name.to_ascii_lowercase().as_str() {
            "ast" => Ok(ViewName::Ast),
            "cfg" => Ok(ViewName::Cfg),
            "dfg" => Ok(ViewName::Dfg),
            other => Err(CvError::Msg(format!("unknown view '{other}'"))),
        })
        .collect()
}

/// Entry point called by the CLI: expand the path to its source files and
/// run each one through the core independently, in parallel.
pub fn handle(path: &str, raw: bool, config: &Config) -> CvResult<()> {
    let root = Path::new(path).canonicalize()?;
    let files = collect_sources(&root);
    if files.is_empty() {
        println!(
            "{}: no supported source files under {}",
            style("warning").yellow().bold(),
            style(root.display()).bold()
        );
        return Ok(());
    }

    println!(
        "{} {} file(s)...\n",
        style("Processing").green().bold(),
        files.len()
    );

    let results: Vec<(PathBuf, CvResult<usize>)> = files
        .par_iter()
        .map(|file| (file.clone(), process_file(file, raw, config)))
        .collect();

    let mut failures = 0usize;
    for (file, result) in results {
        match result {
            Ok(diags) if diags > 0 && !config.output.quiet => {
                println!(
                    "  {} {} ({} diagnostic(s))",
                    style("done").yellow(),
                    file.display(),
                    diags
                );
            }
            Ok(_) => {
                if !config.output.quiet {
                    println!("  {} {}", style("done").green(), file.display());
                }
            }
            Err(e) => {
                failures += 1;
                println!("  {} {}: {e}", style("failed").red().bold(), file.display());
            }
        }
    }
    if failures > 0 {
        return Err(CvError::Msg(format!("{failures} file(s) failed")));
    }
    Ok(())
}

/// Run one file through the core and write the rendered stream next to it
/// (or into the configured output directory). Returns the diagnostic count.
fn process_file(file: &Path, raw: bool, config: &Config) -> CvResult<usize> {
    let lang = Lang::from_path(file)
        .ok_or_else(|| CvError::Msg(format!("unsupported language: {}", file.display())))?;
    let bytes = std::fs::read(file)?;
    let cleaned = if raw { bytes } else { clean_source(&bytes, lang)? };

    let stream = generate(&cleaned, lang, &config.graph)?;
    let diags = stream
        .trailer
        .as_ref()
        .map(|t| t.diagnostics.len())
        .unwrap_or(0);

    let (rendered, ext) = match config.output.format.as_str() {
        "dot" => (render::to_dot(&stream), "dot"),
        _ => (render::to_json(&stream)?, "json"),
    };

    let out_path = output_path(file, ext, config.output.out_dir.as_deref())?;
    std::fs::write(&out_path, rendered)?;
    tracing::debug!(input = ?file, output = ?out_path, diags, "file processed");
    Ok(diags)
}

fn output_path(file: &Path, ext: &str, out_dir: Option<&str>) -> CvResult<PathBuf> {
    let name = file
        .file_name()
        .ok_or_else(|| CvError::Msg(format!("bad input path: {}", file.display())))?;
    let mut out_name = name.to_os_string();
    out_name.push(format!(".{ext}"));
    match out_dir {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            std::fs::create_dir_all(&dir)?;
            Ok(dir.join(out_name))
        }
        None => Ok(file.with_file_name(out_name)),
    }
}
