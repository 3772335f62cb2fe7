use codeviews::catalog::CATALOGS;
use codeviews::errors::{CvError, CvResult};
use console::style;

/// Dump a language's classification tables, one set per section. Mostly a
/// debugging aid when a grammar bump moves node kinds around.
pub fn handle(lang: &str) -> CvResult<()> {
    let slug = lang.to_ascii_lowercase();
    let catalog = CATALOGS
        .get(slug.as_str())
        .ok_or_else(|| CvError::Msg(format!("unsupported language '{lang}'")))?;

    let sections: [(&str, &phf::Set<&'static str>); 8] = [
        ("statements", catalog.statements),
        ("simple statements", catalog.simple_statements),
        ("control statements", catalog.control_statements),
        ("loops", catalog.loops),
        ("jumps", catalog.jumps),
        ("block holders", catalog.block_holders),
        ("definitions", catalog.definitions),
        ("scope introducers", catalog.scope_introducers),
    ];

    println!("{}", style(format!("kinds for '{slug}'")).green().bold());
    for (title, set) in sections {
        let mut kinds: Vec<&str> = set.iter().copied().collect();
        kinds.sort_unstable();
        println!("\n{}:", style(title).bold());
        for kind in kinds {
            println!("  {kind}");
        }
    }
    Ok(())
}

#[test]
fn unknown_language_is_an_error() {
    assert!(handle("cobol").is_err());
    assert!(handle("java").is_ok());
}
