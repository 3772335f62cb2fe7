use codeviews::Lang;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Collect every supported-language file under `root`, honoring VCS ignore
/// files. A plain file comes back as-is when its language is known.
pub fn collect_sources(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return match Lang::from_path(root) {
            Some(_) => vec![root.to_path_buf()],
            None => Vec::new(),
        };
    }

    let mut out: Vec<PathBuf> = WalkBuilder::new(root)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
        .map(|e| e.into_path())
        .filter(|p| Lang::from_path(p).is_some())
        .collect();
    out.sort();
    tracing::debug!(root = ?root, files = out.len(), "source walk complete");
    out
}

#[test]
fn walker_keeps_only_supported_languages() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("keep.c"), "int main() { return 0; }").unwrap();
    std::fs::write(tmp.path().join("Keep.java"), "class A {}").unwrap();
    std::fs::write(tmp.path().join("skip.txt"), "ignored").unwrap();

    let files = collect_sources(tmp.path());
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|p| Lang::from_path(p).is_some()));
}

#[test]
fn single_file_input_passes_through() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("one.c");
    std::fs::write(&file, "int main() { return 0; }").unwrap();

    assert_eq!(collect_sources(&file), vec![file]);
    assert!(collect_sources(&tmp.path().join("missing.txt")).is_empty());
}
