use codeviews::Lang;
use codeviews::catalog::catalog;
use codeviews::errors::CvResult;
use codeviews::tree::{SourceTree, preorder_named};

/// Strip comments and blank-only lines ahead of graph generation. The core
/// expects pre-cleaned text; this is the driver-side pass that provides it.
/// Comment spans come from a throwaway lenient parse, so there is no
/// language-specific lexing here.
pub fn clean_source(code: &[u8], lang: Lang) -> CvResult<Vec<u8>> {
    let src = SourceTree::parse(code.to_vec(), lang, false)?;
    let cat = catalog(lang);

    let mut spans: Vec<(usize, usize)> = preorder_named(src.root())
        .into_iter()
        .filter(|n| cat.comments.contains(n.kind()))
        .map(|n| (n.start_byte(), n.end_byte()))
        .collect();
    spans.sort_unstable();

    let mut stripped = Vec::with_capacity(code.len());
    let mut pos = 0;
    for (start, end) in spans {
        if start > pos {
            stripped.extend_from_slice(&code[pos..start]);
        }
        pos = pos.max(end);
    }
    stripped.extend_from_slice(&code[pos..]);

    let mut out = Vec::with_capacity(stripped.len());
    for line in stripped.split(|b| *b == b'\n') {
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            continue;
        }
        out.extend_from_slice(line);
        out.push(b'\n');
    }
    Ok(out)
}

#[test]
fn comments_and_blank_lines_disappear() {
    let code = b"int f() {\n    // a comment\n    int a = 1; /* inline */\n\n    return a;\n}\n";
    let cleaned = clean_source(code, Lang::C).unwrap();
    let text = String::from_utf8(cleaned).unwrap();
    assert!(!text.contains("comment"));
    assert!(!text.contains("inline"));
    assert!(!text.contains("\n\n"));
    assert!(text.contains("int a = 1;"));
}

#[test]
fn java_line_and_block_comments_are_stripped() {
    let code = b"class A {\n  // note\n  /* block */ void f() {}\n}\n";
    let cleaned = clean_source(code, Lang::Java).unwrap();
    let text = String::from_utf8(cleaned).unwrap();
    assert!(!text.contains("note"));
    assert!(!text.contains("block"));
    assert!(text.contains("void f() {}"));
}

#[test]
fn clean_code_passes_through() {
    let code = b"int f() {\n    return 0;\n}\n";
    let cleaned = clean_source(code, Lang::C).unwrap();
    assert_eq!(cleaned, code.to_vec());
}
