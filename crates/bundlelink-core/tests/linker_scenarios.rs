//! End-to-end scenarios driving the full scan -> link pipeline through
//! temporary on-disk fixtures, one per documented scenario.

use bundlelink_core::linker::{self, scan, BuildContext, ChunkKind, DiagnosticLog, ExternalMatcher, LinkerConfig};
use std::path::PathBuf;
use tempfile::tempdir;

fn write(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

fn build(dir: &std::path::Path, entries: &[PathBuf]) -> Result<linker::LinkedBuild, Vec<linker::Diagnostic>> {
    let external = ExternalMatcher::new();
    let scan_result = scan::scan(entries, dir, &external);
    let mut ctx = BuildContext::new(scan_result.graph, LinkerConfig::default());
    ctx.symbols = scan_result.symbols;
    ctx.diagnostics.extend(DiagnosticLog::merge(vec![scan_result.diagnostics]));
    if ctx.diagnostics.has_errors() {
        return Err(ctx.diagnostics.into_vec());
    }
    linker::link(ctx, &scan_result.entries)
}

#[test]
fn s1_missing_css_import_reports_error_and_no_output() {
    let dir = tempdir().unwrap();
    let entry = write(dir.path(), "entry.css", "@import \"./missing.css\";\n");

    let result = build(dir.path(), &[entry]);
    let diagnostics = result.expect_err("build should fail when an @import target is missing");
    assert!(
        diagnostics.iter().any(|d| d.message.contains("Could not resolve") && d.message.contains("missing.css")),
        "expected an unresolved-import diagnostic, got: {diagnostics:?}"
    );
}

#[test]
fn s2_shared_css_import_is_deduplicated_across_siblings() {
    let dir = tempdir().unwrap();
    write(dir.path(), "shared.css", ".shared { color: black }\n");
    write(dir.path(), "a.css", "@import \"./shared.css\";\n.a { color: green }\n");
    write(dir.path(), "b.css", "@import \"./shared.css\";\n.b { color: blue }\n");
    let entry = write(
        dir.path(),
        "entry.css",
        "@import \"./a.css\";\n@import \"./b.css\";\n.entry { color: red }\n",
    );

    let build_result = build(dir.path(), &[entry]).expect("build should succeed");
    let css_chunk = build_result.chunks.iter().find(|c| c.kind == ChunkKind::Css).expect("a css chunk should be emitted");

    let shared_count = css_chunk.code.matches(".shared").count();
    assert_eq!(shared_count, 1, "the shared rule should appear exactly once in: {}", css_chunk.code);
    assert!(css_chunk.code.contains(".a "), "a.css's rule should be inlined");
    assert!(css_chunk.code.contains(".b "), "b.css's rule should be inlined");
    assert!(css_chunk.code.contains(".entry"), "entry.css's own rule should be present");
}

#[test]
fn s5_shared_css_entry_produces_one_chunk_referenced_by_both_js_entries() {
    let dir = tempdir().unwrap();
    write(dir.path(), "common.css", ".common { color: teal }\n");
    let foo_entry = write(dir.path(), "foo/entry.js", "import \"../common.css\";\nconsole.log(\"foo\");\n");
    let bar_entry = write(dir.path(), "bar/entry.js", "import \"../common.css\";\nconsole.log(\"bar\");\n");

    let build_result = build(dir.path(), &[foo_entry, bar_entry]).expect("build should succeed");

    let css_chunks: Vec<_> = build_result.chunks.iter().filter(|c| c.kind == ChunkKind::Css).collect();
    assert_eq!(css_chunks.len(), 1, "both entries should share a single css chunk, got: {css_chunks:?}");

    let js_inputs: Vec<&str> = build_result
        .metafile
        .inputs
        .keys()
        .filter(|k| k.ends_with(".js"))
        .map(String::as_str)
        .collect();
    assert_eq!(js_inputs.len(), 2, "both JS entries should be recorded as inputs: {js_inputs:?}");
}
