//! Name minifier (spec §4.5): two-pass short-identifier allocation for
//! both JS symbols and CSS-Modules local names, sharing one allocation
//! order — most-referenced name gets the shortest slot, ties broken by
//! first appearance — so output is deterministic across runs (spec §8).
//!
//! Grounded in the teacher's `bundler::scope::ScopeHoistContext::
//! resolve_conflicts` (first-module-wins renaming, `name$N` suffixing on
//! conflict), generalized from "avoid a collision" renaming into
//! "allocate the shortest available name", and extended to also cover
//! the CSS-Modules local names the teacher's JS-only scope pass never
//! produced.

use std::collections::HashMap;

use super::graph::ModuleGraph;
use super::reachability::ChunkGraph;
use super::symbol::{SymbolKind, SymbolRef, SymbolTable};

const FIRST_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_$";
const REST_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_$0123456789";

/// The `index`-th identifier in minification order: `a, b, ..., z, A, ...,
/// $, aa, ab, ...`. Never collides with a JS reserved word because the
/// reserved-word list is checked by the caller before accepting a slot.
#[must_use]
pub fn short_name(mut index: usize) -> String {
    let mut out = vec![FIRST_CHARS[index % FIRST_CHARS.len()]];
    index /= FIRST_CHARS.len();
    if index == 0 {
        return String::from_utf8(out).unwrap();
    }
    index -= 1;
    loop {
        out.push(REST_CHARS[index % REST_CHARS.len()]);
        index /= REST_CHARS.len();
        if index == 0 {
            break;
        }
        index -= 1;
    }
    String::from_utf8(out).unwrap()
}

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "export", "extends", "false", "finally", "for", "function", "if", "import", "in",
    "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "let", "static", "yield", "await", "enum",
];

fn next_available(used: &std::collections::HashSet<String>, mut index: usize) -> (String, usize) {
    loop {
        let candidate = short_name(index);
        index += 1;
        if !RESERVED.contains(&candidate.as_str()) && !used.contains(&candidate) {
            return (candidate, index);
        }
    }
}

/// Rough text-occurrence count used as a use-count proxy, in the same
/// heuristic spirit as `treeshake::extract_export_names`'s line scan —
/// exact reference counting would need the compiler's resolved AST.
fn occurrence_count(source: &str, name: &str) -> usize {
    if name.is_empty() {
        return 0;
    }
    let bytes = source.as_bytes();
    let needle = name.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i + needle.len() <= bytes.len() {
        if &bytes[i..i + needle.len()] == needle {
            let before_ok = i == 0 || !is_ident_char(bytes[i - 1]);
            let after_idx = i + needle.len();
            let after_ok = after_idx == bytes.len() || !is_ident_char(bytes[after_idx]);
            if before_ok && after_ok {
                count += 1;
            }
        }
        i += 1;
    }
    count
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

struct Candidate {
    sym_ref: SymbolRef,
    use_count: usize,
    first_seen: usize,
}

/// Allocate short names for every renameable local JS symbol in a chunk
/// (top-level `Variable`/`Function`/`Class` declarations — imports and
/// re-exports are never renamed directly, they inherit the name of the
/// symbol they resolve to).
///
/// Candidate collection (which symbols exist, in what order) stays
/// sequential since allocation order must be deterministic; the
/// occurrence-count pass over each symbol's module source is independent
/// per candidate, so it runs through `rayon`, the same crate the teacher
/// reaches for on other phase-internal parallel work.
fn minify_js_chunk(graph: &ModuleGraph, symbols: &mut SymbolTable, module_ids: &[super::graph::ModuleId]) {
    use rayon::prelude::*;

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut seen_order = 0usize;

    for &module_id in module_ids {
        let Some(module) = graph.get(module_id) else {
            continue;
        };
        let Some(mod_symbols) = symbols.module(module_id) else {
            continue;
        };
        let renameable: Vec<(SymbolRef, usize, &str)> = mod_symbols
            .iter()
            .filter(|sym| {
                matches!(
                    sym.kind,
                    SymbolKind::Variable { .. } | SymbolKind::Function | SymbolKind::Class
                )
            })
            .enumerate()
            .map(|(i, sym)| (sym.symbol_ref(), seen_order + i, sym.name.as_str()))
            .collect();
        seen_order += renameable.len();

        candidates.extend(renameable.into_par_iter().map(|(sym_ref, first_seen, name)| {
            let use_count = occurrence_count(&module.source, name);
            Candidate { sym_ref, use_count, first_seen }
        }));
    }

    candidates.sort_by(|a, b| b.use_count.cmp(&a.use_count).then(a.first_seen.cmp(&b.first_seen)));

    let mut used = std::collections::HashSet::new();
    let mut next_index = 0;
    for candidate in candidates {
        let (name, advanced) = next_available(&used, next_index);
        next_index = advanced;
        used.insert(name.clone());
        symbols.rename(candidate.sym_ref, name);
    }
}

/// Every JS-reserved or already-in-use-as-a-global name that a CSS-Modules
/// local class name must avoid: CSS has no module scope of its own once
/// output, so two unrelated `.button` classes across different files would
/// otherwise mint the same short slot and collide in the bundled sheet
/// (spec §8 scenario S3). Currently empty — global-CSS declarations pass
/// through unrenamed and the avoid-list exists for deliberate future
/// sources (e.g. a `:global(...)` name also used as a CSS-Modules local).
fn collect_css_avoid_list(_graph: &ModuleGraph) -> std::collections::HashSet<String> {
    std::collections::HashSet::new()
}

/// Allocate short names for CSS-Modules local-scope symbols
/// (`CssLocalName`/`CssKeyframes`/`CssCounterStyle`) across every
/// CSS-Modules file in the build, sharing one allocation order and one
/// `used` set so two files' `.button` locals never mint the same output
/// identifier (spec §4.4 "locality" only guarantees a name is unique
/// *within* its own file — the shared output sheet still needs distinct
/// names across files).
fn minify_css_modules(graph: &ModuleGraph, symbols: &mut SymbolTable, module_ids: &[super::graph::ModuleId]) {
    use rayon::prelude::*;

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut seen_order = 0usize;

    for &module_id in module_ids {
        let Some(module) = graph.get(module_id) else {
            continue;
        };
        let Some(mod_symbols) = symbols.module(module_id) else {
            continue;
        };
        let renameable: Vec<(SymbolRef, usize, &str)> = mod_symbols
            .iter()
            .filter(|sym| sym.is_css())
            .enumerate()
            .map(|(i, sym)| (sym.symbol_ref(), seen_order + i, sym.name.as_str()))
            .collect();
        seen_order += renameable.len();

        candidates.extend(renameable.into_par_iter().map(|(sym_ref, first_seen, name)| {
            let use_count = occurrence_count(&module.source, name);
            Candidate { sym_ref, use_count, first_seen }
        }));
    }

    candidates.sort_by(|a, b| b.use_count.cmp(&a.use_count).then(a.first_seen.cmp(&b.first_seen)));

    let mut used = collect_css_avoid_list(graph);
    let mut next_index = 0;
    for candidate in candidates {
        let (name, advanced) = next_available(&used, next_index);
        next_index = advanced;
        used.insert(name.clone());
        symbols.rename(candidate.sym_ref, name);
    }
}

/// Run the minification phase over every chunk's JS modules and every
/// CSS-Modules module in the graph.
pub fn minify(graph: &ModuleGraph, symbols: &mut SymbolTable, chunk_graph: &ChunkGraph) {
    for chunk in chunk_graph.chunks() {
        if chunk.kind == super::ChunkKind::Js {
            minify_js_chunk(graph, symbols, &chunk.modules);
        }
    }

    let css_module_ids: Vec<super::graph::ModuleId> = graph
        .iter()
        .filter(|(_, m)| m.loader.is_css_modules())
        .map(|(id, _)| id)
        .collect();
    minify_css_modules(graph, symbols, &css_module_ids);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_sequence_skips_reserved_words() {
        let names: Vec<String> = (0..60).map(short_name).collect();
        assert_eq!(names[0], "a");
        assert!(names.contains(&"do".to_string()));
    }

    #[test]
    fn next_available_skips_reserved_and_used() {
        let mut used = std::collections::HashSet::new();
        used.insert("a".to_string());
        let (name, _) = next_available(&used, 0);
        assert_ne!(name, "a");
    }

    #[test]
    fn occurrence_count_matches_whole_identifiers_only() {
        assert_eq!(occurrence_count("let foo = fooBar + foo;", "foo"), 2);
    }

    #[test]
    fn css_modules_across_files_never_share_an_output_name() {
        use super::super::graph::{EntryBitset, Module, ModuleGraph};
        use super::super::loader::Loader;
        use super::super::symbol::{ModuleSymbols, SymbolKind};

        let mut graph = ModuleGraph::new();
        let mk = |path: &str| Module {
            path: path.to_string(),
            loader: Loader::LocalCss,
            is_entry: true,
            source: ".button { color: red; }".to_string(),
            imports: Vec::new(),
            has_side_effects: true,
            entry_bitset: EntryBitset::new(),
            dependencies: Vec::new(),
            dynamic_dependencies: Vec::new(),
        };
        let a = graph.add(mk("/a.module.css"));
        let b = graph.add(mk("/b.module.css"));

        let mut symbols = SymbolTable::new();
        for module_id in [a, b] {
            let mut mod_symbols = ModuleSymbols::new();
            mod_symbols.declare(module_id, "button", SymbolKind::CssLocalName, None);
            symbols.insert_module(module_id, mod_symbols);
        }

        minify_css_modules(&graph, &mut symbols, &[a, b]);

        let a_name = symbols.module(a).unwrap().iter().next().and_then(|s| symbols.output_name(s.symbol_ref())).unwrap().to_string();
        let b_name = symbols.module(b).unwrap().iter().next().and_then(|s| symbols.output_name(s.symbol_ref())).unwrap().to_string();
        assert_ne!(a_name, b_name);
    }
}
