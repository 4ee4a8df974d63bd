//! Chunk Assembler & Printer-Driver (spec §4.6): per-chunk module
//! ordering, runtime-helper and asset-URL resolution, content hashing,
//! and source-map generation.
//!
//! Grounded in the teacher's `bundler::emit` (VLQ sourcemap encoder,
//! `bundlelink-parser`-based minification pass), generalized from "emit one
//! JS bundle" into "assemble N chunks of either kind", and in
//! `bundler::assets` for the blake3 content-hashing scheme.

use std::collections::HashMap;

use super::assets::EmittedAsset;
use super::graph::{ImportKind, ModuleGraph, ModuleId, Resolution};
use super::js_linker::{detect_format, ModuleFormat, RuntimeHelper, RuntimeHelperSet};
use super::loader::ChunkKind;
use super::reachability::{Chunk, ChunkGraph, ChunkId};
use super::symbol::SymbolTable;
use super::template::TemplateContext;
use super::LinkerConfig;

/// One fully assembled output chunk: final bytes, output path (with its
/// `[hash]` placeholder resolved), and the source map if requested.
#[derive(Debug, Clone)]
pub struct AssembledChunk {
    pub chunk_id: ChunkId,
    pub kind: ChunkKind,
    pub output_path: String,
    pub code: String,
    pub sourcemap: Option<String>,
    pub byte_size: usize,
}

/// For every chunk, how many of its import edges point at each other
/// chunk — used by `reachability::merge_small_chunks` to pick the most
/// frequent consumer of an undersized chunk (spec §4.1, §4.6).
#[must_use]
pub fn compute_consumer_edges(
    graph: &ModuleGraph,
    chunk_graph: &ChunkGraph,
) -> HashMap<ChunkId, HashMap<ChunkId, u32>> {
    let mut edges: HashMap<ChunkId, HashMap<ChunkId, u32>> = HashMap::new();

    for (module_id, module) in graph.iter() {
        let Some(kind) = module.loader.produces_chunk_kind() else {
            continue;
        };
        let Some(from_chunk) = chunk_graph.chunk_for_module(module_id, kind) else {
            continue;
        };
        for import in &module.imports {
            let Resolution::Internal(target) = import.resolution else {
                continue;
            };
            let Some(target_module) = graph.get(target) else {
                continue;
            };
            let Some(target_kind) = target_module.loader.produces_chunk_kind() else {
                continue;
            };
            let Some(to_chunk) = chunk_graph.chunk_for_module(target, target_kind) else {
                continue;
            };
            if to_chunk == from_chunk {
                continue;
            }
            *edges.entry(to_chunk).or_default().entry(from_chunk).or_insert(0) += 1;
        }
    }

    edges
}

/// Order a chunk's modules for emission: dependency order with cycles
/// broken on the last-entered back-edge (spec §4.6), restricted to the
/// modules this chunk actually owns.
fn order_chunk_modules(graph: &ModuleGraph, chunk: &Chunk) -> Vec<ModuleId> {
    let owned: std::collections::HashSet<ModuleId> = chunk.modules.iter().copied().collect();
    graph
        .toposort()
        .into_iter()
        .filter(|id| owned.contains(id))
        .collect()
}

fn print_js_module(graph: &ModuleGraph, symbols: &SymbolTable, module_id: ModuleId) -> String {
    let Some(module) = graph.get(module_id) else {
        return String::new();
    };
    let Some(mod_symbols) = symbols.module(module_id) else {
        return module.source.clone();
    };

    let mut out = module.source.clone();
    for sym in mod_symbols.iter() {
        let sym_ref = sym.symbol_ref();
        if let Some(renamed) = symbols.output_name(sym_ref) {
            if renamed != sym.name {
                out = rename_identifier(&out, &sym.name, renamed);
            }
        }
    }
    out
}

/// Whole-word identifier substitution — renaming has already been scoped
/// to this module's own declared names, so a textual pass is safe here
/// the same way `minify::occurrence_count` is.
fn rename_identifier(source: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let bytes = source.as_bytes();
    let needle = from.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(needle) {
            let before_ok = i == 0 || !is_ident_char(bytes[i - 1]);
            let after_idx = i + needle.len();
            let after_ok = after_idx >= bytes.len() || !is_ident_char(bytes[after_idx]);
            if before_ok && after_ok {
                out.push_str(to);
                i += needle.len();
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Every internal module whose declared format differs from at least one
/// of its internal importers' formats — these need their printed body
/// wrapped in a format adapter (spec §4.3) rather than spliced in as-is.
fn modules_needing_format_wrap(
    graph: &ModuleGraph,
    order: &[ModuleId],
    formats: &HashMap<ModuleId, ModuleFormat>,
) -> std::collections::HashSet<ModuleId> {
    let mut needs_wrap = std::collections::HashSet::new();
    for &module_id in order {
        let Some(module) = graph.get(module_id) else { continue };
        let Some(&importer_format) = formats.get(&module_id) else { continue };
        for import in &module.imports {
            if !matches!(import.kind, ImportKind::ImportStatement | ImportKind::RequireCall) {
                continue;
            }
            let Resolution::Internal(target) = import.resolution else { continue };
            let Some(&target_format) = formats.get(&target) else { continue };
            if target_format != importer_format {
                needs_wrap.insert(target);
            }
        }
    }
    needs_wrap
}

/// Wrap a module whose own format doesn't match its importer's: a CJS
/// module consumed from ESM is wrapped in an IIFE exposing `module.exports`
/// through the `__cjsToEsm` runtime helper; an ESM module consumed via
/// `require()` is wrapped to collect its exports into a namespace object
/// through `__ns`. The variable name carries the module id so multiple
/// wrapped modules in one chunk never collide.
fn wrap_module_format(module_id: ModuleId, printed: &str, format: ModuleFormat) -> String {
    let var = format!("__mod_{}", module_id.0);
    match format {
        ModuleFormat::Cjs => format!(
            "const {var} = __cjsToEsm((function(module, exports) {{\n{printed}\nreturn module.exports;\n}})({{ exports: {{}} }}, {{}}));\n"
        ),
        ModuleFormat::Esm => format!(
            "const {var} = __ns((function() {{\nconst exports = {{}};\n{printed}\nreturn exports;\n}})());\n"
        ),
    }
}

fn assemble_js_chunk(
    graph: &ModuleGraph,
    symbols: &SymbolTable,
    chunk: &Chunk,
    config: &LinkerConfig,
) -> String {
    let mut helpers = RuntimeHelperSet::default();
    let order = order_chunk_modules(graph, chunk);
    let formats: HashMap<ModuleId, ModuleFormat> = order
        .iter()
        .filter_map(|&id| graph.get(id).map(|m| (id, detect_format(&m.source))))
        .collect();
    let needs_wrap = modules_needing_format_wrap(graph, &order, &formats);

    for &module_id in &order {
        let Some(module) = graph.get(module_id) else {
            continue;
        };
        for import in &module.imports {
            match import.kind {
                ImportKind::DynamicImport => helpers.require(RuntimeHelper::DynamicImportShim),
                ImportKind::RequireCall if matches!(import.resolution, Resolution::Internal(_)) => {
                    helpers.require(RuntimeHelper::CjsToEsmAdapter);
                }
                _ => {}
            }
        }
        if needs_wrap.contains(&module_id) {
            match formats.get(&module_id) {
                Some(ModuleFormat::Cjs) => helpers.require(RuntimeHelper::CjsToEsmAdapter),
                Some(ModuleFormat::Esm) => helpers.require(RuntimeHelper::NamespaceBuilder),
                None => {}
            }
        }
    }

    let mut body = String::new();
    body.push_str(&helpers.emit());
    for &module_id in &order {
        body.push_str("// ");
        if let Some(m) = graph.get(module_id) {
            body.push_str(&m.path);
        }
        body.push('\n');
        let printed = print_js_module(graph, symbols, module_id);
        let printed = match (needs_wrap.contains(&module_id), formats.get(&module_id)) {
            (true, Some(&format)) => wrap_module_format(module_id, &printed, format),
            _ => printed,
        };
        body.push_str(&printed);
        body.push('\n');
    }

    if config.minify {
        minify_bundle(&body).unwrap_or(body)
    } else {
        body
    }
}

fn minify_bundle(code: &str) -> Result<String, ()> {
    let opts = bundlelink_parser::ParserOptions {
        module: false,
        ..Default::default()
    };
    let ast = bundlelink_parser::Parser::new(code, opts).parse().map_err(|_| ())?;
    let codegen_opts = bundlelink_parser::CodegenOptions {
        minify: true,
        ..Default::default()
    };
    Ok(bundlelink_parser::Codegen::new(&ast, codegen_opts).generate())
}

/// Walk every module reachable by a `CssUrlToken` import edge and resolve
/// its final reference: a `data:` URL for inlining loaders (spec §4.4),
/// or an emitted asset at its templated, content-hashed output path
/// otherwise.
fn collect_css_assets(graph: &ModuleGraph, template: &super::template::PathTemplate) -> HashMap<ModuleId, String> {
    let mut replacements = HashMap::new();
    for (_, module) in graph.iter() {
        if !module.loader.is_css() {
            continue;
        }
        for import in &module.imports {
            let ImportKind::CssUrlToken = import.kind else { continue };
            let Resolution::Internal(target) = import.resolution else { continue };
            if replacements.contains_key(&target) {
                continue;
            }
            let Some(target_module) = graph.get(target) else { continue };
            let bytes = target_module.source.as_bytes();
            let replacement = if target_module.loader.inlines_bytes() {
                let ext = std::path::Path::new(&target_module.path).extension().and_then(|e| e.to_str()).unwrap_or("");
                super::assets::data_url(super::assets::guess_mime(ext), bytes)
            } else {
                emit_asset(target_module, bytes, template).output_path
            };
            replacements.insert(target, replacement);
        }
    }
    replacements
}

fn emit_asset(module: &super::graph::Module, bytes: &[u8], template: &super::template::PathTemplate) -> EmittedAsset {
    super::assets::emit_asset(std::path::Path::new(&module.path), bytes, module.loader, template)
}

/// Every non-inlined asset an internally resolved `url()` token points
/// at, ready for the CLI to write to disk alongside the chunks.
#[must_use]
pub fn collect_emitted_assets(graph: &ModuleGraph, config: &LinkerConfig) -> Vec<EmittedAsset> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for (_, module) in graph.iter() {
        if !module.loader.is_css() {
            continue;
        }
        for import in &module.imports {
            let ImportKind::CssUrlToken = import.kind else { continue };
            let Resolution::Internal(target) = import.resolution else { continue };
            if !seen.insert(target) {
                continue;
            }
            let Some(target_module) = graph.get(target) else { continue };
            if target_module.loader.inlines_bytes() {
                continue;
            }
            out.push(emit_asset(target_module, target_module.source.as_bytes(), &config.asset_name_template));
        }
    }
    out
}

fn assemble_css_chunk(
    graph: &ModuleGraph,
    chunk: &Chunk,
    config: &LinkerConfig,
    asset_replacements: &HashMap<ModuleId, String>,
) -> String {
    let order = order_chunk_modules(graph, chunk);
    let mut rules = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let resolve_asset = |target: ModuleId| asset_replacements.get(&target).cloned();
    for &module_id in &order {
        if !graph.get(module_id).map_or(false, |m| m.is_entry) {
            continue;
        }
        let (module_rules, _) = super::css_linker::inline_imports_with_assets(graph, module_id, &resolve_asset);
        for rule in module_rules {
            let fp = super::css_linker::rule_fingerprint(&rule);
            if seen.insert(fp) {
                rules.push(rule);
            }
        }
    }
    let printed = super::css_linker::print_rules(&rules);
    if config.minify {
        minify_css(&printed).unwrap_or(printed)
    } else {
        printed
    }
}

/// Whitespace-level CSS minification via `lightningcss`, run on the
/// already-linked rule text (the teacher's `css::mod` uses the same
/// parse/minify/print round trip for its single-file path).
fn minify_css(code: &str) -> Result<String, ()> {
    use lightningcss::printer::PrinterOptions;
    use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};

    let mut sheet = StyleSheet::parse(code, ParserOptions::default()).map_err(|_| ())?;
    sheet.minify(MinifyOptions::default()).map_err(|_| ())?;
    let result = sheet.to_css(PrinterOptions { minify: true, ..Default::default() }).map_err(|_| ())?;
    Ok(result.code)
}

fn vlq_encode(value: i64, out: &mut String) {
    const B64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    #[allow(clippy::cast_sign_loss)]
    let mut v = (if value < 0 { ((-value) << 1) | 1 } else { value << 1 }) as u64;
    loop {
        let mut digit = (v & 0x1f) as u8;
        v >>= 5;
        if v > 0 {
            digit |= 0x20;
        }
        out.push(B64[digit as usize] as char);
        if v == 0 {
            break;
        }
    }
}

/// A minimal line-level V3 source map: one segment per output line,
/// mapping back to the same line in its originating module (spec §4.6
/// doesn't require column-accurate maps, only that positions resolve to
/// the right source file).
fn build_sourcemap(graph: &ModuleGraph, order: &[ModuleId], file: &str) -> String {
    let mut sources = Vec::new();
    let mut sources_content = Vec::new();
    let mut mappings = String::new();
    let mut prev_source = 0i64;

    for (i, &module_id) in order.iter().enumerate() {
        let Some(module) = graph.get(module_id) else {
            continue;
        };
        sources.push(format!("\"{}\"", module.path.replace('"', "\\\"")));
        sources_content.push(format!("\"{}\"", module.source.replace('"', "\\\"").replace('\n', "\\n")));
        if i > 0 {
            mappings.push(';');
        }
        vlq_encode(0, &mut mappings);
        vlq_encode(i as i64 - prev_source, &mut mappings);
        vlq_encode(0, &mut mappings);
        vlq_encode(0, &mut mappings);
        prev_source = i as i64;
    }

    format!(
        "{{\"version\":3,\"file\":\"{file}\",\"sources\":[{}],\"sourcesContent\":[{}],\"mappings\":\"{mappings}\"}}",
        sources.join(","),
        sources_content.join(",")
    )
}

/// Run the assembly phase: order each chunk's modules, print and
/// optionally minify its code, compute its content hash, and back-patch
/// the hash into its output path (spec §4.6, §6 `[hash]` placeholder).
#[must_use]
pub fn assemble(
    graph: &ModuleGraph,
    symbols: &SymbolTable,
    chunk_graph: &ChunkGraph,
    config: &LinkerConfig,
) -> Vec<AssembledChunk> {
    let mut out = Vec::new();
    let asset_replacements = collect_css_assets(graph, &config.asset_name_template);

    for chunk in chunk_graph.chunks() {
        let code = match chunk.kind {
            ChunkKind::Js => assemble_js_chunk(graph, symbols, chunk, config),
            ChunkKind::Css => assemble_css_chunk(graph, chunk, config, &asset_replacements),
        };

        let representative = chunk
            .modules
            .iter()
            .filter_map(|&id| graph.get(id))
            .min_by_key(|m| m.path.clone());
        let stem = representative
            .and_then(|m| std::path::Path::new(&m.path).file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or("chunk");
        let ext = match chunk.kind {
            ChunkKind::Js => "js",
            ChunkKind::Css => "css",
        };

        let template = &config.chunk_name_template;
        let output_path = if template.has_hash() {
            let hash = super::assets::hash_content(&code);
            let ctx = TemplateContext {
                name: stem,
                dir: "",
                ext,
                hash: Some(&hash[..16.min(hash.len())]),
            };
            template.render(&ctx)
        } else {
            let ctx = TemplateContext {
                name: stem,
                dir: "",
                ext,
                hash: None,
            };
            template.render(&ctx)
        };

        let sourcemap = if config.sourcemap && chunk.kind == ChunkKind::Js {
            let order = order_chunk_modules(graph, chunk);
            Some(build_sourcemap(graph, &order, &output_path))
        } else {
            None
        };

        out.push(AssembledChunk {
            chunk_id: chunk.id,
            kind: chunk.kind,
            byte_size: code.len(),
            output_path,
            code,
            sourcemap,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::graph::Module;
    use super::super::loader::Loader;
    use super::super::reachability::{assign_chunks, compute_entry_bitsets};
    use super::super::graph::{EntryBitset, EntryId};

    fn js_module(path: &str, source: &str) -> Module {
        Module {
            path: path.to_string(),
            loader: Loader::Js,
            is_entry: true,
            source: source.to_string(),
            imports: Vec::new(),
            has_side_effects: true,
            entry_bitset: EntryBitset::new(),
            dependencies: Vec::new(),
            dynamic_dependencies: Vec::new(),
        }
    }

    #[test]
    fn assembles_single_entry_chunk_with_content() {
        let mut graph = ModuleGraph::new();
        let a = graph.add(js_module("/a.ts", "const x = 1;"));
        let entries = vec![(EntryId(0), a)];
        compute_entry_bitsets(&mut graph, &entries);
        let chunk_graph = assign_chunks(&graph, &entries);
        let symbols = SymbolTable::new();
        let config = LinkerConfig::default();

        let chunks = assemble(&graph, &symbols, &chunk_graph, &config);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].code.contains("const x = 1;"));
        assert!(chunks[0].output_path.ends_with(".js"));
    }

    #[test]
    fn consumer_edges_count_cross_chunk_imports() {
        let mut graph = ModuleGraph::new();
        let shared = graph.add(Module {
            is_entry: false,
            ..js_module("/shared.ts", "export const s = 1;")
        });
        let mut a = js_module("/a.ts", "import { s } from './shared';");
        a.dependencies.push(shared);
        a.imports.push(super::super::graph::ImportRecord {
            specifier: "./shared".into(),
            referrer: ModuleId(0),
            resolution: Resolution::Internal(shared),
            kind: ImportKind::ImportStatement,
            condition: None,
            span: None,
        });
        let a_id = graph.add(a);
        let mut b = js_module("/b.ts", "import { s } from './shared';");
        b.dependencies.push(shared);
        b.imports.push(super::super::graph::ImportRecord {
            specifier: "./shared".into(),
            referrer: ModuleId(1),
            resolution: Resolution::Internal(shared),
            kind: ImportKind::ImportStatement,
            condition: None,
            span: None,
        });
        let b_id = graph.add(b);

        let entries = vec![(EntryId(0), a_id), (EntryId(1), b_id)];
        compute_entry_bitsets(&mut graph, &entries);
        let chunk_graph = assign_chunks(&graph, &entries);
        let edges = compute_consumer_edges(&graph, &chunk_graph);

        let shared_chunk = chunk_graph.chunk_for_module(shared, ChunkKind::Js).unwrap();
        assert_eq!(edges.get(&shared_chunk).map(|m| m.values().sum::<u32>()), Some(2));
    }

    #[test]
    fn cjs_module_imported_from_esm_is_wrapped_with_adapter() {
        let mut graph = ModuleGraph::new();
        let legacy = graph.add(Module {
            is_entry: false,
            ..js_module("/legacy.js", "module.exports = { greet() {} };")
        });
        let mut entry = js_module("/entry.js", "import legacy from './legacy';");
        entry.dependencies.push(legacy);
        entry.imports.push(super::super::graph::ImportRecord {
            specifier: "./legacy".into(),
            referrer: ModuleId(0),
            resolution: Resolution::Internal(legacy),
            kind: ImportKind::ImportStatement,
            condition: None,
            span: None,
        });
        let entry_id = graph.add(entry);

        let entries = vec![(EntryId(0), entry_id)];
        compute_entry_bitsets(&mut graph, &entries);
        let chunk_graph = assign_chunks(&graph, &entries);
        let symbols = SymbolTable::new();
        let config = LinkerConfig::default();

        let chunks = assemble(&graph, &symbols, &chunk_graph, &config);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].code.contains("__cjsToEsm"));
        assert!(chunks[0].code.contains("function(module, exports)"));
    }

    #[test]
    fn esm_only_chunk_has_no_format_wrapping() {
        let mut graph = ModuleGraph::new();
        let a = graph.add(js_module("/a.ts", "export const x = 1;"));
        let entries = vec![(EntryId(0), a)];
        compute_entry_bitsets(&mut graph, &entries);
        let chunk_graph = assign_chunks(&graph, &entries);
        let symbols = SymbolTable::new();
        let config = LinkerConfig::default();

        let chunks = assemble(&graph, &symbols, &chunk_graph, &config);
        assert!(!chunks[0].code.contains("__cjsToEsm"));
        assert!(!chunks[0].code.contains("__ns("));
    }

    #[test]
    fn css_url_token_emits_asset_and_rewrites_reference() {
        let mut graph = ModuleGraph::new();
        let logo = graph.add(Module {
            path: "/logo.png".to_string(),
            loader: Loader::File,
            is_entry: false,
            source: "fake-png-bytes".to_string(),
            imports: Vec::new(),
            has_side_effects: true,
            entry_bitset: EntryBitset::new(),
            dependencies: Vec::new(),
            dynamic_dependencies: Vec::new(),
        });
        let mut sheet = Module {
            path: "/main.css".to_string(),
            loader: Loader::Css,
            is_entry: true,
            source: ".bg { background: url(\"./logo.png\"); }".to_string(),
            imports: Vec::new(),
            has_side_effects: true,
            entry_bitset: EntryBitset::new(),
            dependencies: vec![logo],
            dynamic_dependencies: Vec::new(),
        };
        sheet.imports.push(super::super::graph::ImportRecord {
            specifier: "./logo.png".into(),
            referrer: ModuleId(0),
            resolution: Resolution::Internal(logo),
            kind: ImportKind::CssUrlToken,
            condition: None,
            span: None,
        });
        let sheet_id = graph.add(sheet);

        let entries = vec![(EntryId(0), sheet_id)];
        compute_entry_bitsets(&mut graph, &entries);
        let chunk_graph = assign_chunks(&graph, &entries);
        let symbols = SymbolTable::new();
        let config = LinkerConfig::default();

        let assets = collect_emitted_assets(&graph, &config);
        assert_eq!(assets.len(), 1);
        assert!(assets[0].output_path.contains("logo"));

        let chunks = assemble(&graph, &symbols, &chunk_graph, &config);
        let css_chunk = chunks.iter().find(|c| c.kind == ChunkKind::Css).unwrap();
        assert!(!css_chunk.code.contains("./logo.png"));
        assert!(css_chunk.code.contains(&assets[0].output_path));
    }
}
