//! The linker (spec §1–§9): accepts a set of already-parsed modules with
//! their import/export records, CSS rules, and per-file symbol tables,
//! and produces the final chunked output.
//!
//! ## Architecture
//!
//! Data flows in one direction, each phase fully completing before the
//! next begins (spec §5):
//!
//! 1. **Graph** — resolved modules joined by import records (`graph`).
//! 2. **Reachability** — entry bitsets and chunk assignment (`reachability`).
//! 3. **Tree-shake** — liveness marking from entry roots (`treeshake`).
//! 4. **JS Linker** — format wrapping, export-star, runtime helpers (`js_linker`).
//! 5. **CSS Linker** — `@import` inlining, dedup, CSS-Modules (`css_linker`).
//! 6. **Name Minifier** — short-identifier allocation (`minify`).
//! 7. **Assembler** — per-chunk ordering, URL rewriting, hashing (`assemble`).
//! 8. **Metafile** — structured build report (`metafile`).
//!
//! Grounded in the teacher's `bundler::Bundler` orchestrator (same
//! phase-by-phase shape: build graph, optionally split, emit, collect
//! assets), generalized from a single-entry JS-only pipeline into the
//! spec's multi-entry, multi-kind linker. The teacher's plugin system
//! (`bundler::plugin`) has no counterpart in the spec and is dropped.

pub mod assembly;
pub mod assets;
pub mod css_linker;
pub mod diagnostics;
pub mod external;
pub mod graph;
pub mod js_linker;
pub mod loader;
pub mod metafile;
pub mod minify;
pub mod reachability;
pub mod resolve;
pub mod scan;
pub mod symbol;
pub mod template;
pub mod treeshake;

pub use diagnostics::{Diagnostic, DiagnosticLog, Location, Severity};
pub use external::ExternalMatcher;
pub use graph::{EntryBitset, EntryId, ImportCondition, ImportKind, ImportRecord, Module, ModuleGraph, ModuleId, Resolution};
pub use loader::{ChunkKind, Loader};
pub use reachability::{assign_chunks, compute_entry_bitsets, Chunk, ChunkGraph, ChunkId};
pub use resolve::{ResolveError, ResolveResult, Resolver};
pub use symbol::{LocalId, ModuleSymbols, Symbol, SymbolKind, SymbolRef, SymbolTable};
pub use template::{PathTemplate, TemplateContext};

/// An import statement as produced by the external parser (spec §1: the
/// parser is a fixed external collaborator). The linker's own
/// `ImportRecord` (in `graph`) is the resolved form built from these.
#[derive(Debug, Clone)]
pub struct Import {
    pub specifier: String,
    pub dynamic: bool,
    pub names: Vec<ImportedName>,
}

#[derive(Debug, Clone)]
pub struct ImportedName {
    pub imported: String,
    pub local: String,
}

/// Output format for the JS linker (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Esm,
    Cjs,
    Iife,
}

/// Build-wide configuration threaded through every phase (spec §9
/// "Global state: avoid it — pass a build context value"), generalizing
/// the teacher's `BundleOptions`.
#[derive(Debug, Clone)]
pub struct LinkerConfig {
    pub format: OutputFormat,
    pub minify: bool,
    pub sourcemap: bool,
    pub external: ExternalMatcher,
    pub target: crate::compiler::Target,
    pub treeshake: bool,
    pub splitting: bool,
    pub min_chunk_size: Option<usize>,
    pub public_path: Option<String>,
    pub chunk_name_template: PathTemplate,
    pub asset_name_template: PathTemplate,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Esm,
            minify: false,
            sourcemap: false,
            external: ExternalMatcher::new(),
            target: crate::compiler::Target::ES2020,
            treeshake: true,
            splitting: true,
            min_chunk_size: None,
            public_path: None,
            chunk_name_template: PathTemplate::parse("[name]-[hash].[ext]"),
            asset_name_template: PathTemplate::parse("assets/[name]-[hash].[ext]"),
        }
    }
}

/// The value threaded through every linker phase (spec §9 build context):
/// the module registry, symbol table, diagnostic log, and config.
pub struct BuildContext {
    pub graph: ModuleGraph,
    pub symbols: SymbolTable,
    pub diagnostics: DiagnosticLog,
    pub config: LinkerConfig,
}

impl BuildContext {
    #[must_use]
    pub fn new(graph: ModuleGraph, config: LinkerConfig) -> Self {
        Self {
            graph,
            symbols: SymbolTable::new(),
            diagnostics: DiagnosticLog::new(),
            config,
        }
    }
}

/// The final linked build: one output per chunk, plus the metafile.
#[derive(Debug)]
pub struct LinkedBuild {
    pub chunks: Vec<assembly::AssembledChunk>,
    pub assets: Vec<assets::EmittedAsset>,
    pub metafile: metafile::Metafile,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the whole pipeline over an already-built, already-resolved module
/// graph and a list of (entry id, module id) pairs (spec §2 data flow).
/// Each phase fully completes before the next begins; the pipeline
/// aborts after any phase whose diagnostics contain an ERROR (spec §5,
/// §7).
pub fn link(mut ctx: BuildContext, entries: &[(EntryId, ModuleId)]) -> Result<LinkedBuild, Vec<Diagnostic>> {
    reachability::compute_entry_bitsets(&mut ctx.graph, entries);
    let mut chunk_graph = reachability::assign_chunks(&ctx.graph, entries);

    if let Some(min_size) = ctx.config.min_chunk_size {
        let consumer_edges = assembly::compute_consumer_edges(&ctx.graph, &chunk_graph);
        reachability::merge_small_chunks(&mut chunk_graph, &ctx.graph, min_size, &consumer_edges);
    }

    let entry_modules: Vec<ModuleId> = entries.iter().map(|(_, m)| *m).collect();
    let (shake_result, shake_diags) = if ctx.config.treeshake {
        treeshake::shake(&ctx.graph, &entry_modules, |path| path.contains("node_modules"))
    } else {
        (treeshake::ShakeResult::default(), Vec::new())
    };
    ctx.diagnostics.extend(DiagnosticLog::merge(vec![shake_diags]));
    if ctx.diagnostics.has_errors() {
        return Err(ctx.diagnostics.into_vec());
    }

    let js_diags = js_linker::link(&mut ctx.graph, &mut ctx.symbols, &chunk_graph, &shake_result, &ctx.config);
    let css_diags = css_linker::link(&ctx.graph, &mut ctx.symbols, &chunk_graph, &ctx.config);
    ctx.diagnostics.extend(DiagnosticLog::merge(vec![js_diags, css_diags]));
    if ctx.diagnostics.has_errors() {
        return Err(ctx.diagnostics.into_vec());
    }

    minify::minify(&ctx.graph, &mut ctx.symbols, &chunk_graph);

    let chunks = assembly::assemble(&ctx.graph, &ctx.symbols, &chunk_graph, &ctx.config);
    let assets = assembly::collect_emitted_assets(&ctx.graph, &ctx.config);
    let metafile = metafile::build(&ctx.graph, &chunk_graph, entries, &chunks);

    Ok(LinkedBuild {
        chunks,
        assets,
        metafile,
        diagnostics: ctx.diagnostics.into_vec(),
    })
}
