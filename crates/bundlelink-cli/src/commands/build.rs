//! `bundlelink build` command implementation.
//!
//! Scans one or more entry points, links them, and writes the resulting
//! chunks and metafile to an output directory.

use bundlelink_core::linker::{self, scan, BuildContext, DiagnosticLog, ExternalMatcher, LinkerConfig, OutputFormat};
use bundlelink_core::Error as CoreError;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

/// Build command action.
#[derive(Debug, Clone)]
pub struct BuildAction {
    /// Entry point files.
    pub entries: Vec<PathBuf>,
    /// Working directory.
    pub cwd: PathBuf,
    /// Output directory for chunks and the metafile.
    pub outdir: PathBuf,
    /// Output format.
    pub format: OutputFormat,
    /// Minify output.
    pub minify: bool,
    /// Generate source maps.
    pub sourcemap: bool,
    /// Pre-resolve external patterns (matched against the raw specifier).
    pub external: Vec<String>,
    /// Enable tree shaking (dead code elimination).
    pub treeshake: bool,
    /// Enable code splitting for dynamic imports.
    pub splitting: bool,
    /// Merge chunks smaller than this many bytes into their most frequent
    /// consumer.
    pub min_chunk_size: Option<usize>,
    /// Public path prefix for emitted asset/chunk references.
    pub public_path: Option<String>,
}

#[derive(Serialize)]
struct BuildResultJson {
    ok: bool,
    entries: Vec<String>,
    outdir: String,
    chunks: Vec<ChunkJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assets: Vec<AssetJson>,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<DiagnosticJson>,
}

#[derive(Serialize)]
struct ChunkJson {
    path: String,
    kind: String,
    bytes: usize,
}

#[derive(Serialize)]
struct AssetJson {
    path: String,
    bytes: usize,
}

#[derive(Serialize)]
struct DiagnosticJson {
    severity: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

/// Run the build command.
pub fn run(action: BuildAction, json: bool) -> Result<()> {
    let start = Instant::now();

    let mut external = ExternalMatcher::new();
    for pattern in &action.external {
        external.add_pre_resolve(pattern);
    }

    let scan_span = tracing::info_span!("scan", entries = action.entries.len());
    let scan_result = {
        let _guard = scan_span.enter();
        scan::scan(&action.entries, &action.cwd, &external)
    };

    let config = LinkerConfig {
        format: action.format,
        minify: action.minify,
        sourcemap: action.sourcemap,
        external,
        treeshake: action.treeshake,
        splitting: action.splitting,
        min_chunk_size: action.min_chunk_size,
        public_path: action.public_path.clone(),
        ..Default::default()
    };

    let mut ctx = BuildContext::new(scan_result.graph, config);
    ctx.symbols = scan_result.symbols;
    ctx.diagnostics.extend(DiagnosticLog::merge(vec![scan_result.diagnostics]));

    if ctx.diagnostics.has_errors() {
        let diagnostics = ctx.diagnostics.into_vec();
        report_failure(&diagnostics, json, start.elapsed().as_millis() as u64, &action);
        std::process::exit(1);
    }

    let link_span = tracing::info_span!("link");
    let result = {
        let _guard = link_span.enter();
        linker::link(ctx, &scan_result.entries)
    };

    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(build) => {
            std::fs::create_dir_all(&action.outdir).into_diagnostic()?;

            let mut chunk_summaries = Vec::with_capacity(build.chunks.len());
            for chunk in &build.chunks {
                let chunk_path = action.outdir.join(&chunk.output_path);
                if let Some(parent) = chunk_path.parent() {
                    std::fs::create_dir_all(parent).into_diagnostic()?;
                }
                write_output(&chunk_path, chunk.code.as_bytes())?;
                if let Some(ref map) = chunk.sourcemap {
                    write_output(&chunk_path.with_extension("js.map"), map.as_bytes())?;
                }
                chunk_summaries.push(ChunkJson {
                    path: chunk.output_path.clone(),
                    kind: format!("{:?}", chunk.kind).to_lowercase(),
                    bytes: chunk.byte_size,
                });
            }

            let mut asset_summaries = Vec::with_capacity(build.assets.len());
            for asset in &build.assets {
                let asset_path = action.outdir.join(&asset.output_path);
                if let Some(parent) = asset_path.parent() {
                    std::fs::create_dir_all(parent).into_diagnostic()?;
                }
                write_output(&asset_path, &asset.bytes)?;
                asset_summaries.push(AssetJson {
                    path: asset.output_path.clone(),
                    bytes: asset.bytes.len(),
                });
            }

            let metafile_json = build.metafile.to_json().map_err(CoreError::from).into_diagnostic()?;
            write_output(&action.outdir.join("metafile.json"), metafile_json.as_bytes())?;

            if json {
                let payload = BuildResultJson {
                    ok: true,
                    entries: action.entries.iter().map(|p| p.display().to_string()).collect(),
                    outdir: action.outdir.display().to_string(),
                    chunks: chunk_summaries,
                    assets: asset_summaries,
                    duration_ms,
                    diagnostics: build.diagnostics.iter().map(diagnostic_json).collect(),
                };
                println!("{}", serde_json::to_string(&payload).unwrap());
            } else {
                println!("built {} chunk(s) in {duration_ms}ms -> {}", build.chunks.len(), action.outdir.display());
                for chunk in &build.chunks {
                    let kb = chunk.byte_size as f64 / 1024.0;
                    println!("  {} ({kb:.1}KB)", chunk.output_path);
                }
                for asset in &build.assets {
                    let kb = asset.bytes.len() as f64 / 1024.0;
                    println!("  {} ({kb:.1}KB)", asset.output_path);
                }
                for diag in &build.diagnostics {
                    eprintln!("{diag}");
                }
            }

            Ok(())
        }
        Err(diagnostics) => {
            report_failure(&diagnostics, json, duration_ms, &action);
            std::process::exit(1);
        }
    }
}

fn write_output(path: &std::path::Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)
        .map_err(|source| CoreError::WriteOutput { path: path.to_path_buf(), source })
        .into_diagnostic()
}

fn report_failure(
    diagnostics: &[bundlelink_core::linker::Diagnostic],
    json: bool,
    duration_ms: u64,
    action: &BuildAction,
) {
    if json {
        let payload = BuildResultJson {
            ok: false,
            entries: action.entries.iter().map(|p| p.display().to_string()).collect(),
            outdir: action.outdir.display().to_string(),
            chunks: Vec::new(),
            assets: Vec::new(),
            duration_ms,
            diagnostics: diagnostics.iter().map(diagnostic_json).collect(),
        };
        println!("{}", serde_json::to_string(&payload).unwrap());
    } else {
        for diag in diagnostics {
            eprintln!("{diag}");
        }
    }
}

fn diagnostic_json(diag: &bundlelink_core::linker::Diagnostic) -> DiagnosticJson {
    DiagnosticJson {
        severity: diag.severity.as_str().to_string(),
        message: diag.message.clone(),
        path: diag.location.as_ref().map(|l| l.path.display().to_string()),
    }
}

/// Parse an output-format string, as accepted by the `--format` flag.
#[must_use]
pub fn parse_format(s: &str) -> Option<OutputFormat> {
    match s.to_lowercase().as_str() {
        "esm" | "es" | "module" => Some(OutputFormat::Esm),
        "cjs" | "commonjs" => Some(OutputFormat::Cjs),
        "iife" => Some(OutputFormat::Iife),
        _ => None,
    }
}
