#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bundlelink")]
#[command(author, version, about = "A multi-language module linker", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Link one or more entry points into output chunks
    Build {
        /// Entry point files
        entries: Vec<PathBuf>,

        /// Output directory for chunks and the metafile
        #[arg(long, short = 'o', default_value = "dist")]
        outdir: PathBuf,

        /// Output format: "esm", "cjs", or "iife"
        #[arg(long, default_value = "esm")]
        format: String,

        /// Minify output
        #[arg(long)]
        minify: bool,

        /// Generate source maps
        #[arg(long)]
        sourcemap: bool,

        /// Mark a specifier (or pattern) as external, never bundled
        #[arg(long = "external", value_name = "PATTERN")]
        external: Vec<String>,

        /// Disable tree shaking
        #[arg(long)]
        no_treeshake: bool,

        /// Disable code splitting for dynamic imports
        #[arg(long)]
        no_splitting: bool,

        /// Merge chunks smaller than this many bytes into their most
        /// frequent consumer
        #[arg(long)]
        min_chunk_size: Option<usize>,

        /// Public path prefix for emitted asset/chunk references
        #[arg(long)]
        public_path: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    if let Some(Commands::Build {
        entries,
        outdir,
        format,
        minify,
        sourcemap,
        external,
        no_treeshake,
        no_splitting,
        min_chunk_size,
        public_path,
    }) = &cli.command
    {
        logging::init(cli.verbose, cli.json);

        let Some(format) = commands::build::parse_format(format) else {
            eprintln!("error: unknown output format \"{format}\" (expected esm, cjs, or iife)");
            std::process::exit(2);
        };

        let entries: Vec<PathBuf> = entries
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { cwd.join(p) })
            .collect();
        if entries.is_empty() {
            eprintln!("error: at least one entry point is required");
            std::process::exit(2);
        }

        let action = commands::build::BuildAction {
            entries,
            cwd: cwd.clone(),
            outdir: if outdir.is_absolute() { outdir.clone() } else { cwd.join(outdir) },
            format,
            minify: *minify,
            sourcemap: *sourcemap,
            external: external.clone(),
            treeshake: !*no_treeshake,
            splitting: !*no_splitting,
            min_chunk_size: *min_chunk_size,
            public_path: public_path.clone(),
        };
        return commands::build::run(action, cli.json);
    }

    logging::init(cli.verbose, cli.json);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Build { .. }) => unreachable!("handled above"),
    }
}
