//! Depscope CLI - dependency manifest scanner
//!
//! Thin driver over the engine: discovers project config, runs a scan, and
//! writes the manifest as JSON, YAML, or a summary table.

// CLI tools legitimately use print macros for user output
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use depscope_engine::{
    parse_from_string, Confidence, Manifest, OutputFormat, ScanOutcome, Scanner,
    DEFAULT_MAX_PARSE_BYTES,
};

/// Depscope - inventory the external surface of a codebase
#[derive(Parser)]
#[command(
    name = "depscope",
    version,
    about = "Scan a codebase into a dependency manifest",
    long_about = "Depscope walks a source tree and produces a validated manifest of its\nexternal surface: packages, HTTP endpoints, vendor SDKs, infrastructure\nconnections, and webhooks."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory and emit its dependency manifest
    Scan {
        /// Path to the scan root (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format (overrides config)
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        /// Output file (default: stdout); must stay within the working directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Restrict to these language tags (repeatable)
        #[arg(short, long)]
        language: Vec<String>,

        /// Extra ignore patterns, gitignore syntax (repeatable)
        #[arg(short, long)]
        ignore: Vec<String>,

        /// Drop entries below this confidence
        #[arg(long, value_enum)]
        min_confidence: Option<ConfidenceArg>,

        /// Per-file size cap in MiB
        #[arg(long)]
        max_file_size_mb: Option<f64>,

        /// Worker pool size (default: derived from available parallelism)
        #[arg(long)]
        threads: Option<usize>,

        /// Use the process environment when resolving URL templates
        #[arg(long)]
        include_env: bool,
    },

    /// Validate an existing manifest document against schema v1
    Validate {
        /// Path to a manifest JSON file
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
    Table,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => Self::Json,
            Format::Yaml => Self::Yaml,
            Format::Table => Self::Table,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConfidenceArg {
    High,
    Medium,
    Low,
}

impl From<ConfidenceArg> for Confidence {
    fn from(level: ConfidenceArg) -> Self {
        match level {
            ConfidenceArg::High => Self::High,
            ConfidenceArg::Medium => Self::Medium,
            ConfidenceArg::Low => Self::Low,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    match Cli::parse().command {
        Commands::Scan {
            path,
            format,
            out,
            language,
            ignore,
            min_confidence,
            max_file_size_mb,
            threads,
            include_env,
        } => run_scan(ScanArgs {
            path,
            format,
            out,
            language,
            ignore,
            min_confidence,
            max_file_size_mb,
            threads,
            include_env,
        }),
        Commands::Validate { file } => run_validate(&file),
    }
}

struct ScanArgs {
    path: PathBuf,
    format: Option<Format>,
    out: Option<PathBuf>,
    language: Vec<String>,
    ignore: Vec<String>,
    min_confidence: Option<ConfidenceArg>,
    max_file_size_mb: Option<f64>,
    threads: Option<usize>,
    include_env: bool,
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let mut scanner = Scanner::new(&args.path)
        .with_context(|| format!("preparing scan of {}", args.path.display()))?;

    // CLI flags override the config file
    let mut cfg = scanner.config().clone();
    if let Some(format) = args.format {
        cfg.output = format.into();
    }
    if let Some(out) = &args.out {
        cfg.out_file = Some(out.clone());
    }
    if !args.language.is_empty() {
        cfg.languages = args.language.clone();
    }
    if let Some(level) = args.min_confidence {
        cfg.min_confidence = level.into();
    }
    if let Some(cap) = args.max_file_size_mb {
        cfg.max_file_size_mb = cap;
    }
    cfg.validate()?;

    scanner = Scanner::with_config(&args.path, cfg.clone())
        .include_process_env(args.include_env)
        .extra_ignore(args.ignore.clone());
    if let Some(threads) = args.threads {
        scanner = scanner.worker_threads(threads);
    }

    let outcome = scanner.scan().context("scan failed")?;

    let rendered = match cfg.output {
        OutputFormat::Json => outcome.manifest.to_json()?,
        OutputFormat::Yaml => outcome.manifest.to_yaml()?,
        OutputFormat::Table => render_table(&outcome.manifest),
    };

    match &cfg.out_file {
        Some(out_file) => {
            std::fs::write(out_file, rendered.as_bytes())
                .with_context(|| format!("writing {}", out_file.display()))?;
            eprintln!("wrote {}", out_file.display());
        },
        None => println!("{rendered}"),
    }

    print_summary(&outcome);
    Ok(())
}

fn run_validate(file: &std::path::Path) -> Result<()> {
    let text =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    match parse_from_string(&text, DEFAULT_MAX_PARSE_BYTES) {
        Ok(manifest) => {
            println!(
                "valid manifest: {} entries, scanned {}",
                manifest.total_entries(),
                manifest.metadata.scan_timestamp
            );
            Ok(())
        },
        Err(depscope_engine::SchemaError::Invalid { message, issues }) => {
            eprintln!("{message}");
            for issue in &issues {
                eprintln!("  {} [{}]: {}", issue.path, issue.keyword, issue.message);
            }
            bail!("{} validation issue(s)", issues.len());
        },
        Err(err) => Err(err.into()),
    }
}

fn render_table(manifest: &Manifest) -> String {
    let mut out = String::new();
    let mut section = |title: &str, rows: Vec<(String, String)>| {
        if rows.is_empty() {
            return;
        }
        out.push_str(&format!("{title}\n"));
        let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in rows {
            out.push_str(&format!("  {key:<width$}  {value}\n"));
        }
        out.push('\n');
    };

    section(
        "PACKAGES",
        manifest
            .packages
            .iter()
            .map(|p| {
                (
                    format!("{}:{}", p.ecosystem, p.name),
                    format!(
                        "{}{}",
                        p.current_version,
                        p.version_constraint
                            .as_deref()
                            .map(|c| format!(" ({c})"))
                            .unwrap_or_default()
                    ),
                )
            })
            .collect(),
    );
    section(
        "APIS",
        manifest
            .apis
            .iter()
            .map(|a| {
                (
                    a.method.clone().unwrap_or_else(|| "ANY".to_owned()),
                    format!("{} ({}x)", a.url, a.usage_count),
                )
            })
            .collect(),
    );
    section(
        "SDKS",
        manifest
            .sdks
            .iter()
            .map(|s| {
                (
                    format!("{}/{}", s.provider, s.sdk_package),
                    s.services_used.join(", "),
                )
            })
            .collect(),
    );
    section(
        "INFRASTRUCTURE",
        manifest
            .infrastructure
            .iter()
            .map(|i| (i.kind.clone(), i.connection_ref.clone()))
            .collect(),
    );
    section(
        "WEBHOOKS",
        manifest
            .webhooks
            .iter()
            .map(|w| (w.direction.name().to_owned(), w.target_url.clone()))
            .collect(),
    );

    out.push_str(&format!(
        "total: {} external dependencies\n",
        manifest.metadata.total_dependencies_found
    ));
    out
}

fn print_summary(outcome: &ScanOutcome) {
    eprintln!(
        "scanned {} files ({} skipped) in {}ms: {} entries, {} errors",
        outcome.files_scanned,
        outcome.files_skipped,
        outcome.duration_ms,
        outcome.manifest.total_entries(),
        outcome.errors.len()
    );
    for error in &outcome.errors {
        log::warn!("{}: {}", error.file_path, error.error_message);
    }
}
