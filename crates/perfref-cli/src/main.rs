//! `perfref`: evaluate benchmark runs against performance references
//!
//! Reads reference catalogs (TOML, YAML or JSON) and run records, prints a
//! verdict and exits with its code so batch schedulers can act on it.
//!
//! # Usage
//!
//! ```bash
//! # One run, human-readable summary
//! perfref check --references refs/stream.toml --run out/stream-run.json
//!
//! # Many runs in parallel; exit code is the worst of them
//! perfref batch --references refs/gpu_burn.yaml out/*.json
//!
//! # Which bound applies here?
//! perfref resolve --references refs/stream.toml --system alvis \
//!     --partition 4xA100_MEM512 --variant intel --metric triad
//!
//! # Catalog tooling
//! perfref validate --references refs/ior.json
//! perfref builtin gpu_burn --format yaml > refs/gpu_burn.yaml
//! perfref schema > refs/catalog.schema.json
//! ```
//!
//! Exit codes: 0 PASS, 1 FAIL, 2 INVALID, 3 configuration error.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use perfref::{
    catalog_schema, load_catalog, sites, CatalogFormat, ExecutionContext, ReferenceCatalog,
    ReferenceResolver, ResolverConfig, RunRecord, RunSamples, RunStatus, RunVerdict, UnitPolicy,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Exit code for anything that prevents a verdict: bad catalog, bad run
/// record, unresolved reference, unknown variant.
const EXIT_CONFIG_ERROR: i32 = 3;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Reference catalog file (overrides PERFREF_REFERENCES)
    #[arg(long, global = true)]
    references: Option<PathBuf>,

    /// Unit mismatch handling: ignore, warn or reject (overrides PERFREF_UNIT_POLICY)
    #[arg(long, global = true)]
    unit_policy: Option<UnitPolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one run record
    Check {
        /// Run record JSON: `{ "context": {...}, "samples": [...] }`
        #[arg(long)]
        run: PathBuf,

        /// Reference variant (overrides the record's context)
        #[arg(long)]
        variant: Option<String>,

        /// Print the verdict as JSON instead of a summary
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Evaluate many run records concurrently
    Batch {
        /// Run record files
        #[arg(required = true)]
        runs: Vec<PathBuf>,

        /// Reference variant applied to every run
        #[arg(long)]
        variant: Option<String>,
    },

    /// Show the bound that applies to a metric and where it came from
    Resolve {
        #[arg(long)]
        system: String,

        #[arg(long)]
        partition: String,

        /// Hardware class (derived from the partition name if omitted)
        #[arg(long)]
        class: Option<String>,

        #[arg(long)]
        variant: Option<String>,

        #[arg(long)]
        metric: String,
    },

    /// Load and validate a catalog file
    Validate,

    /// Print a built-in site catalog
    Builtin {
        /// One of: gpu_burn, stream, hpl, ior
        name: String,

        /// Output format: toml, yaml or json
        #[arg(long, default_value = "toml")]
        format: CatalogFormat,
    },

    /// Print the catalog file JSON Schema
    Schema,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            EXIT_CONFIG_ERROR
        }
    };
    std::process::exit(code);
}

/// Execute a command and return the process exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = ResolverConfig::default();
    if let Some(policy) = args.unit_policy {
        config = config.with_unit_policy(policy);
    }
    if let Some(path) = args.references {
        config.references_path = Some(path);
    }

    match args.command {
        Command::Check { run, variant, json } => {
            let catalog = open_catalog(&config)?;
            let resolver = ReferenceResolver::new(config);
            let verdict = check_run(&resolver, &catalog, &run, variant.as_deref())?;
            verdict.log();
            if json {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else {
                println!("{}", verdict.summary());
            }
            Ok(verdict.exit_code())
        }
        Command::Batch { runs, variant } => {
            let catalog = Arc::new(open_catalog(&config)?);
            let resolver = Arc::new(ReferenceResolver::new(config));
            let outcomes = run_batch(resolver, catalog, runs, variant).await?;
            let mut worst = 0;
            for (path, outcome) in &outcomes {
                let code = match outcome {
                    Ok(verdict) => {
                        println!(
                            "{}: {} ({} fail, {} results)",
                            path.display(),
                            verdict.overall,
                            verdict.failures.len(),
                            verdict.results.len()
                        );
                        verdict.exit_code()
                    }
                    Err(e) => {
                        println!("{}: ERROR {:#}", path.display(), e);
                        EXIT_CONFIG_ERROR
                    }
                };
                worst = worst.max(code);
            }
            info!(runs = outcomes.len(), worst, "Batch complete");
            Ok(worst)
        }
        Command::Resolve {
            system,
            partition,
            class,
            variant,
            metric,
        } => {
            let catalog = open_catalog(&config)?;
            let mut context = ExecutionContext::new(system, partition);
            if let Some(class) = class {
                context = context.with_hardware_class(class);
            }
            if let Some(variant) = variant {
                context = context.with_variant(variant);
            }
            let table = catalog.select(context.variant.as_deref())?;
            let resolved = ReferenceResolver::new(config).resolve_in(&context, table, &metric)?;
            println!("{} via {}: {}", metric, resolved.scope, resolved.bound);
            if !resolved.bound.is_informational() {
                let (low, high) = resolved.bound.window();
                println!("accepts [{}, {}]", low, high);
            }
            Ok(0)
        }
        Command::Validate => {
            let catalog = open_catalog(&config)?;
            for (name, table) in catalog.iter() {
                let marker = if catalog.default_variant() == Some(name) {
                    " (default)"
                } else {
                    ""
                };
                println!(
                    "{}{}: {} scopes, {} bounds",
                    name,
                    marker,
                    table.scopes().count(),
                    table.len()
                );
            }
            Ok(0)
        }
        Command::Builtin { name, format } => {
            let catalog = sites::builtin(&name).ok_or_else(|| {
                anyhow!(
                    "unknown built-in catalog '{}' (available: {})",
                    name,
                    sites::BUILTIN_NAMES.join(", ")
                )
            })??;
            println!("{}", render_catalog(&catalog, format)?);
            Ok(0)
        }
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&catalog_schema())?);
            Ok(0)
        }
    }
}

fn open_catalog(config: &ResolverConfig) -> Result<ReferenceCatalog> {
    let Some(path) = &config.references_path else {
        bail!("no reference catalog given (use --references or set PERFREF_REFERENCES)");
    };
    load_catalog(path).with_context(|| format!("Failed to load catalog {}", path.display()))
}

fn read_run_record(path: &Path) -> Result<RunRecord> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run record {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse run record {}", path.display()))
}

/// Read one run record and evaluate it; per-node records use the per-node path.
fn check_run(
    resolver: &ReferenceResolver,
    catalog: &ReferenceCatalog,
    path: &Path,
    variant: Option<&str>,
) -> Result<RunVerdict> {
    let record = read_run_record(path)?;
    let mut context = record.context.clone();
    if let Some(variant) = variant {
        context = context.with_variant(variant);
    }

    let verdict = match record.split()? {
        RunSamples::Aggregate(samples) => {
            resolver.evaluate_context(&context, catalog, &samples)?
        }
        RunSamples::PerNode(samples_by_node) => {
            resolver.evaluate_context_multi(&context, catalog, &samples_by_node)?
        }
    };
    if verdict.overall == RunStatus::Invalid {
        warn!(run = %path.display(), "Run record has no samples");
    }
    Ok(verdict)
}

/// Evaluate every run on the blocking pool, sharing one catalog.
///
/// Results come back in input order.
async fn run_batch(
    resolver: Arc<ReferenceResolver>,
    catalog: Arc<ReferenceCatalog>,
    runs: Vec<PathBuf>,
    variant: Option<String>,
) -> Result<Vec<(PathBuf, Result<RunVerdict>)>> {
    let mut set = JoinSet::new();
    for (index, path) in runs.into_iter().enumerate() {
        let resolver = Arc::clone(&resolver);
        let catalog = Arc::clone(&catalog);
        let variant = variant.clone();
        set.spawn_blocking(move || {
            let outcome = check_run(&resolver, &catalog, &path, variant.as_deref());
            (index, path, outcome)
        });
    }

    let mut outcomes = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        let (index, path, outcome) = joined.context("Evaluation task panicked")?;
        outcomes.push((index, path, outcome));
    }
    outcomes.sort_by_key(|(index, _, _)| *index);
    Ok(outcomes
        .into_iter()
        .map(|(_, path, outcome)| (path, outcome))
        .collect())
}

fn render_catalog(catalog: &ReferenceCatalog, format: CatalogFormat) -> Result<String> {
    let file = catalog.to_file();
    Ok(match format {
        CatalogFormat::Toml => toml::to_string_pretty(&file).context("TOML serialization failed")?,
        CatalogFormat::Yaml => serde_yaml::to_string(&file).context("YAML serialization failed")?,
        CatalogFormat::Json => serde_json::to_string_pretty(&file)?,
    })
}
