//! mirrormap CLI - representative subgraph selection
//!
//! This is the command-line entry point for mirrormap. It drives the full
//! pipeline over a detector snapshot:
//!
//! 1. Snapshot Loading: parse detector output, normalize type identifiers
//! 2. Allocation: largest-remainder split of the instance budget
//! 3. Per-Pattern Selection: coverage-scored greedy picks, shared state
//! 4. Orphan Resolution: catalog types no pattern claims
//! 5. Supplemental Set Cover: close remaining coverage gaps
//! 6. Plan Output: JSON with trace and shortfall metadata
//!
//! Design philosophy:
//! - Fail fast on configuration, never on data (shortfalls go in metadata)
//! - Deterministic output (plans are diffable across runs)
//! - Verbose mode on stderr, plan JSON alone on stdout

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mirrormap::{config, SelectionCoordinator, SelectorConfig, Snapshot};

/// Representative subgraph selection for tenant graph replication
///
/// mirrormap reads a pattern-detection snapshot of a source resource graph
/// and selects a small, proportionally representative set of resource
/// instances that maximizes distinct-type coverage.
///
/// Examples:
///   mirrormap snapshot.json                      # Default 50-instance plan
///   mirrormap snapshot.json -t 20 -b 5.0         # Boost rare types
///   mirrormap snapshot.json --trace --stats      # Full observability
#[derive(Parser, Debug)]
#[command(name = "mirrormap")]
#[command(version)]
#[command(about, long_about = None)]
pub struct Cli {
    /// Path to the detector snapshot JSON
    ///
    /// Expected shape: type_counts, patterns (prevalence, matched_types,
    /// instances), unpatterned_instances. Matched types may use simplified
    /// aliases; they are resolved against the catalog at load time.
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Total instances to select
    ///
    /// Split proportionally across patterns by prevalence. Overrides the
    /// config file value.
    #[arg(short = 't', long)]
    pub target: Option<usize>,

    /// Rare-type boost factor (>= 1.0)
    ///
    /// At 1.0 selection blends coverage with structural similarity.
    /// Above 1.0 selection is coverage-only and under-covered types are
    /// amplified. Typical values:
    ///   1.0  - proportional, structure-aware (default)
    ///   5.0  - aggressive rare-type coverage
    #[arg(short = 'b', long)]
    pub boost: Option<f64>,

    /// Underrepresentation threshold, in (0, 1)
    ///
    /// A covered type counts as underrepresented while its coverage ratio
    /// stays below this fraction of the run's overall sampling ratio.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Supplemental budget fraction, in [0, 1)
    ///
    /// Extra instances for the cross-pattern set-cover pass, as a fraction
    /// of the target count. The default 0.10 is frequently too small when
    /// rare types concentrate in low-allocation patterns; raise it if the
    /// plan reports types missing after the fill.
    #[arg(long)]
    pub supplemental: Option<f64>,

    /// Config file path
    ///
    /// Defaults to mirrormap.toml next to the snapshot, when present.
    /// Command-line flags override config file values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the plan to a file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Include the per-iteration quality-distance trace in the output
    ///
    /// One entry per committed instance: phase, pattern, score, and the
    /// structural distance at pick time. Useful for tuning the boost
    /// factor; omitted by default to keep plans small.
    #[arg(long)]
    pub trace: bool,

    /// Show selection statistics on stderr
    ///
    ///   - Instances selected vs. target
    ///   - Distinct-type coverage vs. catalog
    ///   - Supplemental budget usage
    ///   - Shortfalls and starved patterns
    #[arg(long)]
    pub stats: bool,

    /// Verbose progress on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = run(&cli)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, output)
                .with_context(|| format!("failed to write plan to '{}'", path.display()))?;
        }
        None => println!("{}", output),
    }

    Ok(())
}

fn run(cli: &Cli) -> Result<String> {
    // Config: explicit file, else discovery next to the snapshot, else
    // defaults; CLI flags layer on top of whichever applied
    let mut selector_config = match &cli.config {
        Some(path) => config::load_file(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => {
            let snapshot_dir = cli.snapshot.parent().unwrap_or(std::path::Path::new("."));
            config::discover(snapshot_dir)?.unwrap_or_else(SelectorConfig::default)
        }
    };
    if let Some(target) = cli.target {
        selector_config.target_instance_count = target;
    }
    if let Some(boost) = cli.boost {
        selector_config.rare_boost_factor = boost;
    }
    if let Some(threshold) = cli.threshold {
        selector_config.missing_type_threshold = threshold;
    }
    if let Some(fraction) = cli.supplemental {
        selector_config.supplemental_budget_fraction = fraction;
    }

    if cli.verbose {
        eprintln!("Loading snapshot: {}", cli.snapshot.display());
    }
    let snapshot = Snapshot::load(&cli.snapshot)
        .with_context(|| format!("failed to load snapshot '{}'", cli.snapshot.display()))?;
    if cli.verbose {
        eprintln!(
            "Loaded {} patterns, {} instances, {} types",
            snapshot.patterns.len(),
            snapshot.store.len(),
            snapshot.catalog.len()
        );
        for (pattern, aliases) in &snapshot.report.unresolved_aliases {
            eprintln!(
                "Warning: pattern '{}' has unresolvable matched types: {}",
                pattern,
                aliases.join(", ")
            );
        }
    }

    let coordinator = SelectionCoordinator::new(selector_config);
    let mut plan =
        coordinator.build_plan(&snapshot.catalog, &snapshot.patterns, &snapshot.store)?;

    if cli.stats {
        let meta = &plan.metadata;
        eprintln!("Selection statistics:");
        eprintln!(
            "  instances: {} selected / {} target (+{} supplemental of {} budget)",
            meta.selected_instance_count,
            meta.target_instance_count,
            meta.supplemental_used,
            meta.supplemental_budget
        );
        eprintln!(
            "  coverage: {} / {} distinct types ({})",
            meta.distinct_types_covered, meta.catalog_type_count, meta.mode
        );
        eprintln!("  orphan types: {}", meta.orphan_type_count);
        if !meta.zero_allocation_patterns.is_empty() {
            eprintln!("  starved patterns: {}", meta.zero_allocation_patterns.join(", "));
        }
        for shortfall in &meta.shortfalls {
            eprintln!(
                "  shortfall: {} selected {} of {}",
                shortfall.pattern, shortfall.selected, shortfall.allocated
            );
        }
        if !meta.missing_after_fill.is_empty() {
            eprintln!(
                "  still missing {} types after supplemental pass",
                meta.missing_after_fill.len()
            );
        }
    }

    if !cli.trace {
        plan.trace.clear();
    }
    plan.to_json().context("failed to serialize plan")
}
