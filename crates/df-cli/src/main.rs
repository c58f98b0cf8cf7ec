//! dflow CLI

mod report;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use df_inference::{Centrality, ModelVariant, ScanConfig, ScanDriver, run_ensemble};
use df_viz::{EnsembleArtifact, EvolutionArtifact};
use std::path::PathBuf;

use report::{ConsoleReporter, write_ensemble_table};

#[derive(Parser)]
#[command(name = "df-cli")]
#[command(about = "dflow - directed-flow (v1) toy Monte-Carlo")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a sample-size scan
    Scan {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not print step summaries and evolution tables to stderr.
        #[arg(short, long)]
        quiet: bool,
    },

    /// Repeat a scan with consecutive seeds and summarize per step
    Ensemble {
        #[command(flatten)]
        config: ConfigArgs,

        /// Number of runs (seeds `seed`, `seed + 1`, ...)
        #[arg(long, default_value = "100")]
        runs: usize,

        /// Threads across runs (0 = auto).
        #[arg(long = "run-threads", default_value = "0")]
        run_threads: usize,

        /// Include every run's scan points in the output.
        #[arg(long)]
        keep_runs: bool,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration (pretty JSON)
    Config {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output file. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    Centrality,
    Flat,
}

impl From<VariantArg> for ModelVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Centrality => ModelVariant::Centrality,
            VariantArg::Flat => ModelVariant::Flat,
        }
    }
}

/// Configuration file plus per-field overrides.
#[derive(Args)]
struct ConfigArgs {
    /// Scan configuration (JSON or YAML). Defaults apply to missing fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Centrality class (0 = 10-30%, 1 = 30-50%, 2 = 60-80%)
    #[arg(long)]
    centrality: Option<u8>,

    /// Coefficient set
    #[arg(long, value_enum)]
    variant: Option<VariantArg>,

    /// Injected v1 magnitude
    #[arg(long, allow_hyphen_values = true)]
    v1: Option<f64>,

    /// Number of steps
    #[arg(long)]
    steps: Option<usize>,

    /// Particles per step increment
    #[arg(long)]
    multiplier: Option<u64>,

    /// Number of eta bins
    #[arg(long)]
    eta_bins: Option<usize>,

    /// Angular smearing width in radians (overrides the coefficient table)
    #[arg(long)]
    smearing_sigma: Option<f64>,

    /// Fit `c + v1 * eta` instead of `v1 * eta` (`--fit-intercept false` turns it off)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    fit_intercept: Option<bool>,

    /// Progress interval in particles (0 = off)
    #[arg(long)]
    cycle_report: Option<u64>,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Threads (0 = auto). Results do not depend on it.
    #[arg(long)]
    threads: Option<usize>,

    /// Particles per RNG chunk
    #[arg(long)]
    chunk_size: Option<usize>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<ScanConfig> {
        let mut cfg = match &self.config {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading scan configuration");
                ScanConfig::from_path(path)?
            }
            None => ScanConfig::default(),
        };
        if let Some(c) = self.centrality {
            cfg.centrality = Centrality::try_from(c)?;
        }
        if let Some(v) = self.variant {
            cfg.variant = v.into();
        }
        if let Some(v) = self.v1 {
            cfg.v1 = v;
        }
        if let Some(v) = self.steps {
            cfg.steps = v;
        }
        if let Some(v) = self.multiplier {
            cfg.multiplier = v;
        }
        if let Some(v) = self.eta_bins {
            cfg.eta_bins = v;
        }
        if let Some(v) = self.smearing_sigma {
            cfg.smearing_sigma = Some(v);
        }
        if let Some(v) = self.fit_intercept {
            cfg.fit_intercept = v;
        }
        if let Some(v) = self.cycle_report {
            cfg.cycle_report = v;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        if let Some(v) = self.threads {
            cfg.threads = v;
        }
        if let Some(v) = self.chunk_size {
            cfg.chunk_size = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Scan { config, output, quiet } => cmd_scan(&config, output.as_ref(), quiet),
        Commands::Ensemble { config, runs, run_threads, keep_runs, output } => {
            cmd_ensemble(&config, runs, run_threads, keep_runs, output.as_ref())
        }
        Commands::Config { config, output } => {
            let cfg = config.resolve()?;
            write_json(output.as_ref(), serde_json::to_value(&cfg)?)
        }
        Commands::Version => {
            println!("df-cli {}", df_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_scan(args: &ConfigArgs, output: Option<&PathBuf>, quiet: bool) -> Result<()> {
    let cfg = args.resolve()?;
    let driver = ScanDriver::new(cfg.clone())?;

    if !quiet {
        eprintln!("\nStarting Toy Monte-Carlo for v1={}\n", cfg.v1);
    }
    let result = if quiet {
        driver.run(&mut df_inference::NullReporter)?
    } else {
        driver.run(&mut ConsoleReporter::new(std::io::stderr()))?
    };
    tracing::info!(
        steps = result.points.len(),
        failed = result.n_failed(),
        wall_s = result.wall_s,
        "scan complete"
    );

    let steps = serde_json::to_value(&result.steps)?;
    let wall_s = result.wall_s;
    let output_json = serde_json::json!({
        "config": cfg,
        "resolution_factor": cfg.resolution_factor(),
        "evolution": EvolutionArtifact::from(result),
        "steps": steps,
        "wall_s": wall_s,
    });
    write_json(output, output_json)
}

fn cmd_ensemble(
    args: &ConfigArgs,
    runs: usize,
    run_threads: usize,
    keep_runs: bool,
    output: Option<&PathBuf>,
) -> Result<()> {
    let cfg = args.resolve()?;
    tracing::info!(runs, steps = cfg.steps, multiplier = cfg.multiplier, "starting ensemble");

    let summary = run_ensemble(&cfg, runs, run_threads)?;
    tracing::info!(wall_s = summary.wall_s, "ensemble complete");
    write_ensemble_table(&mut std::io::stderr(), &summary)?;

    let steps = serde_json::to_value(&summary.steps)?;
    let run_points = if keep_runs { Some(serde_json::to_value(&summary.runs)?) } else { None };
    let wall_s = summary.wall_s;
    let mut output_json = serde_json::json!({
        "config": cfg,
        "steps": steps,
        "bands": EnsembleArtifact::from(summary),
        "wall_s": wall_s,
    });
    if let Some(r) = run_points {
        output_json["runs"] = r;
    }
    write_json(output, output_json)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
