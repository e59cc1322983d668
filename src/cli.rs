//! Command-line arguments.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate a baseline and flexible scenarios read from CSV files.
    #[clap(name = "evaluate")]
    Evaluate(Box<EvaluateArgs>),

    /// Evaluate a seeded synthetic portfolio.
    #[clap(name = "demo")]
    Demo(Box<DemoArgs>),
}

#[derive(ClapArgs)]
pub struct EvaluateArgs {
    /// Baseline scenario CSV.
    #[clap(long)]
    pub baseline: PathBuf,

    /// Name reported for the baseline scenario.
    #[clap(long = "baseline-name", default_value = "baseline")]
    pub baseline_name: String,

    /// Flexible scenario as `<name>=<csv>`; repeatable.
    #[clap(long = "flexible")]
    pub flexible: Vec<NamedPath>,

    #[clap(flatten)]
    pub config: ConfigArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(ClapArgs)]
pub struct DemoArgs {
    /// Number of synthetic buildings.
    #[clap(long)]
    pub buildings: Option<usize>,

    /// Number of synthetic days.
    #[clap(long)]
    pub days: Option<usize>,

    /// Random seed.
    #[clap(long)]
    pub seed: Option<u64>,

    #[clap(flatten)]
    pub config: ConfigArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(ClapArgs)]
pub struct ConfigArgs {
    /// TOML configuration file.
    #[clap(long, env = "PORTFOLIO_EVAL_CONFIG", conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Built-in preset (`heating` or `cooling`).
    #[clap(long)]
    pub preset: Option<String>,
}

#[derive(ClapArgs)]
pub struct OutputArgs {
    /// Write the full report as JSON.
    #[clap(long = "report-out")]
    pub report_out: Option<PathBuf>,

    /// Write the per-day metric table as CSV.
    #[clap(long = "daily-out")]
    pub daily_out: Option<PathBuf>,

    /// Write the monthly summaries as CSV.
    #[clap(long = "summary-out")]
    pub summary_out: Option<PathBuf>,

    /// Write the aligned portfolio series next to the reference as CSV.
    #[clap(long = "portfolio-out")]
    pub portfolio_out: Option<PathBuf>,

    /// Serve the report over HTTP after evaluation.
    #[cfg(feature = "api")]
    #[clap(long)]
    pub serve: bool,

    /// API server port.
    #[cfg(feature = "api")]
    #[clap(long, default_value = "3000", env = "PORTFOLIO_EVAL_PORT")]
    pub port: u16,
}

/// `<name>=<path>` pair naming a scenario file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPath {
    pub name: String,
    pub path: PathBuf,
}

impl FromStr for NamedPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, path) = s
            .split_once('=')
            .ok_or_else(|| format!("expected <name>=<path>, got `{s}`"))?;
        let name = name.trim();
        if name.is_empty() || path.is_empty() {
            return Err(format!("expected <name>=<path>, got `{s}`"));
        }
        Ok(Self {
            name: name.to_string(),
            path: PathBuf::from(path),
        })
    }
}
