//! Portfolio evaluation entry point: CLI wiring and report output.

mod cli;

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use portfolio_eval::config::Config;
use portfolio_eval::eval::engine::Evaluator;
use portfolio_eval::eval::reference::ReferenceProfileGenerator;
use portfolio_eval::eval::report::MetricsReport;
use portfolio_eval::eval::types::{ScenarioRun, StrategyLabel};
use portfolio_eval::io::export::{
    PortfolioRow, export_to, portfolio_rows, write_daily_csv, write_portfolio_csv,
    write_report_json, write_summary_csv,
};
use portfolio_eval::io::ingest::read_scenario;
use portfolio_eval::synthetic::SyntheticPortfolio;

use cli::{Args, Command, ConfigArgs, OutputArgs};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.command {
        Command::Evaluate(args) => {
            let config = load_config(&args.config)?;
            let baseline =
                read_scenario(&args.baseline, &args.baseline_name, StrategyLabel::Baseline)
                    .with_context(|| format!("reading baseline {}", args.baseline.display()))?;
            let flexible = args
                .flexible
                .iter()
                .map(|np| {
                    read_scenario(&np.path, &np.name, StrategyLabel::Flexible(np.name.clone()))
                        .with_context(|| format!("reading scenario {}", np.path.display()))
                })
                .collect::<Result<Vec<_>>>()?;
            run(&config, &baseline, &flexible, &args.output)
        }
        Command::Demo(args) => {
            let mut config = load_config(&args.config)?;
            if let Some(buildings) = args.buildings {
                config.synthetic.buildings = buildings;
            }
            if let Some(days) = args.days {
                config.synthetic.days = days;
            }
            if let Some(seed) = args.seed {
                config.synthetic.seed = seed;
            }
            validate(&config)?;

            let resolution = config.evaluation.resolution()?;
            let portfolio = SyntheticPortfolio::generate(
                &config.synthetic,
                config.evaluation.season,
                resolution,
            );
            let baseline = portfolio.baseline("baseline");
            let flexible = vec![
                portfolio.flexible("flatten", "flatten", 1.0),
                portfolio.flexible("flatten-half", "flatten", 0.5),
            ];
            info!(
                buildings = config.synthetic.buildings,
                days = config.synthetic.days,
                seed = config.synthetic.seed,
                "generated synthetic portfolio"
            );
            run(&config, &baseline, &flexible, &args.output)
        }
    }
}

/// Loads `--config`, then `--preset`, falling back to the heating preset.
fn load_config(args: &ConfigArgs) -> Result<Config> {
    let config = match (&args.config, &args.preset) {
        (Some(path), _) => Config::from_toml_file(path)?,
        (None, Some(name)) => Config::from_preset(name)?,
        (None, None) => Config::heating(),
    };
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }
    for e in &errors {
        eprintln!("{e}");
    }
    bail!("{} invalid configuration option(s)", errors.len())
}

fn run(
    config: &Config,
    baseline: &ScenarioRun,
    flexible: &[ScenarioRun],
    output: &OutputArgs,
) -> Result<()> {
    let evaluator = Evaluator::new(config.evaluation.clone())?;
    let report = evaluator.evaluate(baseline, flexible)?;
    println!("{report}");

    if let Some(path) = &output.report_out {
        write_file(path, |w| write_report_json(&report, w))?;
    }
    if let Some(path) = &output.daily_out {
        write_file(path, |w| write_daily_csv(&report, w))?;
    }
    if let Some(path) = &output.summary_out {
        write_file(path, |w| write_summary_csv(&report, w))?;
    }
    if let Some(path) = &output.portfolio_out {
        let rows = aligned_rows(&evaluator, baseline, flexible, &report)?;
        write_file(path, |w| write_portfolio_csv(&rows, w))?;
    }

    #[cfg(feature = "api")]
    if output.serve {
        serve(report, output.port)?;
    }
    Ok(())
}

/// Portfolio series of the baseline and every successfully evaluated run.
fn aligned_rows(
    evaluator: &Evaluator,
    baseline: &ScenarioRun,
    flexible: &[ScenarioRun],
    report: &MetricsReport,
) -> Result<Vec<PortfolioRow>> {
    let aligned_base = evaluator.aligner().align(baseline)?;
    let reference = ReferenceProfileGenerator::generate(&aligned_base);
    let mut rows = portfolio_rows(&aligned_base, &reference);
    for run in flexible
        .iter()
        .filter(|run| report.scenarios.iter().any(|name| name == run.name()))
    {
        let aligned = evaluator.aligner().align(run)?;
        rows.extend(portfolio_rows(&aligned, &reference));
    }
    Ok(rows)
}

fn write_file(
    path: &Path,
    write: impl FnOnce(std::io::BufWriter<std::fs::File>) -> std::io::Result<()>,
) -> Result<()> {
    export_to(path, write).with_context(|| format!("writing {}", path.display()))?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

#[cfg(feature = "api")]
fn serve(report: MetricsReport, port: u16) -> Result<()> {
    use std::net::SocketAddr;
    use std::sync::Arc;

    let state = Arc::new(portfolio_eval::api::AppState { report });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(portfolio_eval::api::serve(state, addr))
        .context("API server failed")
}
