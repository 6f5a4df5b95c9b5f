use std::path::PathBuf;

use clap::Parser;

use fairlend_bench::config::{ResolvedOutputs, ScenarioConfig};
use fairlend_core::AppInfo;
use fairlend_bench::logging::init_logging;
use fairlend_bench::report;
use fairlend_bench::scenario::ScenarioRunner;

/// Threshold-strategy comparison harness for two-group lending scenarios.
#[derive(Debug, Parser)]
#[command(
    name = "fairlend-bench",
    author,
    version,
    about = "Compares profit-maximizing thresholds under fairness constraints"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/scenario.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the search step size.
    #[arg(long, value_name = "STEP")]
    step_size: Option<f64>,

    /// Override the starting threshold applied before optimization.
    #[arg(long, value_name = "THRESHOLD")]
    initial_threshold: Option<f64>,

    /// Exit after validating the configuration (no scenario is run).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = ScenarioConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(step_size) = cli.step_size {
        config.search.step_size = step_size;
    }

    if let Some(initial_threshold) = cli.initial_threshold {
        config.search.initial_threshold = initial_threshold;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();

    println!(
        "{} {}: scenario '{run_id}' with groups '{}' and '{}', step {}",
        AppInfo::name(),
        AppInfo::version(),
        config.groups[0].name,
        config.groups[1].name,
        config.search.step_size
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: scenario execution skipped.");
        return Ok(());
    }

    let runner = ScenarioRunner::new(config);
    let scenario_report = runner.run()?;

    for record in &scenario_report.records {
        match (record.total_profit, record.groups.as_slice()) {
            (Some(total), [g0, g1]) => println!(
                "{}: thresholds ({:.1}, {:.1}), total profit {:.0}",
                record.strategy, g0.threshold, g1.threshold, total
            ),
            _ => println!("{}: no feasible threshold pair", record.strategy),
        }
    }

    let rows = report::write_jsonl(&outputs.jsonl, &scenario_report.records)?;
    report::write_summary(&outputs.summary_md, &scenario_report)?;
    println!(
        "Wrote {rows} strategy rows to {} and summary to {}",
        outputs.jsonl.display(),
        outputs.summary_md.display()
    );

    match report::render_profit_curves(&outputs.plots_dir, &scenario_report.curves) {
        Ok(path) => println!("Profit curves: {}", path.display()),
        Err(err) => eprintln!("WARN: {err}"),
    }

    Ok(())
}
