use anyhow::{Context, Result};
use clap::Parser;
use std::{path::PathBuf, process::ExitCode, time::Duration};

use dominating_set::{EngineKind, Heuristic, Mode, OutputFormat, Pipeline, SolverConfig};

/// Minimum dominating set of an undirected graph, solved as a binary ILP.
#[derive(Parser, Debug)]
#[command(name = "dominating-set", version)]
struct Cli {
    /// Graph file: a line 'n m' followed by m edges 'u v'
    input: PathBuf,

    /// Where to write the solution
    output: PathBuf,

    /// exact (zero gap) or approximate (bounded gap and time)
    #[arg(long, env = "DOMSET_MODE", default_value = "exact")]
    mode: Mode,

    /// Relative optimality gap for approximate runs, e.g. 0.01
    #[arg(long)]
    gap: Option<f64>,

    /// Solver time limit in seconds
    #[arg(long, env = "DOMSET_TIME_LIMIT")]
    time_limit: Option<f64>,

    /// Switch solver presolve off
    #[arg(long)]
    no_presolve: bool,

    /// Comma separated heuristics: rounding, feasibility-pump
    #[arg(long, value_delimiter = ',')]
    heuristics: Option<Vec<Heuristic>>,

    /// Row worker threads (defaults to one per core)
    #[arg(long, env = "DOMSET_THREADS")]
    threads: Option<usize>,

    /// Output encoding: lines, compact or vertices
    #[arg(long, default_value = "lines")]
    format: OutputFormat,

    /// MIP engine: microlp, or highs when built with the feature
    #[arg(long, default_value = "microlp")]
    engine: EngineKind,
}

impl Cli {
    fn solver_config(&self) -> Result<SolverConfig> {
        let mut config = SolverConfig::for_mode(self.mode)
            .with_presolve(!self.no_presolve)
            .with_threads(self.threads);
        if let Some(gap) = self.gap {
            config = config.with_gap(gap);
        }
        if let Some(seconds) = self.time_limit {
            let limit = Duration::try_from_secs_f64(seconds)
                .with_context(|| format!("invalid time limit {seconds}"))?;
            config = config.with_time_limit(limit);
        }
        if let Some(heuristics) = &self.heuristics {
            config = config.with_heuristics(heuristics.iter().copied());
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.solver_config()?;
    let engine = cli.engine.engine()?;
    let pipeline = Pipeline::new(config, engine)?;
    let (solution, report) = pipeline
        .run_files(&cli.input, &cli.output, cli.format)
        .with_context(|| format!("solving '{}'", cli.input.display()))?;
    log::info!("{report} size={}", solution.size());
    Ok(())
}
