//! Solver policy and the MIP engines behind it.
//!
//! An engine gets the whole [`IlpModel`] on a dedicated solver thread. That
//! thread builds the engine's own model, solves it and reads the values
//! back, so every mutating call on the engine happens on one thread.

use std::{
    collections::BTreeSet,
    fmt,
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam::channel::{self, RecvTimeoutError};
use good_lp::{
    variable, variables, Expression, ProblemVariables, ResolutionError, Solution as LpSolution,
    SolutionStatus, SolverModel, Variable, WithMipGap, WithTimeLimit,
};

use crate::{
    error::{ConfigError, SolverFailure},
    model::IlpModel,
    rows::ConstraintRow,
};

/// Time limit of exact runs, the same 1000 s budget the legacy tool used.
pub const EXACT_TIME_LIMIT: Duration = Duration::from_secs(1000);
pub const APPROXIMATE_TIME_LIMIT: Duration = Duration::from_secs(60);
pub const APPROXIMATE_GAP: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Zero gap: the answer is a minimum dominating set.
    Exact,
    /// Positive gap and bounded time: the answer is a dominating set within
    /// the gap of the optimum.
    Approximate,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Exact => "exact",
            Mode::Approximate => "approximate",
        })
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Mode::Exact),
            "approximate" | "approx" => Ok(Mode::Approximate),
            _ => Err(ConfigError::Unknown {
                kind: "mode",
                value: s.to_owned(),
            }),
        }
    }
}

/// Primal heuristics an engine may run alongside branch-and-bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Heuristic {
    Rounding,
    FeasibilityPump,
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Heuristic::Rounding => "rounding",
            Heuristic::FeasibilityPump => "feasibility-pump",
        })
    }
}

impl FromStr for Heuristic {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rounding" => Ok(Heuristic::Rounding),
            "feasibility-pump" | "fpump" => Ok(Heuristic::FeasibilityPump),
            _ => Err(ConfigError::Unknown {
                kind: "heuristic",
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub mode: Mode,
    pub presolve: bool,
    /// Relative optimality gap, `0.01` is 1%.
    pub gap: f64,
    pub time_limit: Duration,
    pub heuristics: BTreeSet<Heuristic>,
    /// Row worker threads, one per core when `None`.
    pub threads: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig::exact()
    }
}

impl SolverConfig {
    pub fn exact() -> Self {
        SolverConfig {
            mode: Mode::Exact,
            presolve: true,
            gap: 0.0,
            time_limit: EXACT_TIME_LIMIT,
            heuristics: BTreeSet::new(),
            threads: None,
        }
    }

    pub fn approximate() -> Self {
        SolverConfig {
            mode: Mode::Approximate,
            presolve: true,
            gap: APPROXIMATE_GAP,
            time_limit: APPROXIMATE_TIME_LIMIT,
            heuristics: [Heuristic::Rounding, Heuristic::FeasibilityPump].into(),
            threads: None,
        }
    }

    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Exact => SolverConfig::exact(),
            Mode::Approximate => SolverConfig::approximate(),
        }
    }

    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_presolve(mut self, presolve: bool) -> Self {
        self.presolve = presolve;
        self
    }

    pub fn with_heuristics(mut self, heuristics: impl IntoIterator<Item = Heuristic>) -> Self {
        self.heuristics = heuristics.into_iter().collect();
        self
    }

    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gap.is_finite() || self.gap < 0.0 {
            return Err(ConfigError::InvalidGap(self.gap));
        }
        if self.mode == Mode::Exact && self.gap > 0.0 {
            return Err(ConfigError::ExactWithGap(self.gap));
        }
        if self.time_limit.is_zero() {
            return Err(ConfigError::ZeroTimeLimit);
        }
        if self.threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }
        Ok(())
    }
}

/// Which knobs of [`SolverConfig`] an engine honours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub gap: bool,
    pub time_limit: bool,
    pub heuristics: bool,
    pub presolve: bool,
}

/// Raw result of one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutcome {
    /// One value per column, in column order.
    pub values: Vec<f64>,
    /// Upper bound on the relative distance to the optimum.
    pub gap_bound: f64,
}

pub trait MipEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Build the engine model from `model`, solve it and read back one value
    /// per column. Called once per model, on the solver thread only.
    fn solve(&self, model: &IlpModel, config: &SolverConfig)
        -> Result<EngineOutcome, SolverFailure>;
}

/// Pure Rust branch-and-bound through `good_lp`, with its own gap and time
/// limit. Presolve and heuristics are not configurable.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLp;

impl MipEngine for MicroLp {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            gap: true,
            time_limit: true,
            ..Capabilities::default()
        }
    }

    fn solve(
        &self,
        model: &IlpModel,
        config: &SolverConfig,
    ) -> Result<EngineOutcome, SolverFailure> {
        let (vars, columns, objective) = lp_columns(model);
        let mut problem = vars
            .minimise(objective)
            .using(good_lp::microlp)
            .with_time_limit(config.time_limit.as_secs_f64())
            .with_mip_gap(config.gap as f32)
            .map_err(|err| SolverFailure::Internal(err.to_string()))?;
        for row in model.rows() {
            problem.add_constraint(lp_row(row, &columns).geq(row.lower_bound()));
        }
        let solution = problem
            .solve()
            .map_err(|err| resolution_failure(err, config))?;
        Ok(EngineOutcome {
            values: columns.iter().map(|&c| solution.value(c)).collect(),
            gap_bound: status_gap(solution.status(), config),
        })
    }
}

/// HiGHS through `good_lp`, honouring every policy knob.
#[cfg(feature = "highs")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Highs;

#[cfg(feature = "highs")]
impl MipEngine for Highs {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            gap: true,
            time_limit: true,
            heuristics: true,
            presolve: true,
        }
    }

    fn solve(
        &self,
        model: &IlpModel,
        config: &SolverConfig,
    ) -> Result<EngineOutcome, SolverFailure> {
        let (vars, columns, objective) = lp_columns(model);
        let effort = 0.05 * config.heuristics.len() as f64;
        let mut problem = vars.minimise(objective).using(good_lp::highs);
        problem.set_verbose(false);
        let mut problem = problem
            .set_option("presolve", if config.presolve { "on" } else { "off" })
            .set_option("mip_heuristic_effort", effort)
            .with_time_limit(config.time_limit.as_secs_f64())
            .with_mip_gap(config.gap as f32)
            .map_err(|err| SolverFailure::Internal(err.to_string()))?;
        if let Some(threads) = config.threads {
            problem = problem.set_option("threads", threads as i32);
        }
        for row in model.rows() {
            problem.add_constraint(lp_row(row, &columns).geq(row.lower_bound()));
        }
        let solution = problem
            .solve()
            .map_err(|err| resolution_failure(err, config))?;
        Ok(EngineOutcome {
            values: columns.iter().map(|&c| solution.value(c)).collect(),
            gap_bound: status_gap(solution.status(), config),
        })
    }
}

fn lp_columns(model: &IlpModel) -> (ProblemVariables, Vec<Variable>, Expression) {
    let mut vars = variables!();
    let columns = vars.add_vector(variable().binary(), model.column_count());
    let mut objective: Expression = 0.into();
    for (&column, &cost) in columns.iter().zip(model.objective()) {
        objective.add_mul(cost, column);
    }
    (vars, columns, objective)
}

fn lp_row(row: &ConstraintRow, columns: &[Variable]) -> Expression {
    let mut expression: Expression = 0.into();
    for &(column, coefficient) in row.entries() {
        expression.add_mul(coefficient, columns[column as usize]);
    }
    expression
}

/// Gap bound implied by the status an engine stopped with. A run cut short
/// by its time limit has an incumbent but no usable bound.
fn status_gap(status: SolutionStatus, config: &SolverConfig) -> f64 {
    match status {
        SolutionStatus::Optimal => 0.0,
        SolutionStatus::GapLimit => config.gap,
        SolutionStatus::TimeLimit => f64::INFINITY,
    }
}

fn resolution_failure(err: ResolutionError, config: &SolverConfig) -> SolverFailure {
    match err {
        ResolutionError::Infeasible => SolverFailure::Infeasible,
        ResolutionError::Unbounded => SolverFailure::Unbounded,
        // microlp hit its time limit before it found any incumbent
        ResolutionError::Other(message) if message.starts_with("Time limit") => {
            SolverFailure::TimeLimit(config.time_limit.as_secs_f64())
        }
        other => SolverFailure::Internal(other.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    MicroLp,
    Highs,
}

impl EngineKind {
    pub fn engine(self) -> Result<Arc<dyn MipEngine>, ConfigError> {
        match self {
            EngineKind::MicroLp => Ok(Arc::new(MicroLp)),
            #[cfg(feature = "highs")]
            EngineKind::Highs => Ok(Arc::new(Highs)),
            #[cfg(not(feature = "highs"))]
            EngineKind::Highs => Err(ConfigError::EngineUnavailable("highs")),
        }
    }
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "microlp" => Ok(EngineKind::MicroLp),
            "highs" => Ok(EngineKind::Highs),
            _ => Err(ConfigError::Unknown {
                kind: "engine",
                value: s.to_owned(),
            }),
        }
    }
}

/// How a successful solve was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    pub mode: Mode,
    pub engine: &'static str,
    /// Upper bound on the relative gap; infinite when the engine stopped on
    /// its time limit and the bound is unknown.
    pub gap_bound: f64,
    pub elapsed: Duration,
}

impl SolveReport {
    pub fn is_proven_optimal(&self) -> bool {
        self.gap_bound == 0.0
    }
}

impl fmt::Display for SolveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode={} engine={} ", self.mode, self.engine)?;
        if self.gap_bound.is_finite() {
            write!(f, "gap<={}%", self.gap_bound * 100.0)?;
        } else {
            f.write_str("gap=unknown")?;
        }
        write!(f, " elapsed={}ms", self.elapsed.as_millis())
    }
}

/// A finished solve: the model handed back by the solver thread and its values.
#[derive(Debug)]
pub struct Solved {
    pub model: IlpModel,
    pub values: Vec<f64>,
    pub report: SolveReport,
}

/// Submit `model` to `engine` on its own thread and wait for the result.
///
/// Engines stop on their own time limit and say so through the gap bound of
/// their outcome. The wait here is only a backstop for engines that overrun
/// it: after the time limit plus a grace period the solve is abandoned. There
/// is no way to cancel a running solve, the thread is left to finish on its own.
pub fn solve(
    model: IlpModel,
    config: &SolverConfig,
    engine: Arc<dyn MipEngine>,
) -> Result<Solved, SolverFailure> {
    config.validate()?;
    let name = engine.name();
    let capabilities = engine.capabilities();
    warn_unsupported(name, capabilities, config);

    let started = Instant::now();
    if model.column_count() == 0 {
        log::debug!("empty model, nothing to submit");
        return Ok(Solved {
            model,
            values: Vec::new(),
            report: SolveReport {
                mode: config.mode,
                engine: name,
                gap_bound: 0.0,
                elapsed: started.elapsed(),
            },
        });
    }

    let (sender, receiver) = channel::bounded(1);
    let thread_config = config.clone();
    std::thread::Builder::new()
        .name("mip-solver".into())
        .spawn(move || {
            let outcome = engine.solve(&model, &thread_config);
            // the receiver is gone if the deadline already passed
            let _ = sender.send((model, outcome));
        })
        .map_err(|err| SolverFailure::Internal(format!("unable to start solver thread: {err}")))?;

    let deadline = config.time_limit.saturating_add(grace(config.time_limit));
    let (model, outcome) = match receiver.recv_timeout(deadline) {
        Ok(message) => message,
        Err(RecvTimeoutError::Timeout) => {
            log::warn!("{name} did not return within {deadline:?}, abandoning the solve");
            return Err(SolverFailure::TimeLimit(config.time_limit.as_secs_f64()));
        }
        Err(RecvTimeoutError::Disconnected) => {
            return Err(SolverFailure::Internal(
                "solver thread exited without a result".into(),
            ));
        }
    };
    let outcome = outcome?;
    let elapsed = started.elapsed();

    let gap_bound = outcome.gap_bound;
    if gap_bound.is_infinite() {
        log::warn!("{name} stopped at the time limit, returning its incumbent");
    }
    if config.mode == Mode::Exact && gap_bound > 0.0 {
        log::warn!("exact run without an optimality proof, reporting gap {gap_bound}");
    }

    Ok(Solved {
        model,
        values: outcome.values,
        report: SolveReport {
            mode: config.mode,
            engine: name,
            gap_bound,
            elapsed,
        },
    })
}

fn grace(time_limit: Duration) -> Duration {
    (time_limit / 20).max(Duration::from_secs(1))
}

fn warn_unsupported(name: &str, capabilities: Capabilities, config: &SolverConfig) {
    if config.gap > 0.0 && !capabilities.gap {
        log::warn!("{name} ignores the optimality gap, it always proves optimality");
    }
    if !config.heuristics.is_empty() && !capabilities.heuristics {
        log::warn!("{name} has no configurable heuristics, ignoring {:?}", config.heuristics);
    }
    if !config.presolve && !capabilities.presolve {
        log::warn!("{name} cannot switch presolve off");
    }
    if !capabilities.time_limit {
        log::debug!("{name} has no time limit of its own, waiting at most {:?}", config.time_limit);
    }
}
