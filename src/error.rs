use std::path::PathBuf;

/// Problems with the graph input: the file itself, its text, or the edges it names.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("unable to open input file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to read input: {0}")]
    Read(#[from] std::io::Error),

    #[error("empty input, expected a header line 'n m'")]
    MissingHeader,

    #[error("invalid header on line {line}: expected 'n m', got '{text}'")]
    MalformedHeader { line: usize, text: String },

    #[error("invalid integer '{token}' on line {line}")]
    Parse { token: String, line: usize },

    #[error("vertex count {0} does not fit into a 32-bit vertex index")]
    TooManyVertices(usize),

    #[error("not enough memory for a graph with {0} vertices")]
    TooLarge(usize),

    #[error("edge ({u}, {v}) references a vertex outside [0, {vertex_count})")]
    VertexOutOfRange { u: u32, v: u32, vertex_count: usize },

    #[error("edge ({0}, {0}) is a self-loop")]
    SelfLoop(u32),

    #[error("edge list ends with a single endpoint {vertex} on line {line}")]
    DanglingEndpoint { vertex: u32, line: usize },

    #[error("header declares {declared} edges but the input contains {found}")]
    EdgeCountMismatch { declared: usize, found: usize },
}

/// Rejected solver or pipeline configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("optimality gap must be a finite non-negative number, got {0}")]
    InvalidGap(f64),

    #[error("exact mode requires a zero optimality gap, got {0}")]
    ExactWithGap(f64),

    #[error("time limit must be positive")]
    ZeroTimeLimit,

    #[error("worker thread count must be positive")]
    ZeroThreads,

    #[error("unable to start worker pool: {0}")]
    WorkerPool(String),

    #[error("unknown {kind} '{value}'")]
    Unknown { kind: &'static str, value: String },

    #[error("engine '{0}' is not compiled into this build")]
    EngineUnavailable(&'static str),
}

/// Outcome of a solve that produced no usable assignment.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverFailure {
    #[error("solver reports the model is infeasible")]
    Infeasible,

    #[error("solver reports the model is unbounded")]
    Unbounded,

    #[error("solver exceeded the time limit of {0:.1}s without an incumbent")]
    TimeLimit(f64),

    #[error("solver error: {0}")]
    Internal(String),

    #[error("invalid solver configuration: {0}")]
    Invalid(#[from] ConfigError),
}

/// Top-level error of a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Solver(#[from] SolverFailure),

    #[error("unable to write output file '{}': {source}", path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<ConfigError> for Error {
    fn from(value: ConfigError) -> Self {
        Error::Solver(SolverFailure::Invalid(value))
    }
}
