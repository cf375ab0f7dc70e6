//! Graph → rows → model → solver → solution, end to end.
//!
//! Rows are computed on the worker pool into index-addressed buffers, the
//! model is assembled on the calling thread and then moved into the solver
//! thread. Output is only written once the solution has been checked.

use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
    sync::Arc,
    time::Instant,
};

use tempfile::NamedTempFile;

use crate::{
    error::{Error, InputError, SolverFailure},
    model::IlpModel,
    parse_input,
    pool::WorkerPool,
    rows::build_rows,
    solution::{decode, OutputFormat, Solution},
    solver::{self, MipEngine, SolveReport, SolverConfig},
    Graph,
};

pub struct Pipeline {
    config: SolverConfig,
    engine: Arc<dyn MipEngine>,
    pool: WorkerPool,
}

impl Pipeline {
    pub fn new(config: SolverConfig, engine: Arc<dyn MipEngine>) -> Result<Pipeline, Error> {
        config.validate()?;
        let pool = WorkerPool::new(config.threads)?;
        log::debug!(
            "pipeline: {} workers, engine {}, {:?}",
            pool.threads(),
            engine.name(),
            config
        );
        Ok(Pipeline {
            config,
            engine,
            pool,
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn load(&self, reader: impl std::io::BufRead + Send) -> Result<Graph, InputError> {
        self.pool.install(|| parse_input(reader))
    }

    pub fn load_file(&self, path: &Path) -> Result<Graph, InputError> {
        let file = File::open(path).map_err(|source| InputError::Open {
            path: path.to_owned(),
            source,
        })?;
        self.load(BufReader::new(file))
    }

    pub fn assemble(&self, graph: &Graph) -> IlpModel {
        let started = Instant::now();
        let rows = self.pool.install(|| build_rows(graph));
        log::debug!("built {} rows in {:?}", rows.len(), started.elapsed());
        IlpModel::assemble(graph, rows)
    }

    /// Solve `graph` and check the answer is a dominating set.
    pub fn solve(&self, graph: &Graph) -> Result<(Solution, SolveReport), SolverFailure> {
        let model = self.assemble(graph);
        let solved = solver::solve(model, &self.config, Arc::clone(&self.engine))?;
        let solution = decode(&solved.model, solved.values)?;
        graph.validate_domination(&solution).map_err(|err| {
            SolverFailure::Internal(format!(
                "{} returned an invalid assignment: {err}",
                solved.report.engine
            ))
        })?;
        Ok((solution, solved.report))
    }

    /// Read `input`, solve, and write `output` in `format`.
    ///
    /// `output` is replaced atomically and left untouched on any failure.
    pub fn run_files(
        &self,
        input: &Path,
        output: &Path,
        format: OutputFormat,
    ) -> Result<(Solution, SolveReport), Error> {
        let graph = self.load_file(input)?;
        log::debug!(
            "loaded graph: {} vertices, {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );
        let (solution, report) = self.solve(&graph)?;
        write_atomic(output, solution.format(format).as_bytes()).map_err(|source| {
            Error::Output {
                path: output.to_owned(),
                source,
            }
        })?;
        Ok((solution, report))
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(contents)?;
    file.flush()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}
