use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
    time::Duration,
};

use dominating_set::{
    parse_input, solver::MicroLp, Error, Graph, InputError, Mode, OutputFormat, Pipeline,
    Solution, SolverConfig, SolverFailure,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn graph_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("graphs")
        .join(format!("{name}.in"))
}

fn load(name: &str) -> Graph {
    parse_input(BufReader::new(File::open(graph_path(name)).unwrap())).unwrap()
}

fn pipeline(config: SolverConfig) -> Pipeline {
    Pipeline::new(config, Arc::new(MicroLp)).unwrap()
}

fn solve_exact(graph: &Graph) -> Solution {
    let (solution, report) = pipeline(SolverConfig::exact()).solve(graph).unwrap();
    assert_eq!(report.mode, Mode::Exact);
    assert!(report.is_proven_optimal());
    assert_eq!(solution.len(), graph.vertex_count());
    assert!(graph.validate_domination(&solution).is_ok());
    solution
}

fn random_graph(rng: &mut ChaCha8Rng, vertices: u32, p: f64) -> Graph {
    let mut edges = Vec::new();
    for u in 0..vertices {
        for v in u + 1..vertices {
            if rng.gen_bool(p) {
                edges.push((u, v));
            }
        }
    }
    Graph::load(vertices as usize, &edges).unwrap()
}

/// Smallest dominating set by trying every subset, for graphs up to ~16 vertices.
fn domination_number(graph: &Graph) -> usize {
    let n = graph.vertex_count();
    let closed: Vec<u32> = graph
        .vertices()
        .map(|v| {
            graph
                .neighbours(v)
                .iter()
                .fold(1 << v, |mask, &u| mask | (1 << u))
        })
        .collect();
    let all = (1u32 << n) - 1;
    (0..=all)
        .filter(|&subset| {
            let covered = closed
                .iter()
                .enumerate()
                .filter(|(v, _)| subset & (1 << v) != 0)
                .fold(0, |mask, (_, &c)| mask | c);
            covered == all
        })
        .map(|subset| subset.count_ones() as usize)
        .min()
        .unwrap_or(0)
}

/// Greedy upper bound: repeatedly take the vertex dominating the most new vertices.
fn greedy_size(graph: &Graph) -> usize {
    let mut dominated = vec![false; graph.vertex_count()];
    let mut size = 0;
    while dominated.iter().any(|d| !d) {
        let gain = |v: u32| {
            std::iter::once(v)
                .chain(graph.neighbours(v).iter().copied())
                .filter(|&u| !dominated[u as usize])
                .count()
        };
        let best = graph.vertices().max_by_key(|&v| gain(v)).unwrap();
        dominated[best as usize] = true;
        for &u in graph.neighbours(best) {
            dominated[u as usize] = true;
        }
        size += 1;
    }
    size
}

#[test]
fn test_path() {
    let graph = load("path4");
    assert_eq!(solve_exact(&graph).size(), 2);
}

#[test]
fn test_complete_graph() {
    let graph = load("k5");
    let solution = solve_exact(&graph);
    assert_eq!(solution.size(), 1);
}

#[test]
fn test_isolated_vertices_forced() {
    let graph = load("isolated3");
    let solution = solve_exact(&graph);
    assert_eq!(solution.vertices(), vec![0, 1, 2]);
}

#[test]
fn test_duplicate_edges() {
    let graph = load("star_duplicates");
    assert_eq!(graph.degree(0), 5);
    let solution = solve_exact(&graph);
    assert_eq!(solution.vertices(), vec![0]);
}

#[test]
fn test_petersen() {
    let graph = load("petersen");
    assert_eq!(domination_number(&graph), 3);
    assert_eq!(solve_exact(&graph).size(), 3);
}

#[test]
fn test_exact_matches_exhaustive_search() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for round in 0..24 {
        let vertices = rng.gen_range(1..=11);
        let p = [0.1, 0.25, 0.5][round % 3];
        let graph = random_graph(&mut rng, vertices, p);
        let solution = solve_exact(&graph);
        assert_eq!(
            solution.size(),
            domination_number(&graph),
            "round {round}: {vertices} vertices"
        );
        for v in graph.vertices().filter(|&v| graph.is_isolated(v)) {
            assert!(solution.selected()[v as usize]);
        }
    }
}

#[test]
fn test_approximate_random_graph() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let graph = random_graph(&mut rng, 30, 0.15);
    let config = SolverConfig::approximate().with_time_limit(Duration::from_secs(120));
    let (solution, report) = pipeline(config).solve(&graph).unwrap();
    assert_eq!(report.mode, Mode::Approximate);
    assert!(report.gap_bound <= 0.01);
    assert_eq!(solution.len(), 30);
    assert!(graph.validate_domination(&solution).is_ok());
    let bound = greedy_size(&graph) as f64 * (1.0 + report.gap_bound);
    assert!(solution.size() as f64 <= bound);
}

#[test]
fn test_approximate_time_limited_incumbent() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let graph = random_graph(&mut rng, 150, 0.04);
    let config = SolverConfig::approximate().with_time_limit(Duration::from_secs(3));
    let (solution, report) = pipeline(config).solve(&graph).unwrap();
    assert_eq!(report.mode, Mode::Approximate);
    assert_eq!(solution.len(), 150);
    assert!(graph.validate_domination(&solution).is_ok());
    assert!(
        report.gap_bound > 0.0 || report.to_string().contains("gap=unknown"),
        "{report}"
    );
}

#[test]
fn test_exact_time_limit_is_not_optimal() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let graph = random_graph(&mut rng, 150, 0.04);
    let config = SolverConfig::exact().with_time_limit(Duration::from_millis(50));
    match pipeline(config).solve(&graph) {
        Ok((solution, report)) => {
            assert!(!report.is_proven_optimal(), "{report}");
            assert!(graph.validate_domination(&solution).is_ok());
        }
        Err(err) => assert!(matches!(err, SolverFailure::TimeLimit(_)), "{err}"),
    }
}

#[test]
fn test_out_of_range_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("solution.out");
    let err = pipeline(SolverConfig::exact())
        .run_files(&graph_path("out_of_range"), &output, OutputFormat::Lines)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Input(InputError::VertexOutOfRange { v: 3, .. })
    ));
    assert!(!output.exists());
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = pipeline(SolverConfig::exact())
        .run_files(
            &dir.path().join("missing.in"),
            &dir.path().join("solution.out"),
            OutputFormat::Lines,
        )
        .unwrap_err();
    assert!(matches!(err, Error::Input(InputError::Open { .. })));
}

#[test]
fn test_run_files_compact() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("solution.out");
    let (solution, _) = pipeline(SolverConfig::exact())
        .run_files(&graph_path("isolated3"), &output, OutputFormat::Compact)
        .unwrap();
    assert_eq!(solution.size(), 3);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "111");
}

#[test]
fn test_cli_success() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("solution.out");
    let status = Command::new(env!("CARGO_BIN_EXE_dominating-set"))
        .arg(graph_path("path4"))
        .arg(&output)
        .args(["--format", "vertices", "--threads", "2"])
        .status()
        .unwrap();
    assert!(status.success());
    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written.lines().next(), Some("2"));
    assert_eq!(written.lines().count(), 3);
}

#[test]
fn test_cli_failures() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("solution.out");

    let status = Command::new(env!("CARGO_BIN_EXE_dominating-set"))
        .arg(graph_path("out_of_range"))
        .arg(&output)
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
    assert!(!output.exists());

    let status = Command::new(env!("CARGO_BIN_EXE_dominating-set"))
        .arg(graph_path("path4"))
        .arg(&output)
        .args(["--mode", "exact", "--gap", "0.05"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
    assert!(!output.exists());

    let status = Command::new(env!("CARGO_BIN_EXE_dominating-set"))
        .arg(graph_path("path4"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}
