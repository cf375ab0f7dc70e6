use rayon::prelude::*;
use std::{io::BufRead, ops::Range, str::FromStr};

pub mod error;
pub mod model;
pub mod pipeline;
pub mod pool;
pub mod rows;
pub mod solution;
pub mod solver;

pub use error::{ConfigError, Error, InputError, SolverFailure};
pub use model::IlpModel;
pub use pipeline::Pipeline;
pub use pool::WorkerPool;
pub use rows::{build_row, build_rows, ConstraintRow};
pub use solution::{decode, OutputFormat, Solution, Undominated};
pub use solver::{EngineKind, Heuristic, MipEngine, Mode, SolveReport, SolverConfig};

/// Read a graph in the `n m` header + edge list format.
///
/// Endpoints may be laid out one edge per line or in any other whitespace
/// separated layout. The number of edges read must match the header.
pub fn parse_input(reader: impl BufRead) -> Result<Graph, InputError> {
    let mut lines = reader.lines().enumerate().map(|(i, line)| (i + 1, line));

    let (header_line, header) = loop {
        let Some((number, line)) = lines.next() else {
            return Err(InputError::MissingHeader);
        };
        let line = line?;
        if !line.trim().is_empty() {
            break (number, line);
        }
    };
    let mut fields = header.split_whitespace();
    let (Some(vertices), Some(edges), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(InputError::MalformedHeader {
            line: header_line,
            text: header.trim().to_owned(),
        });
    };
    let vertex_count: usize = parse_token(vertices, header_line)?;
    let edge_count: usize = parse_token(edges, header_line)?;

    // the header is untrusted, don't let it decide the allocation alone
    let mut edges = Vec::with_capacity(edge_count.min(1 << 20));
    let mut pending: Option<(u32, usize)> = None;
    for (number, line) in lines {
        let line = line?;
        for token in line.split_whitespace() {
            let vertex = parse_token(token, number)?;
            match pending.take() {
                None => pending = Some((vertex, number)),
                Some((start, _)) => edges.push((start, vertex)),
            }
        }
    }
    if let Some((vertex, line)) = pending {
        return Err(InputError::DanglingEndpoint { vertex, line });
    }
    if edges.len() != edge_count {
        return Err(InputError::EdgeCountMismatch {
            declared: edge_count,
            found: edges.len(),
        });
    }
    Graph::load(vertex_count, &edges)
}

fn parse_token<T: FromStr>(token: &str, line: usize) -> Result<T, InputError> {
    token.parse().map_err(|_| InputError::Parse {
        token: token.to_owned(),
        line,
    })
}

/// Undirected graph with symmetric, de-duplicated adjacency in compressed form.
///
/// Immutable once loaded; row workers share it by reference.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertices: usize,
    neighbours: Vec<u32>,
    neighbour_indices: Vec<usize>,
}

impl Graph {
    /// Build the adjacency for `vertex_count` vertices from an edge list.
    ///
    /// Edges are checked before anything is allocated per vertex. Per-vertex
    /// storage is then reserved on the current rayon pool and edges are
    /// inserted on the calling thread. Duplicate edges collapse to one neighbour.
    ///
    /// Memory is linear in `vertex_count` even without edges, so callers
    /// reading untrusted headers bound it themselves. A reservation the
    /// allocator refuses is reported as [`InputError::TooLarge`].
    pub fn load(vertex_count: usize, edges: &[(u32, u32)]) -> Result<Graph, InputError> {
        if vertex_count > u32::MAX as usize {
            return Err(InputError::TooManyVertices(vertex_count));
        }
        for &(u, v) in edges {
            if u as usize >= vertex_count || v as usize >= vertex_count {
                return Err(InputError::VertexOutOfRange { u, v, vertex_count });
            }
            if u == v {
                return Err(InputError::SelfLoop(u));
            }
        }

        let hint = capacity_hint(vertex_count, edges.len());
        let mut adjacency: Vec<Vec<u32>> = Vec::new();
        adjacency
            .try_reserve_exact(vertex_count)
            .map_err(|_| InputError::TooLarge(vertex_count))?;
        adjacency.par_extend(
            (0..vertex_count)
                .into_par_iter()
                .map(|_| Vec::with_capacity(hint)),
        );

        for &(u, v) in edges {
            adjacency[u as usize].push(v);
            adjacency[v as usize].push(u);
        }

        adjacency.par_iter_mut().for_each(|list| {
            list.sort_unstable();
            list.dedup();
        });

        let total = adjacency.iter().map(Vec::len).sum();
        let mut neighbours = Vec::with_capacity(total);
        let mut neighbour_indices = Vec::new();
        neighbour_indices
            .try_reserve_exact(vertex_count + 1)
            .map_err(|_| InputError::TooLarge(vertex_count))?;
        for list in &adjacency {
            neighbour_indices.push(neighbours.len());
            neighbours.extend_from_slice(list);
        }
        neighbour_indices.push(neighbours.len());

        let graph = Graph {
            vertices: vertex_count,
            neighbours,
            neighbour_indices,
        };
        debug_assert!(graph.is_symmetric());
        Ok(graph)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices
    }

    /// Number of distinct undirected edges.
    pub fn edge_count(&self) -> usize {
        self.neighbours.len() / 2
    }

    pub fn vertices(&self) -> Range<u32> {
        0..self.vertices as u32
    }

    /// Distinct neighbours of `vertex`, ascending.
    pub fn neighbours(&self, vertex: u32) -> &[u32] {
        let start = self.neighbour_indices[vertex as usize];
        let end = self.neighbour_indices[vertex as usize + 1];
        &self.neighbours[start..end]
    }

    pub fn degree(&self, vertex: u32) -> usize {
        self.neighbours(vertex).len()
    }

    pub fn is_isolated(&self, vertex: u32) -> bool {
        self.neighbours(vertex).is_empty()
    }

    pub fn is_symmetric(&self) -> bool {
        self.vertices().all(|u| {
            self.neighbours(u)
                .iter()
                .all(|&v| self.neighbours(v).binary_search(&u).is_ok())
        })
    }

    /// Check that every vertex is selected or has a selected neighbour.
    ///
    /// Values are rounded to the nearest integer first, so a near-binary
    /// assignment from the solver is judged by what it means, not its bits.
    pub fn validate_domination(&self, solution: &Solution) -> Result<(), Undominated> {
        if solution.len() != self.vertices {
            return Err(Undominated::WrongLength {
                expected: self.vertices,
                found: solution.len(),
            });
        }
        let selected = solution.selected();
        for vertex in self.vertices() {
            if selected[vertex as usize] {
                continue;
            }
            if !self.neighbours(vertex).iter().any(|&n| selected[n as usize]) {
                return Err(Undominated::Vertex(vertex));
            }
        }
        Ok(())
    }
}

/// Average degree, capped at `n / 4` so sparse inputs don't over-reserve.
fn capacity_hint(vertices: usize, edges: usize) -> usize {
    if vertices == 0 {
        return 0;
    }
    (2 * edges / vertices + 1).min(vertices / 4 + 1)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::BufReader;

    fn parse(text: &str) -> Result<Graph, InputError> {
        parse_input(BufReader::new(text.as_bytes()))
    }

    #[test]
    fn test_full_selection() {
        let graph = parse("4 3\n0 1\n1 2\n2 3\n").unwrap();
        assert!(graph
            .validate_domination(&Solution::from_values(vec![0.0; 4]))
            .is_err());
        assert!(graph
            .validate_domination(&Solution::from_values(vec![1.0; 4]))
            .is_ok());
    }

    #[test]
    fn test_adjacency_is_symmetric_and_deduplicated() {
        let graph = parse("4 5\n0 1\n1 0\n0 1\n2 1\n1 3\n").unwrap();
        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.neighbours(0), &[1]);
        assert_eq!(graph.neighbours(1), &[0, 2, 3]);
        assert_eq!(graph.neighbours(3), &[1]);
        assert!(graph.is_symmetric());
    }

    #[test]
    fn test_free_form_whitespace() {
        let graph = parse("\n3 2\n0 1 1\n\n2\n").unwrap();
        assert_eq!(graph.neighbours(1), &[0, 2]);
    }

    #[test]
    fn test_isolated_vertices() {
        let graph = parse("3 0\n").unwrap();
        assert!(graph.vertices().all(|v| graph.is_isolated(v)));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_empty_graph() {
        let graph = parse("0 0").unwrap();
        assert_eq!(graph.vertex_count(), 0);
        assert!(graph.validate_domination(&Solution::from_values(vec![])).is_ok());
    }

    #[test]
    fn test_out_of_range_vertex() {
        let err = parse("3 1\n0 3\n").unwrap_err();
        assert!(matches!(
            err,
            InputError::VertexOutOfRange {
                u: 0,
                v: 3,
                vertex_count: 3
            }
        ));
    }

    #[test]
    fn test_edge_count_mismatch() {
        let err = parse("3 2\n0 1\n").unwrap_err();
        assert!(matches!(
            err,
            InputError::EdgeCountMismatch {
                declared: 2,
                found: 1
            }
        ));
        assert!(matches!(
            parse("3 0\n0 1\n").unwrap_err(),
            InputError::EdgeCountMismatch { .. }
        ));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(parse("").unwrap_err(), InputError::MissingHeader));
        assert!(matches!(
            parse("3\n").unwrap_err(),
            InputError::MalformedHeader { line: 1, .. }
        ));
        assert!(matches!(
            parse("3 1\n0 x\n").unwrap_err(),
            InputError::Parse { line: 2, .. }
        ));
        assert!(matches!(
            parse("3 1\n0 -1\n").unwrap_err(),
            InputError::Parse { .. }
        ));
        assert!(matches!(
            parse("3 1\n0 1\n2\n").unwrap_err(),
            InputError::DanglingEndpoint { vertex: 2, line: 3 }
        ));
        assert!(matches!(
            parse("3 1\n1 1\n").unwrap_err(),
            InputError::SelfLoop(1)
        ));
    }

    #[test]
    fn test_huge_header_rejected_before_allocation() {
        // billions of vertices declared, the bad edge is found first
        assert!(matches!(
            parse("4000000000 1\n5 5\n").unwrap_err(),
            InputError::SelfLoop(5)
        ));
        assert!(matches!(
            parse("4000000000 2\n0 1\n3 3\n").unwrap_err(),
            InputError::SelfLoop(3)
        ));
        assert!(matches!(
            Graph::load(u32::MAX as usize + 1, &[]).unwrap_err(),
            InputError::TooManyVertices(_)
        ));
    }

    #[test]
    fn test_capacity_hint() {
        assert_eq!(capacity_hint(0, 0), 0);
        assert_eq!(capacity_hint(5, 10), 2);
        assert_eq!(capacity_hint(1000, 1000), 3);
    }
}
