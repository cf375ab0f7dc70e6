//! Covering constraints, one per vertex: `x_i + Σ_{j ∈ adj(i)} x_j >= 1`.

use rayon::prelude::*;
use smallvec::SmallVec;

use crate::Graph;

/// Right-hand side of every covering row.
pub const COVER_LOWER_BOUND: f64 = 1.0;

/// Sparse covering row owned by a single vertex.
///
/// Entries are `(variable, coefficient)`; the owner comes first, followed by
/// its distinct neighbours in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRow {
    owner: u32,
    entries: SmallVec<[(u32, f64); 8]>,
}

impl ConstraintRow {
    pub fn owner(&self) -> u32 {
        self.owner
    }

    pub fn entries(&self) -> &[(u32, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lower_bound(&self) -> f64 {
        COVER_LOWER_BOUND
    }
}

pub fn build_row(vertex: u32, graph: &Graph) -> ConstraintRow {
    let neighbours = graph.neighbours(vertex);
    let mut entries = SmallVec::with_capacity(neighbours.len() + 1);
    entries.push((vertex, 1.0));
    entries.extend(neighbours.iter().map(|&n| (n, 1.0)));
    debug_assert!(neighbours.windows(2).all(|w| w[0] < w[1]));
    debug_assert!(!neighbours.contains(&vertex));
    ConstraintRow {
        owner: vertex,
        entries,
    }
}

/// Compute every row on the current rayon pool.
///
/// The indexed collect writes row `i` to slot `i` whatever order the workers
/// finish in, so the result lines up with the variable indices.
pub fn build_rows(graph: &Graph) -> Vec<ConstraintRow> {
    graph
        .vertices()
        .into_par_iter()
        .map(|vertex| build_row(vertex, graph))
        .collect()
}
