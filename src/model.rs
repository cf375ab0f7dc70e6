//! Binary ILP for the minimum dominating set.
//!
//! The model is plain data: columns, objective and rows. It is assembled on
//! the pipeline thread and then moved into the solver thread, which is the
//! only place the engine's model building API gets called.

use crate::{rows::ConstraintRow, Graph};

/// Objective coefficient of every column; minimising counts selected vertices.
pub const SELECTION_COST: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct IlpModel {
    objective: Vec<f64>,
    rows: Vec<ConstraintRow>,
}

impl IlpModel {
    /// One binary column per vertex and one covering row per vertex.
    ///
    /// # Panics
    ///
    /// When `rows` is not exactly one row per vertex in vertex order. Rows come
    /// from [`crate::build_rows`], so a mismatch is a bug in the caller.
    pub fn assemble(graph: &Graph, rows: Vec<ConstraintRow>) -> IlpModel {
        assert_eq!(
            rows.len(),
            graph.vertex_count(),
            "one covering row per vertex"
        );
        for (index, row) in rows.iter().enumerate() {
            assert_eq!(row.owner() as usize, index, "row {index} out of order");
        }
        let model = IlpModel {
            objective: vec![SELECTION_COST; graph.vertex_count()],
            rows,
        };
        log::debug!(
            "assembled model: {} binary columns, {} rows, {} non-zeros",
            model.column_count(),
            model.row_count(),
            model.non_zeros()
        );
        model
    }

    pub fn column_count(&self) -> usize {
        self.objective.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Objective coefficients, indexed by column.
    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    /// Rows in submission order; row `i` belongs to column `i`.
    pub fn rows(&self) -> &[ConstraintRow] {
        &self.rows
    }

    pub fn non_zeros(&self) -> usize {
        self.rows.iter().map(ConstraintRow::len).sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{build_row, build_rows};

    #[test]
    fn test_assemble_counts() {
        let graph = Graph::load(4, &[(0, 1), (1, 2), (2, 3)]).unwrap();
        let model = IlpModel::assemble(&graph, build_rows(&graph));
        assert_eq!(model.column_count(), 4);
        assert_eq!(model.row_count(), 4);
        assert_eq!(model.non_zeros(), 4 + 2 * 3);
        assert!(model.objective().iter().all(|&c| c == 1.0));
        assert!(model.rows().iter().all(|row| row.lower_bound() == 1.0));
    }

    #[test]
    fn test_empty_model() {
        let graph = Graph::load(0, &[]).unwrap();
        let model = IlpModel::assemble(&graph, build_rows(&graph));
        assert_eq!(model.column_count(), 0);
        assert_eq!(model.row_count(), 0);
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn test_rows_out_of_order() {
        let graph = Graph::load(2, &[(0, 1)]).unwrap();
        let rows = vec![build_row(1, &graph), build_row(0, &graph)];
        IlpModel::assemble(&graph, rows);
    }

    #[test]
    #[should_panic(expected = "one covering row per vertex")]
    fn test_missing_row() {
        let graph = Graph::load(2, &[(0, 1)]).unwrap();
        IlpModel::assemble(&graph, vec![build_row(0, &graph)]);
    }
}
