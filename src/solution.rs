use bitvec::vec::BitVec;
use std::{fmt::Write, str::FromStr};

use crate::{
    error::{ConfigError, SolverFailure},
    model::IlpModel,
};

/// Solved value of every vertex variable, in vertex order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    values: Vec<f64>,
}

/// Why an assignment is not a dominating set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Undominated {
    #[error("vertex {0} is neither selected nor adjacent to a selected vertex")]
    Vertex(u32),

    #[error("assignment has {found} values for {expected} vertices")]
    WrongLength { expected: usize, found: usize },
}

/// Read back the solver values, one per column of `model`.
pub fn decode(model: &IlpModel, values: Vec<f64>) -> Result<Solution, SolverFailure> {
    if values.len() != model.column_count() {
        return Err(SolverFailure::Internal(format!(
            "solver returned {} values for {} columns",
            values.len(),
            model.column_count()
        )));
    }
    Ok(Solution { values })
}

impl Solution {
    pub fn from_values(values: Vec<f64>) -> Solution {
        Solution { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Membership after rounding each value to the nearest integer.
    pub fn selected(&self) -> BitVec {
        self.values.iter().map(|&v| v.round() >= 1.0).collect()
    }

    pub fn size(&self) -> usize {
        self.selected().count_ones()
    }

    pub fn vertices(&self) -> Vec<u32> {
        self.selected().iter_ones().map(|v| v as u32).collect()
    }

    pub fn format(&self, format: OutputFormat) -> String {
        let mut output = String::new();
        match format {
            OutputFormat::Compact => {
                for value in &self.values {
                    let _ = write!(&mut output, "{}", normalise(*value));
                }
            }
            OutputFormat::Lines => {
                for value in &self.values {
                    let _ = writeln!(&mut output, "{}", normalise(*value));
                }
            }
            OutputFormat::Vertices => {
                let vertices = self.vertices();
                let _ = writeln!(&mut output, "{}", vertices.len());
                for vertex in vertices {
                    let _ = writeln!(&mut output, "{}", vertex);
                }
            }
        }
        output
    }
}

// -0.0 + 0.0 is 0.0
fn normalise(value: f64) -> f64 {
    value + 0.0
}

/// Encoding of the output file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Raw values back to back, the legacy layout. Only unambiguous while
    /// every value prints as a single digit.
    Compact,
    /// One raw value per line, in vertex order.
    #[default]
    Lines,
    /// Size of the set, then one selected vertex per line.
    Vertices,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(OutputFormat::Compact),
            "lines" => Ok(OutputFormat::Lines),
            "vertices" => Ok(OutputFormat::Vertices),
            _ => Err(ConfigError::Unknown {
                kind: "output format",
                value: s.to_owned(),
            }),
        }
    }
}
