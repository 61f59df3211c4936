use nalgebra::{DMatrix, DVector};

use crate::{error::SolverError, float::SolverFloat};

/// An immutable quadratic mixed-optimization instance.
///
/// Minimizes `-1/2 xᵀQx - hᵀx` where coordinates `0..binary` are binary and
/// the remainder are continuous. The interaction matrix must be symmetric
/// with a zero diagonal on the binary block.
///
/// Alongside the compute-type copies, the problem carries `f64` copies of
/// `Q` and `h`. The energy evaluator and the spectral normalizer read only
/// those, so a narrow compute type never degrades measured objectives.
#[derive(Clone, Debug)]
pub struct Problem<T: SolverFloat> {
    interactions: DMatrix<T>,
    field: Option<DVector<T>>,
    binary: usize,
    interactions_eval: DMatrix<f64>,
    field_eval: Option<DVector<f64>>,
}

impl<T: SolverFloat> Problem<T> {
    pub fn new(
        interactions: DMatrix<T>,
        field: Option<DVector<T>>,
        binary: usize,
    ) -> Result<Self, SolverError> {
        let (rows, cols) = interactions.shape();
        if rows != cols {
            return Err(SolverError::shape(format!(
                "interaction matrix must be square, got {rows}x{cols}"
            )));
        }
        if binary > rows {
            return Err(SolverError::shape(format!(
                "binary prefix {binary} exceeds problem dimension {rows}"
            )));
        }
        for i in 0..rows {
            for j in (i + 1)..cols {
                if interactions[(i, j)] != interactions[(j, i)] {
                    return Err(SolverError::shape(format!(
                        "interaction matrix is not symmetric at ({i}, {j})"
                    )));
                }
            }
        }
        for i in 0..binary {
            if interactions[(i, i)] != T::zero() {
                return Err(SolverError::shape(format!(
                    "binary coordinate {i} must have a zero diagonal entry"
                )));
            }
        }
        if let Some(field) = &field {
            if field.len() != rows {
                return Err(SolverError::shape(format!(
                    "field length {} does not match dimension {rows}",
                    field.len()
                )));
            }
        }

        let interactions_eval = interactions.map(SolverFloat::to_f64);
        let field_eval = field.as_ref().map(|f| f.map(SolverFloat::to_f64));

        Ok(Problem {
            interactions,
            field,
            binary,
            interactions_eval,
            field_eval,
        })
    }

    pub fn dimension(&self) -> usize {
        self.interactions.nrows()
    }

    /// Number of binary coordinates; they occupy the prefix `0..binary()`.
    pub fn binary(&self) -> usize {
        self.binary
    }

    pub fn interactions(&self) -> &DMatrix<T> {
        &self.interactions
    }

    pub fn field(&self) -> Option<&DVector<T>> {
        self.field.as_ref()
    }

    pub fn interactions_eval(&self) -> &DMatrix<f64> {
        &self.interactions_eval
    }

    pub fn field_eval(&self) -> Option<&DVector<f64>> {
        self.field_eval.as_ref()
    }
}
