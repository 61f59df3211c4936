//! Data adapters between user-facing problem forms and the solver core.
//!
//! The [`MixedIsing`] record uses the convention
//! `H(s) = -1/2 (s'Qs + f's) + offset`, i.e. the field also carries the
//! one-half factor. The core evaluator expects `-1/2 s'Qs - h's`, so
//! [`MixedIsing::solver_field`] halves `f` when handing a problem over.

use nalgebra::{DMatrix, DVector};

use crate::{error::SolverError, float::SolverFloat};

/// A mixed-Ising problem: binary coordinates in `{-1, 1}` on the prefix,
/// continuous in `[-1, 1]` behind it.
#[derive(Clone, Debug, PartialEq)]
pub struct MixedIsing {
    pub quadratic: DMatrix<f64>,
    pub field: DVector<f64>,
    pub offset: f64,
    pub binary: usize,
}

impl MixedIsing {
    /// Convert a QUMO instance (`-1/2 x'Qx - h'x` with binary coordinates
    /// in `{0, 1}`) into mixed-Ising form via `x_b = (1 + s_b) / 2` on the
    /// binary prefix. Continuous coordinates pass through unchanged.
    pub fn from_qumo(
        interactions: &DMatrix<f64>,
        field: Option<&DVector<f64>>,
        binary: usize,
    ) -> Result<Self, SolverError> {
        let n = interactions.nrows();
        if interactions.ncols() != n {
            return Err(SolverError::shape(format!(
                "interaction matrix must be square, got {}x{}",
                n,
                interactions.ncols()
            )));
        }
        if binary > n {
            return Err(SolverError::shape(format!(
                "binary prefix {binary} exceeds dimension {n}"
            )));
        }
        if let Some(field) = field {
            if field.len() != n {
                return Err(SolverError::shape(format!(
                    "field length {} does not match dimension {n}",
                    field.len()
                )));
            }
        }

        // x_i = a_i s_i + b_i with (a, b) = (1/2, 1/2) binary, (1, 0) continuous
        let scale = |i: usize| if i < binary { 0.5 } else { 1.0 };
        let shift = |i: usize| if i < binary { 0.5 } else { 0.0 };

        let mut quadratic = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                quadratic[(i, j)] = interactions[(i, j)] * scale(i) * scale(j);
            }
        }

        // linear coefficient of s_i in -1/2 x'Qx - h'x, written as -g's
        let mut linear = DVector::zeros(n);
        for i in 0..n {
            let mut induced = field.map_or(0.0, |h| h[i]);
            for j in 0..n {
                induced += interactions[(i, j)] * shift(j);
            }
            linear[i] = scale(i) * induced;
        }

        let mut offset = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                offset -= interactions[(i, j)] * shift(i) * shift(j);
            }
            offset -= 0.5 * interactions[(i, i)] * shift(i) * shift(i);
            offset -= field.map_or(0.0, |h| h[i]) * shift(i);
        }

        Ok(MixedIsing {
            quadratic,
            field: linear * 2.0,
            offset,
            binary,
        })
    }

    /// Flip the optimization sense by negating the quadratic and linear
    /// parts (for callers starting from a maximization problem).
    pub fn negated(&self) -> Self {
        MixedIsing {
            quadratic: -&self.quadratic,
            field: -&self.field,
            offset: -self.offset,
            binary: self.binary,
        }
    }

    /// The field in the core evaluator's convention (`-1/2 s'Qs - h's`).
    pub fn solver_field(&self) -> DVector<f64> {
        &self.field * 0.5
    }

    /// The core problem data in compute type `T`: `(Q, h)`; add
    /// [`MixedIsing::offset`] to reported objectives.
    pub fn solver_problem<T: SolverFloat>(&self) -> (DMatrix<T>, Option<DVector<T>>) {
        let q = self.quadratic.map(<T as SolverFloat>::from_f64);
        let h = if self.field.iter().all(|v| *v == 0.0) {
            None
        } else {
            Some(self.solver_field().map(<T as SolverFloat>::from_f64))
        };
        (q, h)
    }
}

/// Embed graph MaxCut as mixed-Ising: `Q = -A` plus the constant shift
/// `-sum(A)/4`, so the total Hamiltonian of a `±1` assignment satisfies
/// `cut = (sum(A)/4 - H) / 2` (see [`graph_cut_from_hamiltonian`]).
pub fn maxcut_ising(adjacency: &DMatrix<f64>) -> Result<(DMatrix<f64>, f64), SolverError> {
    let n = adjacency.nrows();
    if adjacency.ncols() != n {
        return Err(SolverError::shape(format!(
            "adjacency matrix must be square, got {}x{}",
            n,
            adjacency.ncols()
        )));
    }
    let offset = -adjacency.sum() / 4.0;
    Ok((-adjacency, offset))
}

/// Recover the cut weight from a total MaxCut Hamiltonian (core objective
/// plus the embedding offset).
pub fn graph_cut_from_hamiltonian(adjacency: &DMatrix<f64>, hamiltonian: f64) -> f64 {
    (adjacency.sum() / 4.0 - hamiltonian) / 2.0
}

/// The cut weight of a `±1` assignment.
pub fn cut_value<T: SolverFloat>(adjacency: &DMatrix<f64>, assignment: &DVector<T>) -> f64 {
    let n = adjacency.nrows();
    let mut cut = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            if assignment[i].to_f64() * assignment[j].to_f64() < 0.0 {
                cut += adjacency[(i, j)];
            }
        }
    }
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{dmatrix, dvector};
    use pretty_assertions::assert_eq;

    #[test]
    fn scalar_qumo_converts_to_the_known_mixed_ising_form() {
        let w = 4.0;
        let v = 5.0;
        let q = dmatrix![0.0, w; w, v];
        let ising = MixedIsing::from_qumo(&q, None, 1).unwrap();
        assert_eq!(ising.quadratic, dmatrix![0.0, w / 2.0; w / 2.0, v]);
        assert_eq!(ising.field, dvector![0.0, w]);
        assert_eq!(ising.offset, 0.0);
    }

    #[test]
    fn conversion_preserves_the_energy_landscape() {
        // H_qumo(x) = -1/2 x'Qx - h'x must equal the mixed-Ising energy at
        // the mapped point for every binary corner
        let q = dmatrix![0.0, 3.0; 3.0, 2.0];
        let h = dvector![1.0, -0.5];
        let ising = MixedIsing::from_qumo(&q, Some(&h), 1).unwrap();
        for (x0, x1) in [(0.0, 0.7), (1.0, 0.7), (0.0, -0.3), (1.0, -0.3)] {
            let x = dvector![x0, x1];
            let qumo_energy = -0.5 * (x.transpose() * &q * &x)[(0, 0)] - h.dot(&x);
            let s = dvector![2.0 * x0 - 1.0, x1];
            let ising_energy = -0.5
                * ((s.transpose() * &ising.quadratic * &s)[(0, 0)] + ising.field.dot(&s))
                + ising.offset;
            assert!(
                (qumo_energy - ising_energy).abs() < 1e-12,
                "corner ({x0}, {x1}): {qumo_energy} vs {ising_energy}"
            );
        }
    }

    #[test]
    fn five_cycle_embedding_recovers_the_max_cut() {
        let mut adjacency = DMatrix::zeros(5, 5);
        for i in 0..5 {
            adjacency[(i, (i + 1) % 5)] = 1.0;
            adjacency[((i + 1) % 5, i)] = 1.0;
        }
        let (q, offset) = maxcut_ising(&adjacency).unwrap();
        // best cut of C5 is 4, e.g. (+, -, +, -, +) cutting four edges
        let assignment = dvector![1.0, -1.0, 1.0, -1.0, 1.0];
        assert_eq!(cut_value(&adjacency, &assignment), 4.0);
        let core = -0.5 * (assignment.transpose() * &q * &assignment)[(0, 0)];
        let total = core + offset;
        assert_eq!(graph_cut_from_hamiltonian(&adjacency, total), 4.0);
    }

    #[test]
    fn negation_flips_the_sense() {
        let q = dmatrix![0.0, 1.0; 1.0, 0.0];
        let ising = MixedIsing::from_qumo(&q, None, 2).unwrap();
        let flipped = ising.negated();
        assert_eq!(flipped.quadratic, -ising.quadratic);
        assert_eq!(flipped.field, -ising.field);
    }
}
