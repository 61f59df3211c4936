//! Hamiltonian evaluation on the widened problem copies.

use nalgebra::{DMatrix, DVector};

use crate::{error::SolverError, float::SolverFloat};

/// Relative comparison with the tolerance the minima bookkeeping uses
/// everywhere: `|a - b| <= sqrt(eps) * max(|a|, |b|)`.
pub(crate) fn approximately(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs());
    (a - b).abs() <= f64::EPSILON.sqrt() * scale
}

/// Write `energies[j] = -1/2 spins[:,j]' Q spins[:,j] - h . spins[:,j]` for
/// the first `out.len()` columns of `spins`.
///
/// The workspace is often wider than the measured batch; the extra columns
/// are ignored.
pub fn calculate_into<T: SolverFloat>(
    out: &mut [f64],
    spins: &DMatrix<T>,
    interactions: &DMatrix<f64>,
    field: Option<&DVector<f64>>,
) -> Result<(), SolverError> {
    let dimension = spins.nrows();
    if interactions.nrows() != dimension || interactions.ncols() != dimension {
        return Err(SolverError::shape(format!(
            "interaction matrix is {}x{} but spins have {dimension} rows",
            interactions.nrows(),
            interactions.ncols()
        )));
    }
    if out.len() > spins.ncols() {
        return Err(SolverError::shape(format!(
            "{} energies requested from {} trajectories",
            out.len(),
            spins.ncols()
        )));
    }
    if let Some(field) = field {
        if field.len() != dimension {
            return Err(SolverError::shape(format!(
                "field length {} does not match dimension {dimension}",
                field.len()
            )));
        }
    }

    let mut column = DVector::zeros(dimension);
    let mut coupled = DVector::zeros(dimension);
    for (j, energy) in out.iter_mut().enumerate() {
        for i in 0..dimension {
            column[i] = spins[(i, j)].to_f64();
        }
        coupled.gemv(1.0, interactions, &column, 0.0);
        let mut value = -0.5 * column.dot(&coupled);
        if let Some(field) = field {
            value -= field.dot(&column);
        }
        *energy = value;
    }
    Ok(())
}

/// Value-returning form of [`calculate_into`], one energy per column.
pub fn calculate<T: SolverFloat>(
    spins: &DMatrix<T>,
    interactions: &DMatrix<f64>,
    field: Option<&DVector<f64>>,
) -> Result<DVector<f64>, SolverError> {
    let mut out = vec![0.0; spins.ncols()];
    calculate_into(&mut out, spins, interactions, field)?;
    Ok(DVector::from_vec(out))
}

/// For an observations matrix (repetitions x configurations), count per
/// configuration how many entries reach the global minimum. Configurations
/// tied at the minimum all count.
pub fn count_min_energy_hits(measurements: &DMatrix<f64>) -> Vec<usize> {
    if measurements.is_empty() {
        return Vec::new();
    }
    let minimum = measurements
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    (0..measurements.ncols())
        .map(|j| {
            measurements
                .column(j)
                .iter()
                .filter(|value| approximately(**value, minimum))
                .count()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{dmatrix, dvector};
    use pretty_assertions::assert_eq;

    #[test]
    fn matches_quadratic_form_by_hand() {
        // H(s) = -1/2 s'Qs - h.s for s = (1, -1): -1/2 * (-2*q01) - (h0 - h1)
        let q = dmatrix![0.0, 2.0; 2.0, 0.0];
        let h = dvector![0.5, 0.25];
        let spins = dmatrix![1.0, 1.0; -1.0, 1.0];
        let energies = calculate(&spins, &q, Some(&h)).unwrap();
        assert_eq!(energies[0], 2.0 - 0.25);
        assert_eq!(energies[1], -2.0 - 0.75);
    }

    #[test]
    fn truncates_to_the_requested_columns() {
        let q = dmatrix![0.0, 1.0; 1.0, 0.0];
        let spins = dmatrix![1.0, 1.0, 0.0; 1.0, -1.0, 0.0];
        let mut out = [0.0; 2];
        calculate_into(&mut out, &spins, &q, None).unwrap();
        assert_eq!(out, [-1.0, 1.0]);
    }

    #[test]
    fn rejects_more_energies_than_trajectories() {
        let q = dmatrix![0.0];
        let spins = dmatrix![1.0];
        let mut out = [0.0; 2];
        let err = calculate_into(&mut out, &spins, &q, None).unwrap_err();
        assert!(matches!(err, SolverError::InvalidShape { .. }));
    }

    #[test]
    fn counts_hits_per_configuration_with_ties() {
        let measurements = dmatrix![
            -3.0, -1.0, -3.0;
            -3.0,  0.0,  2.0
        ];
        assert_eq!(count_min_energy_hits(&measurements), vec![2, 0, 1]);
    }

    #[test]
    fn empty_measurements_count_nothing() {
        let measurements = DMatrix::<f64>::zeros(0, 0);
        assert_eq!(count_min_energy_hits(&measurements), Vec::<usize>::new());
    }
}
