//! Pluggable reducers over the (energies, spins) stream.

use nalgebra::{DMatrix, DMatrixView, DVector};

use crate::float::SolverFloat;

/// The running optimum of an exploration.
#[derive(Clone, Debug)]
pub struct BestFound<T: SolverFloat> {
    pub objective: f64,
    pub assignment: DVector<T>,
}

/// Incremental aggregator fed once per batch. After `finish`, `retrieve`
/// is idempotent.
pub trait Collector<T: SolverFloat> {
    /// `energies[k]` belongs to column `k` of `spins`; both views cover only
    /// the trajectories measured in this batch.
    fn update(&mut self, energies: &[f64], spins: DMatrixView<'_, T>);

    fn finish(&mut self);

    fn retrieve(&self) -> BestFound<T>;

    /// Collector-specific payload, if any.
    fn info(&self) -> Option<DMatrix<T>>;
}

/// Tracks the single best (objective, assignment) pair seen so far.
pub struct BestAssignment<T: SolverFloat> {
    objective: f64,
    assignment: DVector<T>,
}

impl<T: SolverFloat> BestAssignment<T> {
    pub fn new(dimension: usize) -> Self {
        BestAssignment {
            objective: f64::INFINITY,
            assignment: DVector::zeros(dimension),
        }
    }
}

impl<T: SolverFloat> Collector<T> for BestAssignment<T> {
    fn update(&mut self, energies: &[f64], spins: DMatrixView<'_, T>) {
        debug_assert_eq!(energies.len(), spins.ncols());
        let mut best = None;
        for (k, energy) in energies.iter().enumerate() {
            if *energy < self.objective {
                self.objective = *energy;
                best = Some(k);
            }
        }
        if let Some(k) = best {
            self.assignment.copy_from(&spins.column(k));
        }
    }

    fn finish(&mut self) {}

    fn retrieve(&self) -> BestFound<T> {
        BestFound {
            objective: self.objective,
            assignment: self.assignment.clone(),
        }
    }

    fn info(&self) -> Option<DMatrix<T>> {
        None
    }
}

/// Like [`BestAssignment`], but additionally keeps every measured spin
/// column; `info` returns them concatenated in measurement order.
pub struct FinalAssignment<T: SolverFloat> {
    best: BestAssignment<T>,
    dimension: usize,
    columns: Vec<DVector<T>>,
}

impl<T: SolverFloat> FinalAssignment<T> {
    pub fn new(dimension: usize) -> Self {
        FinalAssignment {
            best: BestAssignment::new(dimension),
            dimension,
            columns: Vec::new(),
        }
    }
}

impl<T: SolverFloat> Collector<T> for FinalAssignment<T> {
    fn update(&mut self, energies: &[f64], spins: DMatrixView<'_, T>) {
        self.best.update(energies, spins);
        for column in spins.column_iter() {
            self.columns.push(column.into_owned());
        }
    }

    fn finish(&mut self) {
        self.best.finish();
    }

    fn retrieve(&self) -> BestFound<T> {
        self.best.retrieve()
    }

    fn info(&self) -> Option<DMatrix<T>> {
        if self.columns.is_empty() {
            return None;
        }
        let mut snapshots = DMatrix::zeros(self.dimension, self.columns.len());
        for (k, column) in self.columns.iter().enumerate() {
            snapshots.column_mut(k).copy_from(column);
        }
        Some(snapshots)
    }
}
