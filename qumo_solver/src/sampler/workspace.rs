use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Uniform};

use crate::{config::Setup, float::SolverFloat};

/// Scratch buffers for one batch of trajectories.
///
/// Allocated once per exploration and reloaded between batches; the matrices
/// are `dimension x width` and the per-trajectory vectors have length
/// `width`. A final batch narrower than `width` leaves the tail columns at
/// zero; the energy evaluator truncates accordingly.
pub struct Workspace<T: SolverFloat> {
    pub x: DMatrix<T>,
    pub y: DMatrix<T>,
    pub spins: DMatrix<T>,
    pub fields: DMatrix<T>,
    pub annealing_live: DVector<T>,
    pub gradient: DVector<T>,
    pub momentum: DVector<T>,
    pub delta: DVector<T>,
}

impl<T: SolverFloat> Workspace<T> {
    pub fn new(dimension: usize, width: usize) -> Self {
        Workspace {
            x: DMatrix::zeros(dimension, width),
            y: DMatrix::zeros(dimension, width),
            spins: DMatrix::zeros(dimension, width),
            fields: DMatrix::zeros(dimension, width),
            annealing_live: DVector::zeros(width),
            gradient: DVector::zeros(width),
            momentum: DVector::zeros(width),
            delta: DVector::zeros(width),
        }
    }

    pub fn dimension(&self) -> usize {
        self.x.nrows()
    }

    pub fn width(&self) -> usize {
        self.x.ncols()
    }

    /// Copy `count` trajectories of `setup` starting at `offset` into the
    /// live vectors and zero the tail.
    pub fn load_setup(&mut self, setup: &Setup<T>, offset: usize, count: usize) {
        for j in 0..self.width() {
            if j < count {
                self.annealing_live[j] = setup.annealing[offset + j];
                self.gradient[j] = setup.gradient[offset + j];
                self.momentum[j] = setup.momentum[offset + j];
            } else {
                self.annealing_live[j] = T::zero();
                self.gradient[j] = T::zero();
                self.momentum[j] = T::zero();
            }
            self.delta[j] = T::zero();
        }
    }

    /// Divide the live annealing values by the iteration count to obtain the
    /// per-step decrement.
    pub fn set_annealing_decrement(&mut self, iterations: usize) {
        let steps = <T as SolverFloat>::from_f64(iterations.max(1) as f64);
        for j in 0..self.width() {
            self.delta[j] = self.annealing_live[j] / steps;
        }
    }

    /// Draw a fresh initial state `x ~ Uniform(-1/sqrt(N), 1/sqrt(N))` and
    /// zero the other state buffers.
    pub fn randomize_state(&mut self, rng: &mut StdRng) {
        let amplitude = 1.0 / (self.dimension().max(1) as f64).sqrt();
        let uniform =
            Uniform::new(-amplitude, amplitude).expect("state amplitude bounds are ordered");
        for value in self.x.iter_mut() {
            *value = <T as SolverFloat>::from_f64(uniform.sample(rng));
        }
        self.y.fill(T::zero());
        self.spins.fill(T::zero());
        self.fields.fill(T::zero());
    }
}
