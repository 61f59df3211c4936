//! The fused sampler kernel and its dialects.
//!
//! A dialect is a value triple (non-linearity, wall, bias); the kernel is
//! written once and reads the dialect, so the three solver variants share
//! one inner loop.

use nalgebra::{DMatrix, DVector};

use crate::float::SolverFloat;

pub mod nonlinearity;
pub mod wall;
pub mod workspace;

pub use nonlinearity::{NonLinearity, NonLinearityRegistry};
pub use wall::Wall;
pub use workspace::Workspace;

/// One concrete update rule for the binary block.
#[derive(Clone, Debug)]
pub struct Dialect<T: SolverFloat> {
    pub name: &'static str,
    pub nonlinearity: NonLinearity<T>,
    pub wall: Wall<T>,
    pub bias: T,
}

impl<T: SolverFloat> Dialect<T> {
    /// Binary coordinates in `{-1, 0, 1}` via `sign`, walls at `[-1, 1]`,
    /// no bias.
    pub fn mixed_ising() -> Self {
        Dialect {
            name: "mixed-ising",
            nonlinearity: NonLinearity::sign(),
            wall: Wall::ising(),
            bias: T::zero(),
        }
    }

    /// Binary coordinates in `{0, 1}` via `step_half`, walls at `[0, 1]`,
    /// restoring term centered at one half.
    pub fn positive_qumo() -> Self {
        Dialect {
            name: "positive-qumo",
            nonlinearity: NonLinearity::step_half(),
            wall: Wall::positive(),
            bias: <T as SolverFloat>::from_f64(0.5),
        }
    }

    /// Binary coordinates in `{0, 1}` via `step_half`, walls at `[-1, 1]`,
    /// restoring term centered at one half.
    pub fn qumo() -> Self {
        Dialect {
            name: "qumo",
            nonlinearity: NonLinearity::step_half(),
            wall: Wall::ising(),
            bias: <T as SolverFloat>::from_f64(0.5),
        }
    }
}

/// Hooks into the kernel loop. The default implementations do nothing, so a
/// plain `NoopObserver` is the "no hook" case.
pub trait KernelObserver<T: SolverFloat> {
    /// Invoked before each step; may perturb the live gradient and momentum
    /// vectors (e.g. to inject noise per trajectory).
    fn adjust_parameters(
        &mut self,
        _gradient: &mut DVector<T>,
        _momentum: &mut DVector<T>,
        _annealing_live: &DVector<T>,
    ) {
    }

    /// Invoked after each completed step with the pre-update state snapshot;
    /// used by sample tracers.
    fn after_iteration(&mut self, _iteration: usize, _state: &DMatrix<T>) {}
}

pub struct NoopObserver;

impl<T: SolverFloat> KernelObserver<T> for NoopObserver {}

/// Run `iterations` fused update steps over every trajectory in the
/// workspace, then write the reported spins.
///
/// One step: apply the non-linearity to the binary block, compute the
/// interaction fields `Q * spins`, advance `x` with the gradient, annealing
/// and momentum terms (plus the external field if present), snapshot the
/// previous position into `y`, project onto the walls inelastically and
/// decrement the live annealing, clamping it at zero.
pub fn run_kernel<T: SolverFloat>(
    dialect: &Dialect<T>,
    interactions: &DMatrix<T>,
    field: Option<&DVector<T>>,
    binary: usize,
    ws: &mut Workspace<T>,
    iterations: usize,
    dt: T,
    observer: &mut dyn KernelObserver<T>,
) {
    let width = ws.width();
    let dimension = ws.dimension();
    let bias = dialect.bias;

    for iteration in 0..iterations {
        observer.adjust_parameters(&mut ws.gradient, &mut ws.momentum, &ws.annealing_live);

        ws.spins.copy_from(&ws.x);
        dialect.nonlinearity.apply_to_prefix(&mut ws.spins, binary);
        ws.fields.gemm(T::one(), interactions, &ws.spins, T::zero());

        // spins doubles as the pre-update backup of x from here on
        ws.spins.copy_from(&ws.x);

        for j in 0..width {
            let drive = dt * ws.gradient[j];
            let restore = dt * ws.annealing_live[j];
            let inertia = ws.momentum[j];
            let mut column = ws.x.column_mut(j);
            for i in 0..dimension {
                let current = column[i];
                column[i] = current + drive * ws.fields[(i, j)] - restore * (current - bias)
                    + inertia * (current - ws.y[(i, j)]);
            }
            if let Some(field) = field {
                column.axpy(drive, field, T::one());
            }
        }

        ws.y.copy_from(&ws.spins);
        dialect.wall.project_inelastic(&mut ws.x, &mut ws.y);

        for j in 0..width {
            let next = ws.annealing_live[j] - ws.delta[j];
            ws.annealing_live[j] = if next > T::zero() { next } else { T::zero() };
        }

        observer.after_iteration(iteration, &ws.spins);
    }

    ws.spins.copy_from(&ws.x);
    dialect.nonlinearity.apply_to_prefix(&mut ws.spins, binary);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Setup;
    use nalgebra::{DMatrix, dvector};
    use pretty_assertions::assert_eq;

    fn quiet_workspace(dimension: usize, annealing: &[f64], delta: &[f64]) -> Workspace<f64> {
        let width = annealing.len();
        let mut ws = Workspace::new(dimension, width);
        for j in 0..width {
            ws.annealing_live[j] = annealing[j];
            ws.delta[j] = delta[j];
        }
        ws
    }

    #[test]
    fn annealing_decrements_to_exactly_zero() {
        // constant inputs otherwise: zero interactions keep the dynamics inert
        let dialect: Dialect<f64> = Dialect::mixed_ising();
        let q = DMatrix::zeros(2, 2);
        let mut ws = quiet_workspace(2, &[0.5, 1.0], &[0.05, 0.1]);
        run_kernel(&dialect, &q, None, 2, &mut ws, 10, 0.5, &mut NoopObserver);
        assert_eq!(ws.annealing_live, dvector![0.0, 0.0]);
    }

    #[test]
    fn annealing_never_goes_negative() {
        let dialect: Dialect<f64> = Dialect::mixed_ising();
        let q = DMatrix::zeros(1, 1);
        let mut ws = quiet_workspace(1, &[0.3], &[0.2]);
        run_kernel(&dialect, &q, None, 1, &mut ws, 7, 0.5, &mut NoopObserver);
        assert_eq!(ws.annealing_live, dvector![0.0]);
    }

    #[test]
    fn annealing_matches_closed_form_partway() {
        let dialect: Dialect<f64> = Dialect::mixed_ising();
        let q = DMatrix::zeros(2, 2);
        let mut ws = quiet_workspace(2, &[1.0, 0.8], &[0.05, 0.1]);
        run_kernel(&dialect, &q, None, 2, &mut ws, 4, 0.5, &mut NoopObserver);
        // max(start - K * delta, 0)
        assert_eq!(ws.annealing_live, dvector![0.8, 0.4]);
    }

    #[test]
    fn reported_spins_pass_through_the_nonlinearity() {
        let dialect: Dialect<f64> = Dialect::mixed_ising();
        let q = DMatrix::zeros(2, 2);
        let mut ws = quiet_workspace(2, &[0.0], &[0.0]);
        ws.x[(0, 0)] = 0.25;
        ws.x[(1, 0)] = -0.75;
        run_kernel(&dialect, &q, None, 2, &mut ws, 1, 0.5, &mut NoopObserver);
        assert_eq!(ws.spins[(0, 0)], 1.0);
        assert_eq!(ws.spins[(1, 0)], -1.0);
    }

    #[test]
    fn walls_confine_the_state() {
        let dialect: Dialect<f64> = Dialect::mixed_ising();
        // strong self-coupling pushes the state outward every step
        let q = nalgebra::dmatrix![0.0, 8.0; 8.0, 0.0];
        let setup = Setup::new(dvector![0.1], dvector![2.0], dvector![0.9], 0.5).unwrap();
        let mut ws = Workspace::new(2, 1);
        ws.load_setup(&setup, 0, 1);
        ws.set_annealing_decrement(50);
        ws.x[(0, 0)] = 0.6;
        ws.x[(1, 0)] = 0.4;
        run_kernel(&dialect, &q, None, 0, &mut ws, 50, 0.5, &mut NoopObserver);
        assert!(ws.x.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn observer_sees_every_iteration() {
        struct Counter(usize);
        impl KernelObserver<f64> for Counter {
            fn after_iteration(&mut self, _iteration: usize, _state: &DMatrix<f64>) {
                self.0 += 1;
            }
        }

        let dialect: Dialect<f64> = Dialect::qumo();
        let q = DMatrix::zeros(1, 1);
        let mut ws = quiet_workspace(1, &[0.1], &[0.01]);
        let mut counter = Counter(0);
        run_kernel(&dialect, &q, None, 1, &mut ws, 12, 0.5, &mut counter);
        assert_eq!(counter.0, 12);
    }
}
