//! The exploration driver: a batched sweep of the configuration space under
//! a cancellation token.

use nalgebra::DMatrix;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::{
    config::Setup,
    energy,
    error::SolverError,
    float::SolverFloat,
    pool::CancellationToken,
    problem::Problem,
    sampler::{Dialect, NoopObserver, Workspace, run_kernel},
};

pub mod collector;

pub use collector::{BestAssignment, BestFound, Collector, FinalAssignment};

/// Per-batch iteration count: a fixed value or an inclusive uniform draw.
pub enum IterationsChooser {
    Fixed(usize),
    Uniform { lo: usize, hi: usize, rng: StdRng },
}

impl IterationsChooser {
    pub fn fixed(iterations: usize) -> Self {
        IterationsChooser::Fixed(iterations)
    }

    pub fn uniform(lo: usize, hi: usize, seed: u64) -> Self {
        IterationsChooser::Uniform {
            lo,
            hi,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next(&mut self) -> usize {
        match self {
            IterationsChooser::Fixed(iterations) => (*iterations).max(1),
            IterationsChooser::Uniform { lo, hi, rng } => {
                let lo = (*lo).max(1);
                let hi = (*hi).max(lo);
                rng.random_range(lo..=hi)
            }
        }
    }
}

/// Outcome of one exploration sweep.
#[derive(Clone, Debug)]
pub struct ExplorationResult<T: SolverFloat> {
    pub best: BestFound<T>,
    /// Per-trajectory energies reshaped to (repetitions, completed
    /// configurations); cancelled sweeps hold a truncated matrix.
    pub measurements: DMatrix<f64>,
    pub collector_info: Option<DMatrix<T>>,
    /// Seed of the sweep-local RNG, for reproducing a single sweep.
    pub seed: u64,
}

/// Sweep the whole setup in batches of `batch_size` trajectories.
///
/// Each triple of `initial_setup` is replicated `repetitions` times
/// consecutively; every batch draws fresh random initial states, runs the
/// kernel for `iterations.next()` steps and streams its energies into the
/// collector. The token is consulted between batches only, and the first
/// batch runs even when the token is already flipped, so a cancelled sweep
/// still returns a well-formed result.
#[allow(clippy::too_many_arguments)]
pub fn explore<T: SolverFloat, C: Collector<T>>(
    dialect: &Dialect<T>,
    problem: &Problem<T>,
    initial_setup: &Setup<T>,
    batch_size: usize,
    token: &CancellationToken,
    iterations: &mut IterationsChooser,
    repetitions: usize,
    rng: &mut StdRng,
    collector: &mut C,
) -> Result<ExplorationResult<T>, SolverError> {
    if initial_setup.is_empty() || repetitions == 0 {
        return Err(SolverError::EmptyConfig);
    }
    if batch_size == 0 {
        return Err(SolverError::range("batch size must be positive".to_owned()));
    }

    let setup = initial_setup.repeated(repetitions);
    let trajectories = setup.len();
    let dimension = problem.dimension();

    let seed: u64 = rng.random();
    let mut local = StdRng::seed_from_u64(seed);

    let mut ws: Workspace<T> = Workspace::new(dimension, batch_size);
    let mut energies = vec![0.0f64; trajectories.max(batch_size)];

    let mut current = 0;
    let mut completed_trajectories = 0;
    while current < trajectories {
        if current > 0 && token.is_cancelled() {
            debug!(current, trajectories, "exploration cancelled between batches");
            break;
        }
        let last = (current + batch_size).min(trajectories);
        let count = last - current;

        ws.load_setup(&setup, current, count);
        ws.randomize_state(&mut local);
        let steps = iterations.next();
        ws.set_annealing_decrement(steps);

        run_kernel(
            dialect,
            problem.interactions(),
            problem.field(),
            problem.binary(),
            &mut ws,
            steps,
            setup.dt,
            &mut NoopObserver,
        );

        energy::calculate_into(
            &mut energies[current..last],
            &ws.spins,
            problem.interactions_eval(),
            problem.field_eval(),
        )?;
        collector.update(
            &energies[current..last],
            ws.spins.view((0, 0), (dimension, count)),
        );

        completed_trajectories = last;
        current = last;
        std::thread::yield_now();
    }

    let completed_measurements = completed_trajectories / repetitions;
    let valid = &energies[..completed_measurements * repetitions];
    let measurements = DMatrix::from_column_slice(repetitions, completed_measurements, valid);

    collector.finish();
    Ok(ExplorationResult {
        best: collector.retrieve(),
        collector_info: collector.info(),
        measurements,
        seed,
    })
}
