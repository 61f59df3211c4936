//! The three-phase orchestrator and the three solver dialect entry points.
//!
//! Phase 1 sweeps a Sobol sample of the whole configuration box, phase 2
//! re-explores the best-ranked configurations with more iterations, and the
//! deep search spends the remaining budget on the top few configurations
//! with randomized iteration counts.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::{
    config::{ConfigurationSpace, Interval, Setup, sobol_sample},
    engine::{self, Engine},
    error::SolverError,
    explore::{BestAssignment, IterationsChooser, explore},
    float::SolverFloat,
    pool::run_for,
    problem::Problem,
    resources::{resources_phase1, resources_phase2},
    sampler::Dialect,
    spectrum::{self, normalization_factor},
};

pub mod results;

pub use results::{
    BestConfiguration, PhaseBest, PhaseStatistics, RuntimeRecord, SolverSummary, find_best,
    get_solver_results_summary, num_operations_to_solution, search_for_best_configuration,
    time_to_solution,
};

/// Sobol points drawn over the configuration box before phase 1.
const SOBOL_CONFIGURATIONS: usize = 32_768;

/// Safety multiplier on the iteration-rate estimate when clipping the
/// deep-search iteration interval; empirical.
const RATE_SAFETY: f64 = 4.0;

/// Tunables of [`solve`]; the defaults match the published solver surface.
#[derive(Clone)]
pub struct SolveOptions {
    pub annealing: Interval,
    pub gradient: Interval,
    pub momentum: Interval,
    /// Inclusive interval the deep search draws iteration counts from.
    pub deep_search_iterations: (usize, usize),
    pub dt: f64,
    pub phase_1_fraction: f64,
    pub phase_2_fraction: f64,
    pub seed: u64,
    /// Overrides the process-wide engine selection.
    pub engine: Option<Arc<dyn Engine>>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            annealing: Interval { lo: 0.01, hi: 1.0 },
            gradient: Interval { lo: 0.01, hi: 1.0 },
            momentum: Interval { lo: 0.95, hi: 0.99 },
            deep_search_iterations: (500, 20_000),
            dt: 0.5,
            phase_1_fraction: 0.1,
            phase_2_fraction: 0.2,
            seed: 0,
            engine: None,
        }
    }
}

impl std::fmt::Debug for SolveOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolveOptions")
            .field("annealing", &self.annealing)
            .field("gradient", &self.gradient)
            .field("momentum", &self.momentum)
            .field("deep_search_iterations", &self.deep_search_iterations)
            .field("dt", &self.dt)
            .field("phase_1_fraction", &self.phase_1_fraction)
            .field("phase_2_fraction", &self.phase_2_fraction)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl SolveOptions {
    fn validate(&self) -> Result<ConfigurationSpace, SolverError> {
        for (name, fraction) in [
            ("phase_1_fraction", self.phase_1_fraction),
            ("phase_2_fraction", self.phase_2_fraction),
        ] {
            if !(0.0..1.0).contains(&fraction) || fraction == 0.0 {
                return Err(SolverError::range(format!(
                    "{name} must lie in (0, 1), got {fraction}"
                )));
            }
        }
        if self.phase_1_fraction + self.phase_2_fraction >= 1.0 {
            return Err(SolverError::range(format!(
                "phase fractions must leave room for the deep search, got {} + {}",
                self.phase_1_fraction, self.phase_2_fraction
            )));
        }
        let (lo, hi) = self.deep_search_iterations;
        if lo == 0 || lo > hi {
            return Err(SolverError::range(format!(
                "deep search iteration interval is invalid: [{lo}, {hi}]"
            )));
        }
        if self.dt <= 0.0 {
            return Err(SolverError::range(format!(
                "dt must be positive, got {}",
                self.dt
            )));
        }
        ConfigurationSpace::new(
            Interval::new(self.annealing.lo, self.annealing.hi)?,
            Interval::new(self.gradient.lo, self.gradient.hi)?,
            Interval::new(self.momentum.lo, self.momentum.hi)?,
        )
    }
}

/// Mixed-Ising dialect: binary coordinates in `{-1, 1}`.
pub fn solve<T: SolverFloat>(
    interactions: &DMatrix<T>,
    field: Option<&DVector<T>>,
    binary: usize,
    timeout: Duration,
    options: SolveOptions,
) -> Result<RuntimeRecord<T>, SolverError> {
    solve_with_dialect(
        Dialect::mixed_ising(),
        interactions,
        field,
        binary,
        timeout,
        options,
    )
}

/// Positive-QUMO dialect: binary coordinates in `{0, 1}`, walls at `[0, 1]`.
pub fn solve_positive<T: SolverFloat>(
    interactions: &DMatrix<T>,
    field: Option<&DVector<T>>,
    binary: usize,
    timeout: Duration,
    options: SolveOptions,
) -> Result<RuntimeRecord<T>, SolverError> {
    solve_with_dialect(
        Dialect::positive_qumo(),
        interactions,
        field,
        binary,
        timeout,
        options,
    )
}

/// QUMO dialect: binary coordinates in `{0, 1}`, continuous in `[-1, 1]`.
pub fn solve_qumo<T: SolverFloat>(
    interactions: &DMatrix<T>,
    field: Option<&DVector<T>>,
    binary: usize,
    timeout: Duration,
    options: SolveOptions,
) -> Result<RuntimeRecord<T>, SolverError> {
    solve_with_dialect(
        Dialect::qumo(),
        interactions,
        field,
        binary,
        timeout,
        options,
    )
}

/// The shared orchestrator; the dialect carries everything the variants
/// differ in.
pub fn solve_with_dialect<T: SolverFloat>(
    dialect: Dialect<T>,
    interactions: &DMatrix<T>,
    field: Option<&DVector<T>>,
    binary: usize,
    timeout: Duration,
    options: SolveOptions,
) -> Result<RuntimeRecord<T>, SolverError> {
    let space = options.validate()?;
    let problem = Problem::new(interactions.clone(), field.cloned(), binary)?;
    let dimension = problem.dimension();

    let started_at = Instant::now();
    let resources1 = resources_phase1(dimension, timeout, options.phase_1_fraction);
    let resources2 = resources_phase2(dimension, timeout, options.phase_2_fraction);

    let normalization = normalization_factor(
        problem.interactions_eval(),
        spectrum::DEFAULT_TOLERANCE,
        spectrum::DEFAULT_RETRIES,
    );

    let (mut annealing, mut gradient, momentum) = sobol_sample(SOBOL_CONFIGURATIONS, &space);
    for k in 0..SOBOL_CONFIGURATIONS {
        annealing[k] /= gradient[k];
        gradient[k] = 1.0 / (gradient[k] * normalization);
    }

    let engine = match &options.engine {
        Some(engine) => Arc::clone(engine),
        None => engine::current_engine()?,
    };
    let batch_size = engine.optimal_batch_size(dimension);
    let threads = engine.worker_threads();
    debug!(
        dialect = dialect.name,
        dimension,
        batch_size,
        threads,
        normalization,
        "starting three-phase search"
    );

    // Phase 1: the full Sobol sample at few iterations.
    let setup1 = Setup::from_f64(&annealing, &gradient, &momentum, options.dt)?;
    let phase_one = run_phase(
        "phase 1",
        &dialect,
        &engine,
        &problem,
        setup1,
        batch_size,
        resources1.budget,
        resources1.iterations,
        resources1.samples,
        threads,
        options.seed.wrapping_add(1),
    )?;

    // Phase 2: prune to the best-ranked configurations and look closer.
    let order1 = ranking_permutation(&phase_one.results[0].measurements, phase_one.setup.len());
    let setup2 = phase_one
        .setup
        .reordered(&order1)
        .truncated(resources1.points_to_save);
    let phase_two = run_phase(
        "phase 2",
        &dialect,
        &engine,
        &problem,
        setup2,
        batch_size,
        resources2.budget,
        resources2.iterations,
        resources2.samples,
        threads,
        options.seed.wrapping_add(2),
    )?;

    // Deep search: the top configurations under the remaining wall clock.
    let order2 = ranking_permutation(&phase_two.results[0].measurements, phase_two.setup.len());
    let deep_setup = phase_two
        .setup
        .reordered(&order2)
        .truncated(resources2.points_to_save);
    let deep_search = run_deep_search(
        &dialect,
        &engine,
        &problem,
        deep_setup,
        batch_size,
        threads,
        started_at,
        timeout,
        phase_rate_seed(&phase_two, batch_size, resources2.iterations),
        &options,
    )?;

    let stopped_at = Instant::now();
    Ok(RuntimeRecord {
        phase_one,
        phase_two,
        deep_search,
        normalization,
        threads,
        started_at,
        stopped_at,
    })
}

/// Seconds per kernel iteration of a single batch, derived from a finished
/// phase. A phase worker sweeps many batches, so its wall time is divided
/// by the batch count it completed (recovered from its measurement matrix)
/// before dividing by the per-batch iteration count. This keeps the seed in
/// the same unit as the deep-search rate updates, whose runs are sized to a
/// single batch.
fn phase_rate_seed<T: SolverFloat>(
    phase: &PhaseStatistics<T>,
    batch_size: usize,
    iterations: usize,
) -> f64 {
    let measurements = &phase.results[0].measurements;
    let completed_trajectories = measurements.nrows() * measurements.ncols();
    let batches = completed_trajectories.div_ceil(batch_size.max(1)).max(1);
    phase.duration().as_secs_f64() / (batches * iterations.max(1)) as f64
}

/// Rank the measured configurations by mean energy, ascending and stable;
/// configurations the budget never reached keep their order behind them.
fn ranking_permutation(measurements: &DMatrix<f64>, total: usize) -> Vec<usize> {
    let completed = measurements.ncols().min(total);
    let mut ranked: Vec<usize> = (0..completed).collect();
    let means: Vec<f64> = (0..completed)
        .map(|j| measurements.column(j).mean())
        .collect();
    ranked.sort_by(|a, b| {
        means[*a]
            .partial_cmp(&means[*b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.extend(completed..total);
    ranked
}

#[allow(clippy::too_many_arguments)]
fn run_phase<T: SolverFloat>(
    label: &'static str,
    dialect: &Dialect<T>,
    engine: &Arc<dyn Engine>,
    problem: &Problem<T>,
    setup: Setup<T>,
    batch_size: usize,
    budget: Duration,
    iterations: usize,
    repetitions: usize,
    threads: usize,
    seed: u64,
) -> Result<PhaseStatistics<T>, SolverError> {
    let started_at = Instant::now();
    let worker_index = AtomicU64::new(0);
    let results = run_for(
        |token| {
            engine.prepare_worker();
            let worker = worker_index.fetch_add(1, Ordering::Relaxed);
            let mut rng = StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9).wrapping_add(worker));
            let mut chooser = IterationsChooser::fixed(iterations);
            let mut collector = BestAssignment::new(problem.dimension());
            explore(
                dialect,
                problem,
                &setup,
                batch_size,
                &token,
                &mut chooser,
                repetitions,
                &mut rng,
                &mut collector,
            )
        },
        budget.max(Duration::from_secs(1)),
        threads,
    )?;
    let stopped_at = Instant::now();
    debug!(label, elapsed = ?stopped_at.duration_since(started_at), "phase finished");
    Ok(PhaseStatistics {
        label,
        started_at,
        stopped_at,
        setup,
        results,
        iterations: vec![iterations],
    })
}

#[allow(clippy::too_many_arguments)]
fn run_deep_search<T: SolverFloat>(
    dialect: &Dialect<T>,
    engine: &Arc<dyn Engine>,
    problem: &Problem<T>,
    setup: Setup<T>,
    batch_size: usize,
    threads: usize,
    started_at: Instant,
    timeout: Duration,
    initial_rate: f64,
    options: &SolveOptions,
) -> Result<PhaseStatistics<T>, SolverError> {
    let deep_started = Instant::now();
    let mut results = Vec::new();
    let mut iteration_counts = Vec::new();

    let (lo, hi) = options.deep_search_iterations;
    let repetitions = batch_size.div_ceil(setup.len().max(1)).max(1);
    // seconds per kernel iteration, seeded from phase 2
    let mut rate = initial_rate;
    let mut chooser_rng = StdRng::seed_from_u64(options.seed.wrapping_add(3));
    let mut previous_wall = 0.0;
    let mut turn: u64 = 0;

    loop {
        let remaining = timeout.saturating_sub(started_at.elapsed());
        if remaining < Duration::from_secs(1) {
            break;
        }
        let remaining_seconds = remaining.as_secs_f64();
        if previous_wall > 2.0 * remaining_seconds {
            debug!(previous_wall, remaining_seconds, "deep search out of budget");
            break;
        }

        // keep the drawn iteration count inside the remaining budget
        let affordable = if rate > 0.0 {
            ((remaining_seconds / (rate * RATE_SAFETY)).floor() as usize).max(1)
        } else {
            hi
        };
        let hi_run = hi.min(affordable).max(1);
        let lo_run = lo.clamp(1, hi_run);
        let iterations = chooser_rng.random_range(lo_run..=hi_run);

        let run_started = Instant::now();
        let worker_index = AtomicU64::new(0);
        let seed = options
            .seed
            .wrapping_add(4)
            .wrapping_add(turn.wrapping_mul(0x51_7C_C1));
        let run_results = run_for(
            |token| {
                engine.prepare_worker();
                let worker = worker_index.fetch_add(1, Ordering::Relaxed);
                let mut rng =
                    StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9).wrapping_add(worker));
                let mut chooser = IterationsChooser::fixed(iterations);
                let mut collector = BestAssignment::new(problem.dimension());
                explore(
                    dialect,
                    problem,
                    &setup,
                    batch_size,
                    &token,
                    &mut chooser,
                    repetitions,
                    &mut rng,
                    &mut collector,
                )
            },
            remaining,
            threads,
        )?;
        let wall = run_started.elapsed().as_secs_f64();

        previous_wall = wall;
        rate = 0.5 * rate + 0.5 * (wall / iterations as f64);
        results.extend(run_results);
        iteration_counts.push(iterations);
        turn += 1;
    }

    debug!(
        runs = iteration_counts.len(),
        elapsed = ?deep_started.elapsed(),
        "deep search finished"
    );
    Ok(PhaseStatistics {
        label: "deep search",
        started_at: deep_started,
        stopped_at: Instant::now(),
        setup,
        results,
        iterations: iteration_counts,
    })
}
