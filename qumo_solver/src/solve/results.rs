//! Runtime records and result statistics.

use std::time::{Duration, Instant};

use nalgebra::{DMatrix, DVector};
use tracing::warn;

use crate::{
    config::Setup,
    energy::{approximately, count_min_energy_hits},
    explore::ExplorationResult,
    float::SolverFloat,
};

/// Everything one phase produced.
#[derive(Clone, Debug)]
pub struct PhaseStatistics<T: SolverFloat> {
    pub label: &'static str,
    pub started_at: Instant,
    pub stopped_at: Instant,
    pub setup: Setup<T>,
    pub results: Vec<ExplorationResult<T>>,
    /// Kernel iteration counts, one entry per orchestrator turn.
    pub iterations: Vec<usize>,
}

impl<T: SolverFloat> PhaseStatistics<T> {
    pub fn duration(&self) -> Duration {
        self.stopped_at.duration_since(self.started_at)
    }
}

/// The record `solve` hands back: per-phase statistics plus run metadata.
#[derive(Clone, Debug)]
pub struct RuntimeRecord<T: SolverFloat> {
    pub phase_one: PhaseStatistics<T>,
    pub phase_two: PhaseStatistics<T>,
    pub deep_search: PhaseStatistics<T>,
    pub normalization: f64,
    /// Worker fan-out the phases ran with.
    pub threads: usize,
    pub started_at: Instant,
    pub stopped_at: Instant,
}

impl<T: SolverFloat> RuntimeRecord<T> {
    pub fn phases(&self) -> [&PhaseStatistics<T>; 3] {
        [&self.phase_one, &self.phase_two, &self.deep_search]
    }

    pub fn duration(&self) -> Duration {
        self.stopped_at.duration_since(self.started_at)
    }
}

/// The best objective across all phases, with the configuration that
/// produced it.
#[derive(Clone, Debug)]
pub struct PhaseBest<T: SolverFloat> {
    pub objective: f64,
    pub assignment: DVector<T>,
    pub annealing: f64,
    pub gradient: f64,
    pub momentum: f64,
    pub phase: &'static str,
}

/// Column of the first entry approximately equal to the matrix minimum, in
/// column-major walk order.
fn column_of_first_minimum(measurements: &DMatrix<f64>) -> Option<usize> {
    if measurements.is_empty() {
        return None;
    }
    let minimum = measurements.iter().copied().fold(f64::INFINITY, f64::min);
    for j in 0..measurements.ncols() {
        if measurements
            .column(j)
            .iter()
            .any(|value| approximately(*value, minimum))
        {
            return Some(j);
        }
    }
    None
}

/// Walk every phase's results tracking the minimum objective; the
/// originating configuration is inferred from the first minimum in the
/// measurement matrix of the winning result.
pub fn find_best<T: SolverFloat>(record: &RuntimeRecord<T>) -> Option<PhaseBest<T>> {
    let mut best: Option<PhaseBest<T>> = None;
    for phase in record.phases() {
        for result in &phase.results {
            let objective = result.best.objective;
            if !objective.is_finite() {
                continue;
            }
            if best
                .as_ref()
                .is_none_or(|current| objective < current.objective)
            {
                let configuration = column_of_first_minimum(&result.measurements)
                    .filter(|column| *column < phase.setup.len())
                    .map(|column| phase.setup.configuration(column));
                let (annealing, gradient, momentum) = configuration.unwrap_or((0.0, 0.0, 0.0));
                best = Some(PhaseBest {
                    objective,
                    assignment: result.best.assignment.clone(),
                    annealing,
                    gradient,
                    momentum,
                    phase: phase.label,
                });
            }
        }
    }
    best
}

/// [`find_best`] plus per-configuration success statistics over the deep
/// search.
#[derive(Clone, Debug)]
pub struct BestConfiguration<T: SolverFloat> {
    pub best: PhaseBest<T>,
    /// Fraction of deep-search energies that reached the best objective.
    pub success_rate: f64,
    /// Deep-search run with the highest success rate, if any run measured.
    pub best_run: Option<usize>,
}

pub fn search_for_best_configuration<T: SolverFloat>(
    record: &RuntimeRecord<T>,
) -> Option<BestConfiguration<T>> {
    let best = find_best(record)?;
    let mut total_hits = 0usize;
    let mut total_samples = 0usize;
    let mut best_run = None;
    let mut best_run_rate = -1.0;
    for (run, result) in record.deep_search.results.iter().enumerate() {
        let samples = result.measurements.len();
        if samples == 0 {
            continue;
        }
        let hits = result
            .measurements
            .iter()
            .filter(|value| approximately(**value, best.objective))
            .count();
        total_hits += hits;
        total_samples += samples;
        let rate = hits as f64 / samples as f64;
        if rate > best_run_rate {
            best_run_rate = rate;
            best_run = Some(run);
        }
    }
    let success_rate = if total_samples > 0 {
        total_hits as f64 / total_samples as f64
    } else {
        0.0
    };
    Some(BestConfiguration {
        best,
        success_rate,
        best_run,
    })
}

/// Expected wall time to reach the target success probability by repeating
/// a trial that succeeds with probability `p` and costs `t`.
pub fn time_to_solution(p: f64, t: f64, target: f64) -> f64 {
    if p >= target {
        t
    } else if p > 0.0 {
        t * (1.0 - target).ln() / (1.0 - p).ln()
    } else {
        f64::INFINITY
    }
}

/// Same repetition formula, counting operations instead of seconds.
pub fn num_operations_to_solution(p: f64, operations: f64, target: f64) -> f64 {
    if p >= target {
        operations
    } else if p > 0.0 {
        operations * (1.0 - target).ln() / (1.0 - p).ln()
    } else {
        f64::INFINITY
    }
}

/// Aggregate statistics of the deep search.
#[derive(Clone, Debug)]
pub struct SolverSummary {
    pub best_objective: f64,
    pub num_samples: usize,
    pub total_iterations: u64,
    pub success_rate: f64,
    pub time_per_sample: f64,
    pub time_to_solution: f64,
    pub operations_to_solution: f64,
}

const SUCCESS_TARGET: f64 = 0.99;

/// Summarize the deep search: sample and iteration totals, success rate
/// against the global minimum, and the derived time/operations to solution.
/// Returns `None` (with a warning) when the deep search never ran.
pub fn get_solver_results_summary<T: SolverFloat>(
    record: &RuntimeRecord<T>,
) -> Option<SolverSummary> {
    let deep = &record.deep_search;
    if deep.results.is_empty() || deep.iterations.is_empty() {
        warn!("deep search produced no runs; no summary available");
        return None;
    }
    let best = find_best(record)?;

    let mut num_samples = 0usize;
    let mut total_iterations = 0u64;
    let mut global_minimum = f64::INFINITY;
    for (i, result) in deep.results.iter().enumerate() {
        let samples = result.measurements.len();
        num_samples += samples;
        // workers fan out `threads` results per orchestrator turn
        let turn = (i / record.threads.max(1)).min(deep.iterations.len() - 1);
        total_iterations += samples as u64 * deep.iterations[turn] as u64;
        if let Some(run_min) = result.measurements.iter().copied().reduce(f64::min) {
            global_minimum = global_minimum.min(run_min);
        }
    }
    if num_samples == 0 {
        warn!("deep search measured no samples; no summary available");
        return None;
    }

    let mut hit_count = 0usize;
    for result in &deep.results {
        let run_min = result.measurements.iter().copied().reduce(f64::min);
        if run_min.is_some_and(|value| approximately(value, global_minimum)) {
            hit_count += count_min_energy_hits(&result.measurements)
                .into_iter()
                .sum::<usize>();
        }
    }

    let success_rate = hit_count as f64 / num_samples as f64;
    let time_per_sample = deep.duration().as_secs_f64() / num_samples as f64;
    let operations_per_sample = total_iterations as f64 / num_samples as f64;
    Some(SolverSummary {
        best_objective: best.objective,
        num_samples,
        total_iterations,
        success_rate,
        time_per_sample,
        time_to_solution: time_to_solution(success_rate, time_per_sample, SUCCESS_TARGET),
        operations_to_solution: num_operations_to_solution(
            success_rate,
            operations_per_sample,
            SUCCESS_TARGET,
        ),
    })
}
