//! A batched, multi-phase heuristic solver for quadratic unconstrained
//! mixed optimization (QUMO).
//!
//! Many independent trajectories evolve in parallel under gradient descent
//! with momentum, an annealing schedule, element-wise non-linearities and
//! inelastic walls. Three dialects (`solve`, `solve_positive`, `solve_qumo`)
//! share one orchestrator: a Sobol sweep of the hyperparameter box, a pruned
//! re-exploration, and a timed deep search on the best configurations.

pub mod config;
pub mod energy;
pub mod engine;
pub mod error;
pub mod explore;
pub mod float;
pub mod model;
pub mod pool;
pub mod problem;
pub mod resources;
pub mod sampler;
pub mod solve;
pub mod spectrum;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use crate::{
        config::{ConfigurationSpace, Interval, Setup, SobolSequence, sobol_sample},
        energy::{calculate, calculate_into, count_min_energy_hits},
        engine::{Engine, EngineKind, LocalCpu, best_engine, current_engine, engines,
                 register_engine, set_current_engine},
        error::SolverError,
        explore::{
            BestAssignment, BestFound, Collector, ExplorationResult, FinalAssignment,
            IterationsChooser, explore,
        },
        float::SolverFloat,
        model::{MixedIsing, cut_value, graph_cut_from_hamiltonian, maxcut_ising},
        pool::{CancellationToken, run_for},
        problem::Problem,
        resources::{
            PhaseResources, max_cpu_threads, optimal_batch_size, resources_phase1,
            resources_phase2,
        },
        sampler::{
            Dialect, KernelObserver, NonLinearity, NonLinearityRegistry, NoopObserver, Wall,
            Workspace, run_kernel,
        },
        solve::{
            BestConfiguration, PhaseBest, PhaseStatistics, RuntimeRecord, SolveOptions,
            SolverSummary, find_best, get_solver_results_summary, num_operations_to_solution,
            search_for_best_configuration, solve, solve_positive, solve_qumo, solve_with_dialect,
            time_to_solution,
        },
        spectrum::normalization_factor,
    };

    pub use nalgebra;
}
