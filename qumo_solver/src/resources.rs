//! Heuristic resource estimates from problem size and time budget.

use std::{sync::LazyLock, time::Duration};

use crate::engine::EngineKind;

/// What one search phase is allotted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseResources {
    /// Random restarts per configuration.
    pub samples: usize,
    /// Kernel iterations per trajectory.
    pub iterations: usize,
    /// Configurations kept for the next phase.
    pub points_to_save: usize,
    /// Wall-clock share of the total time limit.
    pub budget: Duration,
}

pub fn resources_phase1(dimension: usize, time_limit: Duration, fraction: f64) -> PhaseResources {
    let seconds = time_limit.as_secs_f64();
    let (iterations, samples) = if dimension > 5000 && seconds <= 100.0 {
        (50, 10)
    } else if dimension < 1000 {
        (100, 20)
    } else if dimension < 5000 {
        (200, 20)
    } else if dimension < 10000 {
        (400, 20)
    } else {
        (500, 20)
    };
    PhaseResources {
        samples,
        iterations,
        points_to_save: 3000,
        budget: time_limit.mul_f64(fraction),
    }
}

pub fn resources_phase2(dimension: usize, time_limit: Duration, fraction: f64) -> PhaseResources {
    let seconds = time_limit.as_secs_f64();
    let (iterations, samples) = if dimension > 5000 && seconds <= 300.0 {
        (500, 10)
    } else if dimension < 1000 {
        (200, 20)
    } else if dimension < 5000 {
        (400, 20)
    } else if dimension < 10000 {
        (800, 20)
    } else {
        (1000, 20)
    };
    PhaseResources {
        samples,
        iterations,
        points_to_save: 100,
        budget: time_limit.mul_f64(fraction),
    }
}

/// Trajectories evaluated per kernel invocation. The GPU curve is an
/// empirical fit of device occupancy against problem size.
pub fn optimal_batch_size(kind: EngineKind, dimension: usize) -> usize {
    match kind {
        EngineKind::Cpu => 100,
        EngineKind::Gpu => {
            let fitted = 6.0e7 * (dimension.max(1) as f64).powf(-1.381);
            (fitted.ceil() as usize).max(1)
        }
    }
}

static CPU_THREADS: LazyLock<usize> = LazyLock::new(|| {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    available.saturating_sub(4).max(1)
});

/// Worker fan-out for CPU exploration, leaving headroom for the OS and the
/// watchdog. Evaluated once per process.
pub fn max_cpu_threads() -> usize {
    *CPU_THREADS
}
