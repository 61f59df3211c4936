//! Process-wide registry of compute backends.
//!
//! `LocalCpu` is always present as the fallback; additional backends
//! register themselves during their initialization, one entry per detected
//! device, at a numerically lower (= stronger) priority.

use std::sync::{Arc, LazyLock, Mutex};

use crate::{error::SolverError, resources};

/// Priority of the always-available CPU fallback.
pub const CPU_PRIORITY: i32 = 1000;

/// Priority accelerator backends register at; lower values rank first.
pub const ACCELERATOR_PRIORITY: i32 = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineKind {
    Cpu,
    Gpu,
}

/// A compute backend: where batches run and how wide they should be.
pub trait Engine: Send + Sync {
    fn name(&self) -> String;

    fn kind(&self) -> EngineKind;

    fn optimal_batch_size(&self, dimension: usize) -> usize {
        resources::optimal_batch_size(self.kind(), dimension)
    }

    /// Exploration fan-out: device-serialized backends run one worker.
    fn worker_threads(&self) -> usize {
        match self.kind() {
            EngineKind::Cpu => resources::max_cpu_threads(),
            EngineKind::Gpu => 1,
        }
    }

    /// Invoked once per pool worker before exploration; device backends
    /// switch their thread-local context here.
    fn prepare_worker(&self) {}
}

pub struct LocalCpu;

impl Engine for LocalCpu {
    fn name(&self) -> String {
        "local-cpu".to_owned()
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Cpu
    }
}

struct Registered {
    priority: i32,
    engine: Arc<dyn Engine>,
}

#[derive(Default)]
struct Registry {
    entries: Vec<Registered>,
    current: Option<Arc<dyn Engine>>,
}

impl Registry {
    fn best(&self) -> Result<Arc<dyn Engine>, SolverError> {
        self.entries
            .iter()
            .min_by_key(|entry| entry.priority)
            .map(|entry| Arc::clone(&entry.engine))
            .ok_or(SolverError::NoEngines)
    }
}

static REGISTRY: LazyLock<Mutex<Registry>> = LazyLock::new(|| {
    Mutex::new(Registry {
        entries: vec![Registered {
            priority: CPU_PRIORITY,
            engine: Arc::new(LocalCpu),
        }],
        current: None,
    })
});

fn registry() -> std::sync::MutexGuard<'static, Registry> {
    REGISTRY.lock().expect("engine registry poisoned")
}

pub fn register_engine(engine: Arc<dyn Engine>, priority: i32) {
    registry().entries.push(Registered { priority, engine });
}

/// All registered engines in registration order.
pub fn engines() -> Vec<Arc<dyn Engine>> {
    registry()
        .entries
        .iter()
        .map(|entry| Arc::clone(&entry.engine))
        .collect()
}

/// The highest-priority engine (lowest priority value; first registration
/// wins ties).
pub fn best_engine() -> Result<Arc<dyn Engine>, SolverError> {
    registry().best()
}

/// The process-wide selection, defaulting to [`best_engine`].
pub fn current_engine() -> Result<Arc<dyn Engine>, SolverError> {
    let guard = registry();
    match &guard.current {
        Some(engine) => Ok(Arc::clone(engine)),
        None => guard.best(),
    }
}

pub fn set_current_engine(engine: Arc<dyn Engine>) {
    registry().current = Some(engine);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_fallback_is_always_listed() {
        let listed = engines();
        assert!(listed.iter().any(|engine| engine.kind() == EngineKind::Cpu));
        assert!(best_engine().is_ok());
    }

    #[test]
    fn lower_priority_value_ranks_first() {
        let mut registry = Registry::default();
        registry.entries.push(Registered {
            priority: CPU_PRIORITY,
            engine: Arc::new(LocalCpu),
        });
        struct Accelerated;
        impl Engine for Accelerated {
            fn name(&self) -> String {
                "accelerated".to_owned()
            }
            fn kind(&self) -> EngineKind {
                EngineKind::Gpu
            }
        }
        registry.entries.push(Registered {
            priority: ACCELERATOR_PRIORITY,
            engine: Arc::new(Accelerated),
        });
        assert_eq!(registry.best().unwrap().name(), "accelerated");
    }

    #[test]
    fn empty_registry_reports_no_engines() {
        let registry = Registry::default();
        assert!(matches!(registry.best(), Err(SolverError::NoEngines)));
    }

    #[test]
    fn current_engine_follows_the_selection() {
        set_current_engine(Arc::new(LocalCpu));
        assert_eq!(current_engine().unwrap().kind(), EngineKind::Cpu);
    }

    #[test]
    fn gpu_engines_run_a_single_worker() {
        struct Accelerated;
        impl Engine for Accelerated {
            fn name(&self) -> String {
                "accelerated".to_owned()
            }
            fn kind(&self) -> EngineKind {
                EngineKind::Gpu
            }
        }
        assert_eq!(Accelerated.worker_threads(), 1);
        assert!(LocalCpu.worker_threads() >= 1);
    }
}
