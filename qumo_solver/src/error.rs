use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("invalid shape: {reason}")]
    InvalidShape { reason: String },

    #[error("invalid range: {reason}")]
    InvalidRange { reason: String },

    #[error("time budget must be at least one second, got {seconds:.3}s")]
    InvalidTimeout { seconds: f64 },

    #[error("no compute engines registered")]
    NoEngines,

    #[error("eigenvalue iteration did not converge after {attempts} attempts")]
    NumericalDegeneracy { attempts: usize },

    #[error("configuration space produced no trajectories")]
    EmptyConfig,
}

impl SolverError {
    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        SolverError::InvalidShape {
            reason: reason.into(),
        }
    }

    pub(crate) fn range(reason: impl Into<String>) -> Self {
        SolverError::InvalidRange {
            reason: reason.into(),
        }
    }
}
