use nalgebra::RealField;

/// Element type of the sampler state.
///
/// The kernel is generic over the compute type; energies and the spectral
/// normalizer always work on widened `f64` copies of the problem data, so the
/// trait only needs cheap conversions in and out of `f64`.
pub trait SolverFloat: RealField + Copy + Send + Sync + 'static {
    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;
}

impl SolverFloat for f32 {
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl SolverFloat for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_f64(self) -> f64 {
        self
    }
}
