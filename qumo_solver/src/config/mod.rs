//! Hyperparameter space and per-trajectory setups.

use nalgebra::DVector;

use crate::{error::SolverError, float::SolverFloat};

pub mod sobol;

pub use sobol::SobolSequence;

/// A closed interval `[lo, hi]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    pub fn new(lo: f64, hi: f64) -> Result<Self, SolverError> {
        if !lo.is_finite() || !hi.is_finite() {
            return Err(SolverError::range(format!(
                "interval bounds must be finite, got [{lo}, {hi}]"
            )));
        }
        if lo > hi {
            return Err(SolverError::range(format!(
                "interval is inverted: [{lo}, {hi}]"
            )));
        }
        Ok(Interval { lo, hi })
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    /// Map `t` in `[0, 1)` affinely into the interval.
    fn lerp(&self, t: f64) -> f64 {
        self.lo + t * self.width()
    }
}

/// The sampled hyperparameter box: annealing and gradient coefficients are
/// non-negative, momentum lives in `[0, 1)`.
#[derive(Clone, Debug)]
pub struct ConfigurationSpace {
    pub annealing: Interval,
    pub gradient: Interval,
    pub momentum: Interval,
}

impl ConfigurationSpace {
    pub fn new(
        annealing: Interval,
        gradient: Interval,
        momentum: Interval,
    ) -> Result<Self, SolverError> {
        if annealing.lo < 0.0 {
            return Err(SolverError::range(format!(
                "annealing interval must be non-negative, got lo = {}",
                annealing.lo
            )));
        }
        if gradient.lo < 0.0 {
            return Err(SolverError::range(format!(
                "gradient interval must be non-negative, got lo = {}",
                gradient.lo
            )));
        }
        if momentum.lo < 0.0 || momentum.hi >= 1.0 {
            return Err(SolverError::range(format!(
                "momentum interval must sit inside [0, 1), got [{}, {}]",
                momentum.lo, momentum.hi
            )));
        }
        Ok(ConfigurationSpace {
            annealing,
            gradient,
            momentum,
        })
    }
}

/// Draw `count` (annealing, gradient, momentum) triples from a Sobol stream
/// over the configuration box. The first `count` points are skipped as
/// warm-up before any triple is emitted.
pub fn sobol_sample(
    count: usize,
    space: &ConfigurationSpace,
) -> (DVector<f64>, DVector<f64>, DVector<f64>) {
    let mut sobol = SobolSequence::new(3);
    sobol.skip(count);

    let mut annealing = DVector::zeros(count);
    let mut gradient = DVector::zeros(count);
    let mut momentum = DVector::zeros(count);
    let mut point = [0.0; 3];
    for k in 0..count {
        sobol.next_point(&mut point);
        annealing[k] = space.annealing.lerp(point[0]);
        gradient[k] = space.gradient.lerp(point[1]);
        momentum[k] = space.momentum.lerp(point[2]);
    }
    (annealing, gradient, momentum)
}

/// Per-trajectory coefficient triples plus the shared time step.
///
/// Immutable once built; phases derive new setups by replication,
/// reordering and truncation.
#[derive(Clone, Debug)]
pub struct Setup<T: SolverFloat> {
    pub annealing: DVector<T>,
    pub gradient: DVector<T>,
    pub momentum: DVector<T>,
    pub dt: T,
}

impl<T: SolverFloat> Setup<T> {
    pub fn new(
        annealing: DVector<T>,
        gradient: DVector<T>,
        momentum: DVector<T>,
        dt: T,
    ) -> Result<Self, SolverError> {
        if annealing.len() != gradient.len() || annealing.len() != momentum.len() {
            return Err(SolverError::shape(format!(
                "setup vectors differ in length: annealing {}, gradient {}, momentum {}",
                annealing.len(),
                gradient.len(),
                momentum.len()
            )));
        }
        if dt <= T::zero() {
            return Err(SolverError::range("dt must be positive".to_owned()));
        }
        Ok(Setup {
            annealing,
            gradient,
            momentum,
            dt,
        })
    }

    /// Convert sampled `f64` coefficient vectors into the compute type.
    pub fn from_f64(
        annealing: &DVector<f64>,
        gradient: &DVector<f64>,
        momentum: &DVector<f64>,
        dt: f64,
    ) -> Result<Self, SolverError> {
        Setup::new(
            annealing.map(<T as SolverFloat>::from_f64),
            gradient.map(<T as SolverFloat>::from_f64),
            momentum.map(<T as SolverFloat>::from_f64),
            <T as SolverFloat>::from_f64(dt),
        )
    }

    pub fn len(&self) -> usize {
        self.annealing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replicate each triple `repetitions` times consecutively, so every
    /// hyperparameter point is evaluated from several random initial states.
    pub fn repeated(&self, repetitions: usize) -> Setup<T> {
        let expand = |v: &DVector<T>| {
            DVector::from_iterator(
                v.len() * repetitions,
                v.iter().flat_map(|value| {
                    std::iter::repeat_n(*value, repetitions)
                }),
            )
        };
        Setup {
            annealing: expand(&self.annealing),
            gradient: expand(&self.gradient),
            momentum: expand(&self.momentum),
            dt: self.dt,
        }
    }

    /// Reorder the triples along `order` (a permutation of `0..len`).
    pub fn reordered(&self, order: &[usize]) -> Setup<T> {
        debug_assert_eq!(order.len(), self.len());
        let select = |v: &DVector<T>| {
            DVector::from_iterator(order.len(), order.iter().map(|&idx| v[idx]))
        };
        Setup {
            annealing: select(&self.annealing),
            gradient: select(&self.gradient),
            momentum: select(&self.momentum),
            dt: self.dt,
        }
    }

    /// Keep only the first `count` triples.
    pub fn truncated(&self, count: usize) -> Setup<T> {
        let count = count.min(self.len());
        Setup {
            annealing: self.annealing.rows(0, count).into_owned(),
            gradient: self.gradient.rows(0, count).into_owned(),
            momentum: self.momentum.rows(0, count).into_owned(),
            dt: self.dt,
        }
    }

    /// The triple at `index`, widened for reporting.
    pub fn configuration(&self, index: usize) -> (f64, f64, f64) {
        (
            self.annealing[index].to_f64(),
            self.gradient[index].to_f64(),
            self.momentum[index].to_f64(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn unit_space() -> ConfigurationSpace {
        ConfigurationSpace::new(
            Interval::new(0.01, 1.0).unwrap(),
            Interval::new(0.01, 1.0).unwrap(),
            Interval::new(0.95, 0.99).unwrap(),
        )
        .unwrap()
    }

    #[test_case(-0.1, 1.0, 0.0, 1.0, 0.0, 0.5; "negative annealing")]
    #[test_case(0.0, 1.0, -0.5, 1.0, 0.0, 0.5; "negative gradient")]
    #[test_case(0.0, 1.0, 0.0, 1.0, 0.5, 1.0; "momentum reaching one")]
    fn rejects_out_of_range_spaces(
        a_lo: f64,
        a_hi: f64,
        g_lo: f64,
        g_hi: f64,
        m_lo: f64,
        m_hi: f64,
    ) {
        let err = ConfigurationSpace::new(
            Interval::new(a_lo, a_hi).unwrap(),
            Interval::new(g_lo, g_hi).unwrap(),
            Interval::new(m_lo, m_hi).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::InvalidRange { .. }));
    }

    #[test]
    fn rejects_inverted_interval() {
        assert!(matches!(
            Interval::new(2.0, 1.0).unwrap_err(),
            SolverError::InvalidRange { .. }
        ));
    }

    #[test]
    fn sobol_triples_land_in_their_intervals() {
        let space = unit_space();
        let (annealing, gradient, momentum) = sobol_sample(256, &space);
        assert_eq!(annealing.len(), 256);
        assert!(annealing.iter().all(|v| (0.01..=1.0).contains(v)));
        assert!(gradient.iter().all(|v| (0.01..=1.0).contains(v)));
        assert!(momentum.iter().all(|v| (0.95..0.99).contains(v)));
    }

    #[test]
    fn repeated_setup_replicates_consecutively() {
        let setup = Setup::new(dvector![1.0, 2.0], dvector![3.0, 4.0], dvector![0.5, 0.6], 0.5)
            .unwrap();
        let expanded = setup.repeated(3);
        assert_eq!(expanded.annealing, dvector![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        assert_eq!(expanded.momentum, dvector![0.5, 0.5, 0.5, 0.6, 0.6, 0.6]);
    }

    #[test]
    fn reorder_then_truncate_prunes_the_tail() {
        let setup = Setup::new(
            dvector![1.0, 2.0, 3.0],
            dvector![4.0, 5.0, 6.0],
            dvector![0.1, 0.2, 0.3],
            0.5,
        )
        .unwrap();
        let pruned = setup.reordered(&[2, 0, 1]).truncated(2);
        assert_eq!(pruned.annealing, dvector![3.0, 1.0]);
        assert_eq!(pruned.gradient, dvector![6.0, 4.0]);
    }

    #[test]
    fn rejects_mismatched_setup_vectors() {
        let err = Setup::new(dvector![1.0], dvector![1.0, 2.0], dvector![0.5], 0.5).unwrap_err();
        assert!(matches!(err, SolverError::InvalidShape { .. }));
    }

    #[test]
    fn rejects_non_positive_dt() {
        let err = Setup::new(dvector![1.0], dvector![1.0], dvector![0.5], 0.0).unwrap_err();
        assert!(matches!(err, SolverError::InvalidRange { .. }));
    }
}
