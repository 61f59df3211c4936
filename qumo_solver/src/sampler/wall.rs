use nalgebra::{Dim, Matrix, storage::StorageMut};

use crate::{error::SolverError, float::SolverFloat};

/// An inelastic wall: clamps state into `[lower, upper]` and, in the
/// momentum-aware forms, kills the velocity of every clamped coordinate.
///
/// A wall is a pair of constants, so a specialized projector is just a value;
/// `ising()` and `positive()` are the two bounds the dialects use.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wall<T: SolverFloat> {
    lower: T,
    upper: T,
}

impl<T: SolverFloat> Wall<T> {
    pub fn new(lower: T, upper: T) -> Result<Self, SolverError> {
        if lower > upper {
            return Err(SolverError::range(format!(
                "wall bounds are inverted: lower {lower:?} > upper {upper:?}"
            )));
        }
        Ok(Wall { lower, upper })
    }

    /// The `[-1, 1]` wall used by the Ising and QUMO dialects.
    pub fn ising() -> Self {
        Wall {
            lower: <T as SolverFloat>::from_f64(-1.0),
            upper: T::one(),
        }
    }

    /// The `[0, 1]` wall used by the positive-QUMO dialect.
    pub fn positive() -> Self {
        Wall {
            lower: T::zero(),
            upper: T::one(),
        }
    }

    pub fn lower(&self) -> T {
        self.lower
    }

    pub fn upper(&self) -> T {
        self.upper
    }

    /// Clamp every element of `x` into the wall interval.
    pub fn project<R, C, S>(&self, x: &mut Matrix<T, R, C, S>)
    where
        R: Dim,
        C: Dim,
        S: StorageMut<T, R, C>,
    {
        for value in x.iter_mut() {
            if *value > self.upper {
                *value = self.upper;
            } else if *value < self.lower {
                *value = self.lower;
            }
        }
    }

    /// Clamp `x` and zero `momentum` wherever a coordinate was clamped.
    pub fn project_with_momentum<R, C, S, S2>(
        &self,
        x: &mut Matrix<T, R, C, S>,
        momentum: &mut Matrix<T, R, C, S2>,
    ) -> Result<(), SolverError>
    where
        R: Dim,
        C: Dim,
        S: StorageMut<T, R, C>,
        S2: StorageMut<T, R, C>,
    {
        if x.shape() != momentum.shape() {
            return Err(SolverError::shape(format!(
                "state {:?} and momentum {:?} differ",
                x.shape(),
                momentum.shape()
            )));
        }
        for (value, velocity) in x.iter_mut().zip(momentum.iter_mut()) {
            if *value > self.upper {
                *value = self.upper;
                *velocity = T::zero();
            } else if *value < self.lower {
                *value = self.lower;
                *velocity = T::zero();
            }
        }
        Ok(())
    }

    /// Kernel form: clamp `x` and copy the clamped value into `y`, the
    /// previous-position buffer, so the discrete velocity `x - y` vanishes
    /// at the wall. Shapes are guaranteed equal by the workspace.
    pub(crate) fn project_inelastic<R, C, S, S2>(
        &self,
        x: &mut Matrix<T, R, C, S>,
        y: &mut Matrix<T, R, C, S2>,
    ) where
        R: Dim,
        C: Dim,
        S: StorageMut<T, R, C>,
        S2: StorageMut<T, R, C>,
    {
        for (value, previous) in x.iter_mut().zip(y.iter_mut()) {
            if *value > self.upper {
                *value = self.upper;
                *previous = self.upper;
            } else if *value < self.lower {
                *value = self.lower;
                *previous = self.lower;
            }
        }
    }
}
