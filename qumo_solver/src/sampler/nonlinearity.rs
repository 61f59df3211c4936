use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use nalgebra::{DMatrix, Dim, Matrix, storage::StorageMut};

use crate::float::SolverFloat;

/// A named element-wise map applied to the binary block of the state.
#[derive(Clone)]
pub struct NonLinearity<T: SolverFloat> {
    name: Arc<str>,
    f: Arc<dyn Fn(T) -> T + Send + Sync>,
}

impl<T: SolverFloat> NonLinearity<T> {
    pub fn new(name: impl Into<Arc<str>>, f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        NonLinearity {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    /// `+1` above zero, `-1` below, `0` at zero.
    pub fn sign() -> Self {
        NonLinearity::new("sign", |x: T| {
            if x > T::zero() {
                T::one()
            } else if x < T::zero() {
                -T::one()
            } else {
                T::zero()
            }
        })
    }

    pub fn tanh() -> Self {
        NonLinearity::new("tanh", |x: T| x.tanh())
    }

    /// `1` strictly above one half, `0` otherwise.
    pub fn step_half() -> Self {
        NonLinearity::new("step_half", |x: T| {
            if x > <T as SolverFloat>::from_f64(0.5) { T::one() } else { T::zero() }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn evaluate(&self, x: T) -> T {
        (self.f)(x)
    }

    /// Map every element of `x` in place.
    pub fn apply<R, C, S>(&self, x: &mut Matrix<T, R, C, S>)
    where
        R: Dim,
        C: Dim,
        S: StorageMut<T, R, C>,
    {
        for value in x.iter_mut() {
            *value = (self.f)(*value);
        }
    }

    /// Map the first `rows` rows of `x` in place; the continuous block below
    /// is left untouched.
    pub fn apply_to_prefix(&self, x: &mut DMatrix<T>, rows: usize) {
        if rows == 0 {
            return;
        }
        let mut block = x.rows_range_mut(0..rows);
        for value in block.iter_mut() {
            *value = (self.f)(*value);
        }
    }
}

impl<T: SolverFloat> std::fmt::Debug for NonLinearity<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonLinearity")
            .field("name", &self.name)
            .finish()
    }
}

/// Registry of non-linearities.
///
/// Declarations collect in a staging list until the one-shot `init()` call
/// materializes them into the lookup table. Backends that load late can keep
/// declaring specializations up to that point; declarations after `init()`
/// land in the table directly. `init()` is idempotent across threads.
pub struct NonLinearityRegistry<T: SolverFloat> {
    declared: Mutex<Vec<NonLinearity<T>>>,
    table: Mutex<HashMap<String, NonLinearity<T>>>,
    expanded: AtomicBool,
}

impl<T: SolverFloat> NonLinearityRegistry<T> {
    /// A registry with the built-in family (`sign`, `tanh`, `step_half`)
    /// already declared.
    pub fn new() -> Self {
        NonLinearityRegistry {
            declared: Mutex::new(vec![
                NonLinearity::sign(),
                NonLinearity::tanh(),
                NonLinearity::step_half(),
            ]),
            table: Mutex::new(HashMap::new()),
            expanded: AtomicBool::new(false),
        }
    }

    pub fn declare(&self, nonlinearity: NonLinearity<T>) {
        if self.expanded.load(Ordering::Acquire) {
            self.table
                .lock()
                .expect("non-linearity table poisoned")
                .insert(nonlinearity.name().to_owned(), nonlinearity);
        } else {
            self.declared
                .lock()
                .expect("non-linearity staging list poisoned")
                .push(nonlinearity);
        }
    }

    /// Materialize all declarations. Only the first call expands; later
    /// calls return immediately.
    pub fn init(&self) {
        if self.expanded.swap(true, Ordering::AcqRel) {
            return;
        }
        let declared = std::mem::take(
            &mut *self
                .declared
                .lock()
                .expect("non-linearity staging list poisoned"),
        );
        let mut table = self.table.lock().expect("non-linearity table poisoned");
        for nonlinearity in declared {
            table.insert(nonlinearity.name().to_owned(), nonlinearity);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.expanded.load(Ordering::Acquire)
    }

    pub fn get(&self, name: &str) -> Option<NonLinearity<T>> {
        self.table
            .lock()
            .expect("non-linearity table poisoned")
            .get(name)
            .cloned()
    }
}

impl<T: SolverFloat> Default for NonLinearityRegistry<T> {
    fn default() -> Self {
        NonLinearityRegistry::new()
    }
}
