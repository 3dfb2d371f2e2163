//! Column kernels and value types.

use std::fmt;
use std::sync::Arc;

/// Per-event value type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// One `f64` per event.
    Scalar,
    /// A variable-length `f64` buffer per event.
    Vector,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Scalar => f.write_str("scalar"),
            ColumnType::Vector => f.write_str("vector"),
        }
    }
}

/// Scalar kernel: input values (in declared input order) to one value.
pub type ScalarFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Vector kernel: input values to a buffer. `out` is cleared before each call.
pub type VectorFn = Arc<dyn Fn(&[f64], &mut Vec<f64>) + Send + Sync>;

/// The function computing a derived column from its inputs.
///
/// Kernels are cheap to clone, so the same kernel can back a nominal
/// column and all of its varied copies.
#[derive(Clone)]
pub enum Kernel {
    /// Produces a scalar column.
    Scalar(ScalarFn),
    /// Produces a vector column.
    Vector(VectorFn),
}

impl Kernel {
    /// Wrap a scalar function.
    pub fn scalar<F>(f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Kernel::Scalar(Arc::new(f))
    }

    /// Wrap a vector function.
    pub fn vector<F>(f: F) -> Self
    where
        F: Fn(&[f64], &mut Vec<f64>) + Send + Sync + 'static,
    {
        Kernel::Vector(Arc::new(f))
    }

    /// A per-sample constant (ignores its inputs).
    pub fn constant(value: f64) -> Self {
        Kernel::scalar(move |_| value)
    }

    /// Copies all inputs, in order, into the output buffer.
    pub fn concat() -> Self {
        Kernel::vector(|xs, out| out.extend_from_slice(xs))
    }

    /// Type of the column this kernel produces.
    pub fn output_type(&self) -> ColumnType {
        match self {
            Kernel::Scalar(_) => ColumnType::Scalar,
            Kernel::Vector(_) => ColumnType::Vector,
        }
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kernel::{}", self.output_type())
    }
}
