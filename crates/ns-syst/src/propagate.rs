//! Automatic Up/Down shadow columns for derived quantities.
//!
//! Every definition made through a [`Propagator`] is expanded one hop: for
//! each systematic affecting any input, the output gets `_<S>Up` and
//! `_<S>Down` siblings computed from the varied inputs, and the output is
//! registered as affected by `S`. Chaining definitions therefore propagates
//! variations transitively without rescanning the data.

use ns_core::{Direction, Error, Result, variation_column};
use ns_frame::{ColumnType, ColumnarEngine, CompiledExpr, Kernel};

use crate::catalog;
use crate::registry::SystematicRegistry;

/// Defines columns on an engine while keeping the registry in sync.
pub struct Propagator<'a, E: ColumnarEngine + ?Sized> {
    engine: &'a mut E,
    registry: &'a mut SystematicRegistry,
}

impl<'a, E: ColumnarEngine + ?Sized> Propagator<'a, E> {
    /// Borrow an engine and the run's registry.
    pub fn new(engine: &'a mut E, registry: &'a mut SystematicRegistry) -> Self {
        Self { engine, registry }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &E {
        &*self.engine
    }

    /// The run's registry.
    pub fn registry(&self) -> &SystematicRegistry {
        &*self.registry
    }

    /// Define `name = kernel(inputs)` plus its variations.
    ///
    /// Returns the systematics now affecting `name`, in registry order.
    /// Fails before defining anything if an input or a variation of an
    /// affected input is missing or not scalar, or if `name` or one of its
    /// variation names is already taken.
    pub fn define(&mut self, name: &str, kernel: Kernel, inputs: &[&str]) -> Result<Vec<String>> {
        for c in inputs {
            self.check_scalar_input(c)?;
        }

        let affecting: Vec<String> = self
            .registry
            .systematics()
            .filter(|s| inputs.iter().any(|c| self.registry.is_affected(c, s)))
            .map(str::to_string)
            .collect();

        let mut variations: Vec<(String, Vec<String>)> = Vec::with_capacity(2 * affecting.len());
        for syst in &affecting {
            for dir in Direction::BOTH {
                let varied = inputs
                    .iter()
                    .map(|c| {
                        if self.registry.is_affected(c, syst) {
                            let v = variation_column(c, syst, dir);
                            self.check_scalar_input(&v)?;
                            Ok(v)
                        } else {
                            Ok((*c).to_string())
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                variations.push((variation_column(name, syst, dir), varied));
            }
        }

        for column in std::iter::once(name).chain(variations.iter().map(|(c, _)| c.as_str())) {
            if self.engine.column_exists(column) {
                return Err(Error::DuplicateColumn(column.to_string()));
            }
        }

        let nominal: Vec<String> = inputs.iter().map(|c| (*c).to_string()).collect();
        self.engine.define_column(name, kernel.clone(), &nominal)?;
        for (column, varied) in &variations {
            self.engine.define_column(column, kernel.clone(), varied)?;
            tracing::debug!(column = %column, inputs = ?varied, "variation defined");
        }
        for syst in &affecting {
            self.registry.register_systematic(syst, [name]);
        }
        Ok(affecting)
    }

    fn check_scalar_input(&self, column: &str) -> Result<()> {
        match self.engine.column_type(column) {
            None => Err(Error::MissingColumn(column.to_string())),
            Some(ColumnType::Scalar) => Ok(()),
            Some(actual) => Err(Error::ColumnType {
                column: column.to_string(),
                expected: ColumnType::Scalar.to_string(),
                actual: actual.to_string(),
            }),
        }
    }

    /// Define a scalar column from a string expression, plus its variations.
    pub fn define_expr(&mut self, name: &str, expression: &str) -> Result<Vec<String>> {
        let expr = CompiledExpr::compile(expression)?;
        let inputs: Vec<String> = expr.inputs().to_vec();
        let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();
        self.define(name, expr.into_kernel(), &inputs)
    }

    /// Define a per-sample constant. Constants are never varied.
    pub fn define_constant(&mut self, name: &str, value: f64) -> Result<()> {
        self.engine.define_column(name, Kernel::constant(value), &[])
    }

    /// Define the boolean column `name` (with variations), then keep only
    /// rows where its nominal value is true.
    ///
    /// Varied selections never drop rows; their differences travel as
    /// alternate values of downstream columns.
    pub fn filter(&mut self, name: &str, kernel: Kernel, inputs: &[&str]) -> Result<Vec<String>> {
        let affecting = self.define(name, kernel, inputs)?;
        self.engine.filter_rows(name)?;
        Ok(affecting)
    }

    /// [`Propagator::filter`] with a string expression.
    pub fn filter_expr(&mut self, name: &str, expression: &str) -> Result<Vec<String>> {
        let affecting = self.define_expr(name, expression)?;
        self.engine.filter_rows(name)?;
        Ok(affecting)
    }

    /// Build the variation catalog for `base`; see [`catalog::make_variation_catalog`].
    pub fn variation_catalog(&mut self, base: &str) -> Result<Vec<String>> {
        catalog::make_variation_catalog(&mut *self.engine, &mut *self.registry, base)
    }
}
