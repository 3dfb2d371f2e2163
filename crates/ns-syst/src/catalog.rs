//! Variation catalogs: the ordered list of variation labels for a quantity,
//! backed by per-sample index columns.

use ns_core::{Direction, Error, NOMINAL, Result, variation_column, variation_label};
use ns_frame::{ColumnarEngine, Kernel};

use crate::registry::SystematicRegistry;

/// Build the catalog `["Nominal", "<S1>Up", "<S1>Down", ...]` for `base`.
///
/// Defines `base = 0` and, for every registered systematic `S` in registry
/// order, `base_<S>Up` and `base_<S>Down` holding the label's position in
/// the catalog. `base` is then registered as affected by every `S`, so a
/// histogram axis filled from `base` lands each variation in its own bin.
///
/// Fails with nothing defined if any of the index column names is taken.
pub fn make_variation_catalog<E: ColumnarEngine + ?Sized>(
    engine: &mut E,
    registry: &mut SystematicRegistry,
    base: &str,
) -> Result<Vec<String>> {
    let systematics: Vec<String> = registry.systematics().map(str::to_string).collect();

    let mut columns = vec![base.to_string()];
    let mut catalog = vec![NOMINAL.to_string()];
    for syst in &systematics {
        for dir in Direction::BOTH {
            columns.push(variation_column(base, syst, dir));
            catalog.push(variation_label(syst, dir));
        }
    }
    if let Some(taken) = columns.iter().find(|c| engine.column_exists(c)) {
        return Err(Error::DuplicateColumn(taken.clone()));
    }

    for (index, column) in columns.iter().enumerate() {
        engine.define_column(column, Kernel::constant(index as f64), &[])?;
    }
    for syst in &systematics {
        registry.register_systematic(syst, [base]);
    }

    tracing::debug!(base, labels = catalog.len(), "variation catalog built");
    Ok(catalog)
}
