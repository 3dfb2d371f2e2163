//! Booking N-dimensional histograms with one fill slice per variation.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use ns_core::{
    Error, HistogramDefinition, NOMINAL, Result, SelectionAxis, labelled_column,
    split_variation_label,
};
use ns_frame::{ColumnarEngine, Kernel};
use ns_syst::SystematicRegistry;

use crate::accumulator::NdFillAccumulator;
use crate::output::OutputDirectory;
use crate::sparse::{Axis, SparseHistND};

/// Output key of a flattened histogram: region path and leaf name.
pub type OutputKey = (Vec<String>, String);

/// One fill slice: the columns read for a variation, in axis order with the
/// weight last.
#[derive(Debug, Clone, PartialEq)]
pub struct FillSlice {
    /// Variation label (`"Nominal"` for the first slice).
    pub label: String,
    /// Column names, one per axis followed by the weight.
    pub columns: Vec<String>,
}

/// A histogram registered on the engine, not yet necessarily filled.
#[derive(Debug, Clone)]
pub struct BookedHistogram {
    name: String,
    definition: HistogramDefinition,
    selection_axes: Vec<SelectionAxis>,
    region_catalogs: Vec<Vec<String>>,
    slices: Vec<FillSlice>,
    result: Arc<OnceLock<SparseHistND>>,
}

impl BookedHistogram {
    /// `<definition name>.<suffix>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The histogram definition supplying the value axis and weight.
    pub fn definition(&self) -> &HistogramDefinition {
        &self.definition
    }

    /// Selection axes, variation axis last.
    pub fn selection_axes(&self) -> &[SelectionAxis] {
        &self.selection_axes
    }

    /// Region labels per selection axis.
    pub fn region_catalogs(&self) -> &[Vec<String>] {
        &self.region_catalogs
    }

    /// Fill slices, nominal first.
    pub fn slices(&self) -> &[FillSlice] {
        &self.slices
    }

    /// Number of fill slices per event.
    pub fn num_fills(&self) -> usize {
        self.slices.len()
    }

    /// All axes: selection axes followed by the value axis.
    pub fn axes(&self) -> Vec<Axis> {
        let mut axes: Vec<Axis> = self.selection_axes.iter().map(Axis::from).collect();
        axes.push(Axis::from(&self.definition.value_axis()));
        axes
    }

    /// The merged histogram, once the event loop has run.
    pub fn result(&self) -> Option<&SparseHistND> {
        self.result.get()
    }

    /// Every output key this histogram can flatten into: each combination
    /// of region labels, times one leaf per fill slice.
    pub fn output_keys(&self) -> Vec<OutputKey> {
        let regions = self.region_catalogs.split_last().map_or(&[][..], |(_, r)| r);
        let mut paths: Vec<Vec<String>> = vec![Vec::new()];
        for cat in regions {
            paths = paths
                .iter()
                .flat_map(|p| {
                    cat.iter().map(move |l| {
                        let mut p = p.clone();
                        p.push(l.clone());
                        p
                    })
                })
                .collect();
        }
        let leaves: Vec<String> =
            self.slices.iter().map(|s| leaf_name(self.definition.variable(), &s.label)).collect();
        paths
            .into_iter()
            .flat_map(|p| leaves.iter().map(move |l| (p.clone(), l.clone())))
            .collect()
    }
}

/// Leaf name for `variable` under a variation label.
pub(crate) fn leaf_name(variable: &str, label: &str) -> String {
    if label == NOMINAL { variable.to_string() } else { labelled_column(variable, label) }
}

/// Fail if two histograms, or a histogram and an entry already in `out`,
/// would flatten to the same output key.
pub(crate) fn check_output_keys<'a>(
    booked: impl IntoIterator<Item = &'a BookedHistogram>,
    out: Option<&OutputDirectory>,
) -> Result<()> {
    let mut seen: HashMap<OutputKey, &str> = HashMap::new();
    for b in booked {
        for key in b.output_keys() {
            let (path, leaf) = &key;
            if out.is_some_and(|o| o.is_taken(path, leaf)) {
                return Err(Error::Config(format!(
                    "histogram '{}': output entry '{leaf}' already exists in '/{}'",
                    b.name(),
                    path.join("/")
                )));
            }
            if let Some(other) = seen.insert(key.clone(), b.name()) {
                return Err(Error::Config(format!(
                    "histograms '{other}' and '{}' both flatten to '/{}'",
                    b.name(),
                    path.iter().chain([leaf]).cloned().collect::<Vec<_>>().join("/")
                )));
            }
        }
    }
    Ok(())
}

fn validate<E: ColumnarEngine + ?Sized>(
    engine: &E,
    defs: &[HistogramDefinition],
    selection_axes: &[SelectionAxis],
    region_catalogs: &[Vec<String>],
) -> Result<()> {
    if region_catalogs.is_empty() {
        return Err(Error::Config("book_nd: no region catalogs".into()));
    }
    if selection_axes.is_empty() {
        return Err(Error::Config("book_nd: no selection axes".into()));
    }
    if region_catalogs.len() != selection_axes.len() {
        return Err(Error::Config(format!(
            "book_nd: {} region catalogs for {} selection axes",
            region_catalogs.len(),
            selection_axes.len()
        )));
    }
    for (ax, cat) in selection_axes.iter().zip(region_catalogs) {
        if cat.len() != ax.bins() {
            return Err(Error::Config(format!(
                "selection axis '{}' has {} bins but {} region labels",
                ax.variable(),
                ax.bins(),
                cat.len()
            )));
        }
    }
    if let Some(variations) = region_catalogs.last() {
        for label in variations {
            if label != NOMINAL && split_variation_label(label).is_none() {
                return Err(Error::Config(format!("malformed variation label '{label}'")));
            }
        }
    }
    for def in defs {
        let vars = selection_axes
            .iter()
            .map(SelectionAxis::variable)
            .chain([def.variable(), def.weight()]);
        for v in vars {
            if !engine.column_exists(v) {
                return Err(Error::MissingColumn(v.to_string()));
            }
        }
    }
    Ok(())
}

/// Fill slices for one histogram: nominal, then every catalog variation whose
/// systematic affects more than one of the histogram's variables.
pub fn fill_slices(
    registry: &SystematicRegistry,
    variables: &[&str],
    variation_catalog: &[String],
) -> Vec<FillSlice> {
    let mut slices = vec![FillSlice {
        label: NOMINAL.to_string(),
        columns: variables.iter().map(|v| (*v).to_string()).collect(),
    }];
    for label in variation_catalog {
        let Some((syst, _)) = split_variation_label(label) else {
            continue;
        };
        let n_affected = variables.iter().filter(|v| registry.is_affected(v, syst)).count();
        if n_affected <= 1 {
            tracing::trace!(variation = %label, n_affected, "no separate fill slice");
            continue;
        }
        let columns = variables
            .iter()
            .map(|v| {
                if registry.is_affected(v, syst) {
                    labelled_column(v, label)
                } else {
                    (*v).to_string()
                }
            })
            .collect();
        slices.push(FillSlice { label: label.clone(), columns });
    }
    slices
}

/// Book one N-dimensional histogram per definition.
///
/// Axes are the selection axes (the variation axis last, matching the last
/// entry of `region_catalogs`) followed by the definition's value axis. Each
/// histogram gets a vector column `<name>.fill` concatenating all of its
/// fill slices, and an [`NdFillAccumulator`] booked against it. Everything
/// is validated before the engine is touched, including that no two
/// definitions flatten to the same output entry.
pub fn book_nd<E: ColumnarEngine + ?Sized>(
    engine: &mut E,
    registry: &SystematicRegistry,
    defs: &[HistogramDefinition],
    selection_axes: &[SelectionAxis],
    suffix: &str,
    region_catalogs: &[Vec<String>],
) -> Result<Vec<BookedHistogram>> {
    validate(&*engine, defs, selection_axes, region_catalogs)?;
    let variation_catalog = &region_catalogs[region_catalogs.len() - 1];

    let n_slots = engine.n_slots();
    let mut planned: Vec<(String, NdFillAccumulator, BookedHistogram)> = Vec::with_capacity(defs.len());
    for def in defs {
        let name = format!("{}.{suffix}", def.name());
        let fill_column = format!("{name}.fill");
        if engine.column_exists(&fill_column) || planned.iter().any(|(c, ..)| *c == fill_column) {
            return Err(Error::DuplicateColumn(fill_column));
        }
        let variables: Vec<&str> = selection_axes
            .iter()
            .map(SelectionAxis::variable)
            .chain([def.variable(), def.weight()])
            .collect();
        let slices = fill_slices(registry, &variables, variation_catalog);
        for s in &slices {
            if let Some(c) = s.columns.iter().find(|c| !engine.column_exists(c)) {
                return Err(Error::MissingColumn(c.clone()));
            }
        }
        let mut axes: Vec<Axis> = selection_axes.iter().map(Axis::from).collect();
        axes.push(Axis::from(&def.value_axis()));
        let acc = NdFillAccumulator::new(name.clone(), axes, slices.len(), n_slots)?;
        let hist = BookedHistogram {
            name,
            definition: def.clone(),
            selection_axes: selection_axes.to_vec(),
            region_catalogs: region_catalogs.to_vec(),
            slices,
            result: acc.result(),
        };
        planned.push((fill_column, acc, hist));
    }
    check_output_keys(planned.iter().map(|(_, _, h)| h), None)?;

    let mut booked = Vec::with_capacity(planned.len());
    for (fill_column, acc, hist) in planned {
        let inputs: Vec<String> = hist.slices.iter().flat_map(|s| s.columns.iter().cloned()).collect();
        engine.define_column(&fill_column, Kernel::concat(), &inputs)?;
        engine.book_aggregation(&fill_column, Box::new(acc))?;
        tracing::debug!(
            histogram = %hist.name,
            num_fills = hist.num_fills(),
            dims = hist.selection_axes.len() + 1,
            "histogram booked"
        );
        booked.push(hist);
    }
    Ok(booked)
}
