//! Config-driven pipeline: registry → derived columns → booking → flattening.

use ns_core::{Error, Result, SelectionAxis};
use ns_frame::{ColumnarEngine, Frame};
use ns_hist::{OutputDirectory, book_nd, flatten};
use ns_syst::{Propagator, SystematicRegistry};
use serde::Serialize;

use crate::config::AnalysisConfig;

/// What a run produced, printed as JSON by `run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub rows: usize,
    pub threads: usize,
    pub variations: Vec<String>,
    pub histograms: Vec<HistogramSummary>,
    pub outputs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramSummary {
    pub name: String,
    pub num_fills: usize,
    pub entries: u64,
}

/// Resolve the config's systematics against the frame's columns, then add
/// the explicit `affects` registrations.
pub fn build_registry(cfg: &AnalysisConfig, frame: &Frame) -> SystematicRegistry {
    let mut registry = SystematicRegistry::new();
    registry.register_existing_systematics(&cfg.systematics, &frame.column_names());
    for (syst, vars) in &cfg.affects {
        registry.register_systematic(syst, vars);
    }
    registry
}

/// Run the whole analysis on `frame`.
pub fn run(cfg: &AnalysisConfig, frame: &mut Frame) -> Result<(OutputDirectory, RunSummary)> {
    let mut registry = build_registry(cfg, frame);
    tracing::info!(systematics = registry.len(), "systematics registered");

    let catalog = {
        let mut p = Propagator::new(&mut *frame, &mut registry);
        for d in &cfg.defines {
            match (&d.expr, d.value) {
                (Some(expr), _) => {
                    let affecting = p.define_expr(&d.name, expr)?;
                    tracing::debug!(column = %d.name, ?affecting, "column defined");
                }
                (None, Some(v)) => p.define_constant(&d.name, v)?,
                (None, None) => {
                    return Err(Error::Config(format!("define '{}': no expr or value", d.name)));
                }
            }
        }
        for f in &cfg.filters {
            p.filter_expr(&f.name, &f.expr)?;
        }
        p.variation_catalog(&cfg.variation_index)?
    };

    let mut axes = cfg.selection_axes()?;
    axes.push(SelectionAxis::variation(&cfg.variation_index, &catalog)?);
    let mut catalogs = cfg.region_catalogs();
    catalogs.push(catalog.clone());
    let defs = cfg.histogram_definitions()?;

    let booked = book_nd(&mut *frame, &registry, &defs, &axes, &cfg.suffix, &catalogs)?;
    let out = flatten(&mut *frame, &booked)?;

    let summary = RunSummary {
        rows: frame.n_rows(),
        threads: frame.n_slots(),
        variations: catalog,
        histograms: booked
            .iter()
            .map(|b| HistogramSummary {
                name: b.name().to_string(),
                num_fills: b.num_fills(),
                entries: b.result().map(|h| h.entries()).unwrap_or(0),
            })
            .collect(),
        outputs: out.n_histograms(),
    };
    tracing::info!(histograms = summary.outputs, "analysis finished");
    Ok((out, summary))
}
