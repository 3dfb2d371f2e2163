//! Analysis config (YAML) parsing + semantic validation.
//!
//! One file declares the systematics to resolve against the input, the
//! derived columns and selections, the region axes and the histograms.

use std::path::Path;

use indexmap::IndexMap;
use ns_core::{Error, HistogramDefinition, Result, SelectionAxis};
use serde::Deserialize;

fn default_variation_index() -> String {
    "systIdx".to_string()
}

fn default_suffix() -> String {
    "all".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Systematics resolved against input columns by their `_<name>Up` suffix.
    #[serde(default)]
    pub systematics: Vec<String>,
    /// Explicit registrations, added on top of the resolved ones.
    #[serde(default)]
    pub affects: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub defines: Vec<ColumnConfig>,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    #[serde(default = "default_variation_index")]
    pub variation_index: String,
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
    pub histograms: Vec<HistogramConfig>,
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

/// A derived column: either an expression or a per-sample constant.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(default)]
    pub expr: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    pub name: String,
    pub expr: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    pub variable: String,
    pub bins: usize,
    pub lo: f64,
    pub hi: f64,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistogramConfig {
    pub name: String,
    pub variable: String,
    #[serde(default)]
    pub label: Option<String>,
    pub weight: String,
    pub bins: usize,
    pub lo: f64,
    pub hi: f64,
}

pub fn read_config(path: &Path) -> Result<AnalysisConfig> {
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> Result<AnalysisConfig> {
    let cfg: AnalysisConfig =
        serde_yaml_ng::from_str(text).map_err(|e| Error::Config(format!("analysis config: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

fn bad(msg: impl Into<String>) -> Error {
    Error::Config(msg.into())
}

impl AnalysisConfig {
    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.histograms.is_empty() {
            return Err(bad("`histograms` must not be empty"));
        }
        if self.variation_index.trim().is_empty() {
            return Err(bad("`variation_index` must not be empty"));
        }
        if self.suffix.trim().is_empty() {
            return Err(bad("`suffix` must not be empty"));
        }
        for s in self.systematics.iter().chain(self.affects.keys()) {
            if s.trim().is_empty() {
                return Err(bad("systematic names must not be empty"));
            }
        }
        for d in &self.defines {
            if d.name.trim().is_empty() {
                return Err(bad("define: empty name"));
            }
            match (&d.expr, d.value) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => {
                    return Err(bad(format!(
                        "define '{}': exactly one of `expr` or `value` is required",
                        d.name
                    )));
                }
            }
        }
        for f in &self.filters {
            if f.name.trim().is_empty() || f.expr.trim().is_empty() {
                return Err(bad("filter: `name` and `expr` are required"));
            }
        }
        for r in &self.regions {
            if r.labels.len() != r.bins {
                return Err(bad(format!(
                    "region axis '{}': {} labels for {} bins",
                    r.variable,
                    r.labels.len(),
                    r.bins
                )));
            }
            if let Some(l) = r.labels.iter().find(|l| l.trim().is_empty() || l.contains('/')) {
                return Err(bad(format!("region axis '{}': invalid label '{l}'", r.variable)));
            }
        }
        // Binning checks live with the record types.
        self.selection_axes()?;
        self.histogram_definitions()?;
        Ok(())
    }

    /// Region axes, without the variation axis.
    pub fn selection_axes(&self) -> Result<Vec<SelectionAxis>> {
        self.regions.iter().map(|r| SelectionAxis::new(&r.variable, r.bins, r.lo, r.hi)).collect()
    }

    /// Region labels per region axis.
    pub fn region_catalogs(&self) -> Vec<Vec<String>> {
        self.regions.iter().map(|r| r.labels.clone()).collect()
    }

    pub fn histogram_definitions(&self) -> Result<Vec<HistogramDefinition>> {
        self.histograms
            .iter()
            .map(|h| {
                let label = h.label.clone().unwrap_or_else(|| h.variable.clone());
                HistogramDefinition::new(&h.name, &h.variable, label, &h.weight, h.bins, h.lo, h.hi)
            })
            .collect()
    }
}
