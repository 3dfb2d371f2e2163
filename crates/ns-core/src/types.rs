//! Record types shared by the propagation engine and the histogram accumulator.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Label of the unvaried variation.
pub const NOMINAL: &str = "Nominal";

/// Direction of a systematic shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// +1σ shift.
    Up,
    /// −1σ shift.
    Down,
}

impl Direction {
    /// Both directions, `Up` first.
    pub const BOTH: [Direction; 2] = [Direction::Up, Direction::Down];

    /// Suffix appended to the systematic name (`"Up"` / `"Down"`).
    pub fn suffix(self) -> &'static str {
        match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
        }
    }
}

/// Variation label for a systematic shift, e.g. `"PtScaleUp"`.
pub fn variation_label(systematic: &str, direction: Direction) -> String {
    format!("{systematic}{}", direction.suffix())
}

/// Name of the varied column: `<base>_<systematic>Up` / `<base>_<systematic>Down`.
pub fn variation_column(base: &str, systematic: &str, direction: Direction) -> String {
    format!("{base}_{systematic}{}", direction.suffix())
}

/// Name of a column under a variation label: `<base>_<label>`.
pub fn labelled_column(base: &str, label: &str) -> String {
    format!("{base}_{label}")
}

/// Split a variation label into its systematic name and direction.
///
/// Returns `None` for `"Nominal"` and for labels without an `Up`/`Down`
/// suffix or with an empty systematic name.
pub fn split_variation_label(label: &str) -> Option<(&str, Direction)> {
    if label == NOMINAL {
        return None;
    }
    let (syst, dir) = if let Some(s) = label.strip_suffix("Up") {
        (s, Direction::Up)
    } else if let Some(s) = label.strip_suffix("Down") {
        (s, Direction::Down)
    } else {
        return None;
    };
    if syst.is_empty() { None } else { Some((syst, dir)) }
}

fn check_binning(what: &str, name: &str, bins: usize, lo: f64, hi: f64) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Config(format!("{what}: empty variable name")));
    }
    if bins == 0 {
        return Err(Error::Config(format!("{what} '{name}': bin count must be positive")));
    }
    if !(lo.is_finite() && hi.is_finite()) || lo >= hi {
        return Err(Error::Config(format!(
            "{what} '{name}': invalid range [{lo}, {hi})"
        )));
    }
    Ok(())
}

/// One dimension of an N-dimensional histogram, filled from a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionAxis {
    variable: String,
    bins: usize,
    lo: f64,
    hi: f64,
}

impl SelectionAxis {
    /// Create an axis with `bins` uniform bins over `[lo, hi)`.
    pub fn new(variable: impl Into<String>, bins: usize, lo: f64, hi: f64) -> Result<Self> {
        let variable = variable.into();
        check_binning("selection axis", &variable, bins, lo, hi)?;
        Ok(Self { variable, bins, lo, hi })
    }

    /// Axis over a variation catalog: one bin per label, index `k` lands in bin `k + 1`.
    pub fn variation(base: impl Into<String>, catalog: &[String]) -> Result<Self> {
        let n = catalog.len();
        Self::new(base, n, -0.5, n as f64 - 0.5)
    }

    /// Column filling this axis.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Number of in-range bins.
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Lower edge of the first bin.
    pub fn lo(&self) -> f64 {
        self.lo
    }

    /// Upper edge of the last bin.
    pub fn hi(&self) -> f64 {
        self.hi
    }
}

/// Histogram definition: what to histogram, how to weight it, and its binning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramDefinition {
    name: String,
    variable: String,
    label: String,
    weight: String,
    bins: usize,
    lo: f64,
    hi: f64,
}

impl HistogramDefinition {
    /// Create a definition. All fields are required.
    pub fn new(
        name: impl Into<String>,
        variable: impl Into<String>,
        label: impl Into<String>,
        weight: impl Into<String>,
        bins: usize,
        lo: f64,
        hi: f64,
    ) -> Result<Self> {
        let name = name.into();
        let variable = variable.into();
        let weight = weight.into();
        if name.trim().is_empty() {
            return Err(Error::Config("histogram definition: empty name".into()));
        }
        if weight.trim().is_empty() {
            return Err(Error::Config(format!("histogram '{name}': empty weight column")));
        }
        check_binning(&format!("histogram '{name}' value axis"), &variable, bins, lo, hi)?;
        Ok(Self { name, variable, label: label.into(), weight, bins, lo, hi })
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column filling the value axis.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Axis label (used as the title of flattened histograms).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Column holding the per-event weight.
    pub fn weight(&self) -> &str {
        &self.weight
    }

    /// Number of value-axis bins.
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Lower edge of the value axis.
    pub fn lo(&self) -> f64 {
        self.lo
    }

    /// Upper edge of the value axis.
    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// The value axis as a [`SelectionAxis`].
    pub fn value_axis(&self) -> SelectionAxis {
        SelectionAxis {
            variable: self.variable.clone(),
            bins: self.bins,
            lo: self.lo,
            hi: self.hi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_convention() {
        assert_eq!(variation_column("pt", "PtScale", Direction::Up), "pt_PtScaleUp");
        assert_eq!(variation_column("pt", "PtScale", Direction::Down), "pt_PtScaleDown");
        assert_eq!(variation_label("JES", Direction::Down), "JESDown");
        assert_eq!(labelled_column("w", "JESUp"), "w_JESUp");
    }

    #[test]
    fn split_labels() {
        assert_eq!(split_variation_label("PtScaleUp"), Some(("PtScale", Direction::Up)));
        assert_eq!(split_variation_label("PtScaleDown"), Some(("PtScale", Direction::Down)));
        assert_eq!(split_variation_label(NOMINAL), None);
        assert_eq!(split_variation_label("Up"), None);
        assert_eq!(split_variation_label("Sideways"), None);
    }

    #[test]
    fn variation_axis_bins() {
        let cat: Vec<String> = ["Nominal", "aUp", "aDown"].iter().map(|s| s.to_string()).collect();
        let ax = SelectionAxis::variation("idx", &cat).unwrap();
        assert_eq!(ax.bins(), 3);
        assert_eq!(ax.lo(), -0.5);
        assert_eq!(ax.hi(), 2.5);
    }

    #[test]
    fn rejects_bad_declarations() {
        assert!(SelectionAxis::new("x", 0, 0.0, 1.0).is_err());
        assert!(SelectionAxis::new("x", 3, 1.0, 1.0).is_err());
        assert!(SelectionAxis::new("", 3, 0.0, 1.0).is_err());
        assert!(HistogramDefinition::new("", "x", "", "w", 3, 0.0, 1.0).is_err());
        assert!(HistogramDefinition::new("h", "x", "", "", 3, 0.0, 1.0).is_err());
        let err = HistogramDefinition::new("h", "x", "", "w", 3, 2.0, 1.0).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("'h'"));
    }

    #[test]
    fn value_axis_matches_definition() {
        let h = HistogramDefinition::new("hE", "E", "E [GeV]", "w", 10, 0.0, 100.0).unwrap();
        let ax = h.value_axis();
        assert_eq!(ax.variable(), "E");
        assert_eq!(ax.bins(), 10);
        assert_eq!(ax.hi(), 100.0);
    }
}
