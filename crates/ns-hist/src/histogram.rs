//! 1-D histogram produced by flattening.

use serde::Serialize;

/// A 1-D histogram with uniform bins and explicit under/overflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram1D {
    /// Histogram name.
    pub name: String,
    /// Histogram title.
    pub title: String,
    /// Number of bins (excluding under/overflow).
    pub n_bins: usize,
    /// Lower edge of first bin.
    pub x_min: f64,
    /// Upper edge of last bin.
    pub x_max: f64,
    /// Bin edges (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    /// Bin contents (sum of weights per bin).
    pub bin_content: Vec<f64>,
    /// Sum of weights squared per bin.
    pub sumw2: Vec<f64>,
    /// Underflow sum of weights.
    pub underflow: f64,
    /// Overflow sum of weights.
    pub overflow: f64,
    /// Underflow sum of weights squared.
    pub underflow_sumw2: f64,
    /// Overflow sum of weights squared.
    pub overflow_sumw2: f64,
    /// Number of fills, flows included.
    pub entries: u64,
}

impl Histogram1D {
    /// An empty histogram with `n_bins` uniform bins over `[x_min, x_max)`.
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        n_bins: usize,
        x_min: f64,
        x_max: f64,
    ) -> Self {
        let width = (x_max - x_min) / n_bins as f64;
        let mut bin_edges: Vec<f64> = (0..n_bins).map(|i| x_min + i as f64 * width).collect();
        bin_edges.push(x_max);
        Self {
            name: name.into(),
            title: title.into(),
            n_bins,
            x_min,
            x_max,
            bin_edges,
            bin_content: vec![0.0; n_bins],
            sumw2: vec![0.0; n_bins],
            underflow: 0.0,
            overflow: 0.0,
            underflow_sumw2: 0.0,
            overflow_sumw2: 0.0,
            entries: 0,
        }
    }

    /// Add accumulated content to `bin`, where `0` is underflow,
    /// `1..=n_bins` the in-range bins and `n_bins + 1` overflow.
    pub fn add_to_bin(&mut self, bin: usize, sumw: f64, sumw2: f64, entries: u64) {
        self.entries += entries;
        if bin == 0 {
            self.underflow += sumw;
            self.underflow_sumw2 += sumw2;
        } else if bin > self.n_bins {
            self.overflow += sumw;
            self.overflow_sumw2 += sumw2;
        } else {
            self.bin_content[bin - 1] += sumw;
            self.sumw2[bin - 1] += sumw2;
        }
    }
}
