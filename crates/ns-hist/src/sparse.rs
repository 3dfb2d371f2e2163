//! Sparse N-dimensional histogram.
//!
//! Only bins that received a non-zero fill are stored. Every axis carries an
//! underflow bin `0` and an overflow bin `bins + 1`; the linear bin index
//! runs over axis sizes `bins + 2` with the first axis fastest.

use std::collections::HashMap;

use ns_core::{Error, Result, SelectionAxis};
use serde::Serialize;

/// Uniform binning of one histogram axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Axis {
    /// Number of in-range bins.
    pub bins: usize,
    /// Lower edge of the first bin.
    pub lo: f64,
    /// Upper edge of the last bin.
    pub hi: f64,
}

impl Axis {
    /// Bins including under/overflow.
    pub fn size(&self) -> usize {
        self.bins + 2
    }

    /// Bin holding `x`: `0` below range, `bins + 1` at or above `hi` (and NaN).
    pub fn find_bin(&self, x: f64) -> usize {
        if x < self.lo {
            return 0;
        }
        if !(x < self.hi) {
            return self.bins + 1;
        }
        let b = ((x - self.lo) * self.bins as f64 / (self.hi - self.lo)) as usize;
        // Rounding right below `hi` can land one past the last bin.
        b.min(self.bins - 1) + 1
    }
}

impl From<&SelectionAxis> for Axis {
    fn from(a: &SelectionAxis) -> Self {
        Axis { bins: a.bins(), lo: a.lo(), hi: a.hi() }
    }
}

/// Accumulated content of one bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BinStat {
    /// Sum of weights.
    pub sumw: f64,
    /// Sum of squared weights.
    pub sumw2: f64,
    /// Number of fills.
    pub entries: u64,
}

impl BinStat {
    fn absorb(&mut self, other: &BinStat) {
        self.sumw += other.sumw;
        self.sumw2 += other.sumw2;
        self.entries += other.entries;
    }
}

/// Sparse weighted histogram over any number of axes.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseHistND {
    name: String,
    axes: Vec<Axis>,
    strides: Vec<u64>,
    bins: HashMap<u64, BinStat>,
    entries: u64,
}

impl SparseHistND {
    /// An empty histogram. Fails if there are no axes or the bin count
    /// does not fit a 64-bit index.
    pub fn new(name: impl Into<String>, axes: Vec<Axis>) -> Result<Self> {
        let name = name.into();
        if axes.is_empty() {
            return Err(Error::Config(format!("histogram '{name}' has no axes")));
        }
        let mut strides = Vec::with_capacity(axes.len());
        let mut stride: u64 = 1;
        for ax in &axes {
            if ax.bins == 0 {
                return Err(Error::Config(format!("histogram '{name}' has an axis with no bins")));
            }
            strides.push(stride);
            stride = stride.checked_mul(ax.size() as u64).ok_or_else(|| {
                Error::Config(format!("histogram '{name}' has too many bins for a sparse index"))
            })?;
        }
        Ok(Self { name, axes, strides, bins: HashMap::new(), entries: 0 })
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Axes in fill order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Number of axes.
    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    /// Total number of fills.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Number of stored (non-empty) bins.
    pub fn n_filled_bins(&self) -> usize {
        self.bins.len()
    }

    /// Fill one point. `coords` holds one value per axis.
    pub fn fill(&mut self, coords: &[f64], w: f64) {
        debug_assert_eq!(coords.len(), self.axes.len());
        let idx = coords
            .iter()
            .zip(&self.axes)
            .zip(&self.strides)
            .map(|((&x, ax), &s)| ax.find_bin(x) as u64 * s)
            .sum();
        let b = self.bins.entry(idx).or_default();
        b.sumw += w;
        b.sumw2 += w * w;
        b.entries += 1;
        self.entries += 1;
    }

    /// Linear index of per-axis bin coordinates.
    pub fn linear_index(&self, coords: &[usize]) -> u64 {
        coords.iter().zip(&self.strides).map(|(&c, &s)| c as u64 * s).sum()
    }

    /// Per-axis bin coordinates of a linear index.
    pub fn coordinates(&self, mut index: u64) -> Vec<usize> {
        self.axes
            .iter()
            .map(|ax| {
                let size = ax.size() as u64;
                let c = index % size;
                index /= size;
                c as usize
            })
            .collect()
    }

    /// Content of the bin at per-axis coordinates (zero if never filled).
    pub fn bin(&self, coords: &[usize]) -> BinStat {
        self.bins.get(&self.linear_index(coords)).copied().unwrap_or_default()
    }

    /// Stored bins ordered by linear index.
    pub fn iter_sorted(&self) -> Vec<(u64, BinStat)> {
        let mut out: Vec<(u64, BinStat)> = self.bins.iter().map(|(&i, &b)| (i, b)).collect();
        out.sort_unstable_by_key(|&(i, _)| i);
        out
    }

    /// Sum of weights over all bins, flows included.
    pub fn sum_of_weights(&self) -> f64 {
        self.bins.values().map(|b| b.sumw).sum()
    }

    /// Add another histogram bin by bin. Axes must match.
    pub fn add(&mut self, other: &SparseHistND) -> Result<()> {
        if self.axes != other.axes {
            return Err(Error::Computation(format!(
                "cannot add histogram '{}' to '{}': axes differ",
                other.name, self.name
            )));
        }
        self.absorb(other);
        Ok(())
    }

    /// Bin-wise addition for histograms known to share axes.
    pub(crate) fn absorb(&mut self, other: &SparseHistND) {
        debug_assert_eq!(self.axes, other.axes);
        for (idx, b) in &other.bins {
            self.bins.entry(*idx).or_default().absorb(b);
        }
        self.entries += other.entries;
    }
}
