//! Slot-parallel accumulation of N-dimensional histograms.
//!
//! Each slot owns a private [`SparseHistND`]; the engine guarantees a slot is
//! only filled from the thread processing it. After the event loop the
//! slots are merged, in slot order, into a fresh copy of the empty template.

use std::sync::{Arc, OnceLock};

use ns_core::Result;
use ns_frame::{SlotAction, SlotFill};

use crate::sparse::{Axis, SparseHistND};

/// Fold `num_fills` concatenated `(coords.., weight)` slices into `hist`.
///
/// Slices with a weight of exactly zero are skipped so they never create
/// empty bins in the sparse storage.
fn fill_slices(hist: &mut SparseHistND, num_fills: usize, values: &[f64]) {
    let width = hist.dim() + 1;
    debug_assert_eq!(values.len(), num_fills * width, "fill buffer has the wrong length");
    for slice in values.chunks_exact(width).take(num_fills) {
        let (coords, w) = slice.split_at(width - 1);
        let w = w[0];
        if w == 0.0 {
            continue;
        }
        hist.fill(coords, w);
    }
}

struct SlotHist {
    hist: SparseHistND,
    num_fills: usize,
}

impl SlotFill for SlotHist {
    fn exec(&mut self, values: &[f64]) {
        fill_slices(&mut self.hist, self.num_fills, values);
    }
}

/// Per-histogram accumulator driven by the engine's slot protocol.
pub struct NdFillAccumulator {
    name: String,
    template: SparseHistND,
    num_fills: usize,
    slots: Vec<SlotHist>,
    result: Arc<OnceLock<SparseHistND>>,
}

impl NdFillAccumulator {
    /// An accumulator with `n_slots` empty slot histograms over `axes`.
    pub fn new(name: impl Into<String>, axes: Vec<Axis>, num_fills: usize, n_slots: usize) -> Result<Self> {
        let name = name.into();
        let template = SparseHistND::new(name.clone(), axes)?;
        let mut acc = Self {
            name,
            template,
            num_fills,
            slots: Vec::new(),
            result: Arc::new(OnceLock::new()),
        };
        acc.initialize(n_slots);
        Ok(acc)
    }

    /// Number of fill slices per event.
    pub fn num_fills(&self) -> usize {
        self.num_fills
    }

    /// Number of slot histograms.
    pub fn n_slots(&self) -> usize {
        self.slots.len()
    }

    /// Fill one event's buffer into `slot`'s histogram.
    pub fn exec(&mut self, slot: usize, values: &[f64]) {
        self.slots[slot].exec(values);
    }

    /// The slot's private histogram, before merging.
    pub fn slot_histogram(&self, slot: usize) -> &SparseHistND {
        &self.slots[slot].hist
    }

    /// Handle to the merged histogram, set by [`SlotAction::finalize`].
    pub fn result(&self) -> Arc<OnceLock<SparseHistND>> {
        Arc::clone(&self.result)
    }

    /// Merge all slot histograms into a new histogram.
    pub fn merged(&self) -> SparseHistND {
        let mut total = self.template.clone();
        for s in &self.slots {
            total.absorb(&s.hist);
        }
        total
    }
}

impl SlotAction for NdFillAccumulator {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, n_slots: usize) {
        self.slots = (0..n_slots)
            .map(|_| SlotHist { hist: self.template.clone(), num_fills: self.num_fills })
            .collect();
    }

    fn slot_fills(&mut self) -> Vec<&mut dyn SlotFill> {
        self.slots.iter_mut().map(|s| s as &mut dyn SlotFill).collect()
    }

    fn finalize(&mut self) {
        let total = self.merged();
        tracing::debug!(
            histogram = %self.name,
            slots = self.slots.len(),
            bins = total.n_filled_bins(),
            entries = total.entries(),
            "slot histograms merged"
        );
        if self.result.set(total).is_err() {
            tracing::warn!(histogram = %self.name, "histogram already finalized; keeping first result");
        }
    }
}
