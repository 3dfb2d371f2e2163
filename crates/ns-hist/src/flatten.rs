//! Flattening merged N-dimensional histograms into labelled 1-D histograms.

use std::collections::BTreeMap;

use ns_core::{Error, NOMINAL, Result};
use ns_frame::ColumnarEngine;

use crate::book::{BookedHistogram, check_output_keys, leaf_name};
use crate::histogram::Histogram1D;
use crate::output::OutputDirectory;

/// Run the event loop if needed, then flatten every booked histogram into
/// a new output tree.
pub fn flatten<E: ColumnarEngine + ?Sized>(
    engine: &mut E,
    booked: &[BookedHistogram],
) -> Result<OutputDirectory> {
    let mut out = OutputDirectory::new();
    flatten_into(engine, booked, &mut out)?;
    Ok(out)
}

/// Like [`flatten`], adding to an existing tree.
///
/// Output name collisions, between the histograms or with entries already
/// in `out`, are configuration errors raised before the event loop runs.
pub fn flatten_into<E: ColumnarEngine + ?Sized>(
    engine: &mut E,
    booked: &[BookedHistogram],
    out: &mut OutputDirectory,
) -> Result<()> {
    check_output_keys(booked, Some(&*out))?;
    engine.run_if_pending()?;
    for b in booked {
        for ((path, _), h) in flatten_one(b)? {
            out.insert(path.as_slice(), h)?;
        }
    }
    Ok(())
}

/// Split one merged histogram into 1-D histograms keyed by (region path, leaf).
///
/// The region path is built from every selection axis but the last; the
/// last selection axis is the variation axis and picks the leaf name. Bins
/// with zero content are skipped, as are bins in the under/overflow of a
/// selection axis, which carry no region label.
pub fn flatten_one(booked: &BookedHistogram) -> Result<BTreeMap<(Vec<String>, String), Histogram1D>> {
    let hist = booked.result().ok_or_else(|| {
        Error::Computation(format!("histogram '{}' has not been filled", booked.name()))
    })?;
    let def = booked.definition();
    let catalogs = booked.region_catalogs();
    let k = booked.selection_axes().len();

    let mut flat: BTreeMap<(Vec<String>, String), Histogram1D> = BTreeMap::new();
    let mut dropped = 0u64;
    for (index, stat) in hist.iter_sorted() {
        if stat.sumw == 0.0 {
            continue;
        }
        let coords = hist.coordinates(index);
        let mut labels = Vec::with_capacity(k);
        for (c, cat) in coords[..k].iter().zip(catalogs) {
            match c.checked_sub(1).and_then(|i| cat.get(i)) {
                Some(l) => labels.push(l.clone()),
                None => break,
            }
        }
        if labels.len() < k {
            dropped += stat.entries;
            tracing::trace!(histogram = %booked.name(), ?coords, "selection flow bin skipped");
            continue;
        }
        let variation = labels.pop().unwrap_or_else(|| NOMINAL.to_string());
        let leaf = leaf_name(def.variable(), &variation);
        flat.entry((labels, leaf.clone()))
            .or_insert_with(|| Histogram1D::new(leaf, def.label(), def.bins(), def.lo(), def.hi()))
            .add_to_bin(coords[k], stat.sumw, stat.sumw2, stat.entries);
    }
    if dropped > 0 {
        tracing::debug!(histogram = %booked.name(), entries = dropped, "entries outside selection regions");
    }
    Ok(flat)
}
