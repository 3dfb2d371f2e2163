//! # ns-hist
//!
//! Multi-threaded N-dimensional histogramming of nominal and systematically
//! varied quantities.
//!
//! - [`book_nd`] turns histogram definitions plus selection axes into one
//!   [`NdFillAccumulator`] per histogram, filled with one slice per
//!   variation from a single concatenated vector column;
//! - the engine's event loop fills a private [`SparseHistND`] per worker
//!   slot, merged once after the loop;
//! - [`flatten`] splits the merged histograms into labelled [`Histogram1D`]s
//!   stored in an [`OutputDirectory`] tree.
//!
//! ## Example
//!
//! ```
//! use ns_core::{HistogramDefinition, SelectionAxis};
//! use ns_frame::Frame;
//! use ns_hist::{book_nd, flatten};
//! use ns_syst::{Propagator, SystematicRegistry};
//!
//! let mut frame = Frame::from_columns([
//!     ("pt", vec![1.0, 2.0, 3.0]),
//!     ("pt_PtScaleUp", vec![1.1, 2.2, 3.3]),
//!     ("pt_PtScaleDown", vec![0.9, 1.8, 2.7]),
//! ])
//! .unwrap();
//! let mut registry = SystematicRegistry::new();
//! registry.register_systematic("PtScale", ["pt"]);
//!
//! let mut p = Propagator::new(&mut frame, &mut registry);
//! p.define_expr("E", "pt * pt").unwrap();
//! p.define_constant("w", 1.0).unwrap();
//! let catalog = p.variation_catalog("systIdx").unwrap();
//!
//! let def = HistogramDefinition::new("hE", "E", "E", "w", 10, 0.0, 10.0).unwrap();
//! let axes = [SelectionAxis::variation("systIdx", &catalog).unwrap()];
//! let booked = book_nd(&mut frame, &registry, &[def], &axes, "sr", &[catalog]).unwrap();
//!
//! let out = flatten(&mut frame, &booked).unwrap();
//! assert!(out.get::<&str>(&[], "E").is_some());
//! assert!(out.get::<&str>(&[], "E_PtScaleUp").is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accumulator;
pub mod book;
pub mod flatten;
pub mod histogram;
pub mod output;
pub mod sparse;

pub use accumulator::NdFillAccumulator;
pub use book::{BookedHistogram, FillSlice, book_nd, fill_slices};
pub use flatten::{flatten, flatten_into, flatten_one};
pub use histogram::Histogram1D;
pub use output::OutputDirectory;
pub use sparse::{Axis, BinStat, SparseHistND};
