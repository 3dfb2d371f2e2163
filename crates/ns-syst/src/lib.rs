//! # ns-syst
//!
//! Systematic-variation bookkeeping for NextStat.
//!
//! - [`SystematicRegistry`]: which columns each systematic affects, and back.
//! - [`Propagator`]: defines derived columns and their `_<S>Up` / `_<S>Down`
//!   siblings automatically, keeping the registry up to date.
//! - [`make_variation_catalog`]: the ordered variation labels of a quantity
//!   and the index columns that place each variation on a histogram axis.
//!
//! ## Example
//!
//! ```
//! use ns_frame::{ColumnarEngine, Frame, Kernel};
//! use ns_syst::{Propagator, SystematicRegistry};
//!
//! let mut frame = Frame::from_columns([
//!     ("pt", vec![1.0, 2.0]),
//!     ("pt_PtScaleUp", vec![1.1, 2.2]),
//!     ("pt_PtScaleDown", vec![0.9, 1.8]),
//! ])
//! .unwrap();
//! let mut registry = SystematicRegistry::new();
//! registry.register_existing_systematics(&["PtScale"], &frame.column_names());
//!
//! let mut p = Propagator::new(&mut frame, &mut registry);
//! p.define("E", Kernel::scalar(|x| x[0] * x[0]), &["pt"]).unwrap();
//! assert_eq!(registry.systematics_for_variable("E"), ["PtScale"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod propagate;
pub mod registry;

pub use catalog::make_variation_catalog;
pub use propagate::Propagator;
pub use registry::SystematicRegistry;
