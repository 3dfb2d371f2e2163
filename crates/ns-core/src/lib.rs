//! # ns-core
//!
//! Shared error type and record types for NextStat systematic-variation
//! histogramming: histogram definitions, selection axes, and the
//! `<column>_<systematic>Up` / `Down` naming convention.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    Direction, HistogramDefinition, NOMINAL, SelectionAxis, labelled_column,
    split_variation_label, variation_column, variation_label,
};
