//! # ns-frame
//!
//! Columnar transform graph for NextStat systematic-variation histogramming.
//!
//! [`ColumnarEngine`] is the narrow contract the variation machinery drives:
//! define columns, filter rows, book aggregations, run one pass. [`Frame`] is
//! the in-memory implementation: columns are evaluated lazily per row on the
//! worker slot owning that row, and aggregations follow the slot protocol of
//! [`SlotAction`] / [`SlotFill`].
//!
//! ## Example
//!
//! ```
//! use ns_frame::{ColumnarEngine, Frame, Kernel};
//!
//! let mut frame = Frame::from_columns([("pt", vec![1.0, 2.0, 3.0])]).unwrap();
//! frame.define_column("pt2", Kernel::scalar(|x| x[0] * x[0]), &["pt".to_string()]).unwrap();
//! frame.define_expr("sel", "pt2 > 2").unwrap();
//! frame.filter_rows("sel").unwrap();
//! assert!(frame.column_exists("pt2"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod column;
pub mod engine;
pub mod expr;
pub mod frame;
#[cfg(feature = "parquet-io")]
pub mod ingest;

pub use column::{ColumnType, Kernel, ScalarFn, VectorFn};
pub use engine::{ColumnarEngine, SlotAction, SlotFill};
pub use expr::CompiledExpr;
pub use frame::Frame;
