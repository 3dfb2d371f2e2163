//! The narrow interface the variation machinery drives.
//!
//! A [`ColumnarEngine`] owns the per-event table: it defines derived
//! columns, applies row filters, and runs booked aggregations in one
//! parallel pass. Aggregations plug in through the slot callback protocol:
//!
//! 1. [`SlotAction::initialize`] once, with the number of worker slots;
//! 2. [`SlotFill::init_task`] once per slot;
//! 3. [`SlotFill::exec`] once per surviving event, on the slot's own thread;
//! 4. [`SlotAction::finalize`] once, after every slot has finished.
//!
//! A slot's [`SlotFill`] is only ever touched by the thread processing that
//! slot, so fills need no synchronization.

use ns_core::Result;

use crate::column::{ColumnType, Kernel};

/// Per-slot state of an aggregation.
pub trait SlotFill: Send {
    /// Called once per slot before its first event.
    fn init_task(&mut self) {}

    /// Fold one event's value of the aggregated column.
    fn exec(&mut self, values: &[f64]);
}

/// An aggregation executed by the engine's event loop.
pub trait SlotAction: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Prepare `n_slots` independent slot states.
    fn initialize(&mut self, n_slots: usize);

    /// Mutable access to every slot state, indexed by slot.
    fn slot_fills(&mut self) -> Vec<&mut dyn SlotFill>;

    /// Combine slot states into the final result.
    fn finalize(&mut self);
}

/// Columnar transform graph contract.
pub trait ColumnarEngine {
    /// Define `name = kernel(inputs)`.
    ///
    /// Fails if `name` exists, if an input is missing, or if an input is not
    /// a scalar column.
    fn define_column(&mut self, name: &str, kernel: Kernel, inputs: &[String]) -> Result<()>;

    /// Keep only rows where the scalar column `column` is `> 0`.
    fn filter_rows(&mut self, column: &str) -> Result<()>;

    /// Whether a column with this name exists.
    fn column_exists(&self, name: &str) -> bool;

    /// Value type of a column, if it exists.
    fn column_type(&self, name: &str) -> Option<ColumnType>;

    /// All column names in declaration order.
    fn column_names(&self) -> Vec<String>;

    /// Number of worker slots the next run will use.
    fn n_slots(&self) -> usize;

    /// Register an aggregation over the vector column `column`. Nothing runs yet.
    fn book_aggregation(&mut self, column: &str, action: Box<dyn SlotAction>) -> Result<()>;

    /// Run the event loop if any aggregation is pending.
    fn run_if_pending(&mut self) -> Result<()>;
}
