//! In-memory, lazily evaluated columnar frame.
//!
//! Source columns hold one `f64` per row. Derived columns are only
//! evaluated during [`Frame::run`], row by row, on the slot thread that owns
//! the row. Rows are split into contiguous ranges, one per slot.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use ns_core::{Error, Result};

use crate::column::{ColumnType, Kernel};
use crate::engine::{ColumnarEngine, SlotAction, SlotFill};
use crate::expr::CompiledExpr;

enum Source {
    Data(Arc<Vec<f64>>),
    Derived { inputs: Vec<usize>, kernel: Kernel },
}

struct Column {
    name: String,
    ty: ColumnType,
    source: Source,
}

struct Booking {
    column: usize,
    action: Box<dyn SlotAction>,
}

/// Columns evaluated per row, split into the filter phase and the rest.
struct Plan {
    filter_columns: Vec<usize>,
    filters: Vec<usize>,
    rest: Vec<usize>,
}

/// Lazily evaluated per-event table with slot-parallel aggregation.
pub struct Frame {
    n_rows: usize,
    n_threads: usize,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    filters: Vec<usize>,
    pending: Vec<Booking>,
    runs: usize,
}

impl Frame {
    /// An empty frame with `n_rows` rows and no columns.
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            n_threads: 0,
            columns: Vec::new(),
            index: HashMap::new(),
            filters: Vec::new(),
            pending: Vec::new(),
            runs: 0,
        }
    }

    /// Build a frame from named source columns (all of equal length).
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut it = columns.into_iter().peekable();
        let n_rows = it.peek().map(|(_, v)| v.len()).unwrap_or(0);
        let mut frame = Frame::new(n_rows);
        for (name, data) in it {
            frame.add_column(name, data)?;
        }
        Ok(frame)
    }

    /// Set the number of worker slots (`0` = rayon's current thread count).
    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads;
        self
    }

    /// Number of rows before filtering.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of completed event loops.
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Add a source column.
    pub fn add_column(&mut self, name: impl Into<String>, data: Vec<f64>) -> Result<()> {
        let name = name.into();
        if data.len() != self.n_rows {
            return Err(Error::Config(format!(
                "column '{name}' has {} rows, frame has {}",
                data.len(),
                self.n_rows
            )));
        }
        self.insert(name, ColumnType::Scalar, Source::Data(Arc::new(data)))
    }

    /// Define a scalar column from a string expression.
    pub fn define_expr(&mut self, name: &str, expression: &str) -> Result<()> {
        let expr = CompiledExpr::compile(expression)?;
        let inputs = expr.inputs().to_vec();
        self.define_column(name, expr.into_kernel(), &inputs)
    }

    /// Run the event loop for every pending aggregation.
    ///
    /// On error the aggregations stay pending and none is finalized.
    pub fn run(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let n_slots = self.n_slots();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_slots)
            .build()
            .map_err(|e| Error::Computation(format!("failed to create thread pool: {e}")))?;

        for b in &mut self.pending {
            b.action.initialize(n_slots);
            let prepared = b.action.slot_fills().len();
            if prepared != n_slots {
                return Err(Error::Computation(format!(
                    "aggregation '{}' prepared {prepared} slots, expected {n_slots}",
                    b.action.name()
                )));
            }
        }

        let mut bookings = std::mem::take(&mut self.pending);
        let plan = self.plan(bookings.iter().map(|b| b.column));
        tracing::info!(
            rows = self.n_rows,
            slots = n_slots,
            aggregations = bookings.len(),
            filters = self.filters.len(),
            "event loop starting"
        );

        {
            let mut per_slot: Vec<Vec<(usize, &mut dyn SlotFill)>> =
                (0..n_slots).map(|_| Vec::new()).collect();
            for b in &mut bookings {
                let column = b.column;
                for (slot, fill) in b.action.slot_fills().into_iter().enumerate() {
                    per_slot[slot].push((column, fill));
                }
            }

            let columns = &self.columns;
            let plan = &plan;
            let ranges = split_rows(self.n_rows, n_slots);
            pool.scope(|s| {
                for (range, fills) in ranges.into_iter().zip(per_slot) {
                    s.spawn(move |_| process_slot(columns, plan, range, fills));
                }
            });
        }

        for b in &mut bookings {
            b.action.finalize();
        }
        self.runs += 1;
        tracing::info!(run = self.runs, "event loop finished");
        Ok(())
    }

    /// Number of aggregations waiting for the next run.
    pub fn n_pending(&self) -> usize {
        self.pending.len()
    }

    /// Evaluate a scalar column for every row passing the filters, serially.
    ///
    /// Pending aggregations are left untouched.
    pub fn snapshot(&self, column: &str) -> Result<Vec<f64>> {
        let id = self.lookup_typed(column, ColumnType::Scalar)?;
        let plan = self.plan(std::iter::once(id));
        let mut st = RowState::new(self.columns.len());
        let mut out = Vec::with_capacity(self.n_rows);
        for row in 0..self.n_rows {
            if st.eval_row(&self.columns, &plan, row) {
                out.push(st.scalars[id]);
            }
        }
        Ok(out)
    }

    fn insert(&mut self, name: String, ty: ColumnType, source: Source) -> Result<()> {
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateColumn(name));
        }
        self.index.insert(name.clone(), self.columns.len());
        self.columns.push(Column { name, ty, source });
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<usize> {
        self.index.get(name).copied().ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    fn lookup_typed(&self, name: &str, expected: ColumnType) -> Result<usize> {
        let id = self.lookup(name)?;
        let actual = self.columns[id].ty;
        if actual != expected {
            return Err(Error::ColumnType {
                column: name.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(id)
    }

    /// Mark `id` and everything it depends on.
    fn mark(&self, id: usize, needed: &mut [bool]) {
        if needed[id] {
            return;
        }
        needed[id] = true;
        if let Source::Derived { inputs, .. } = &self.columns[id].source {
            for &i in inputs {
                self.mark(i, needed);
            }
        }
    }

    fn plan(&self, targets: impl Iterator<Item = usize>) -> Plan {
        let n = self.columns.len();
        let mut for_filters = vec![false; n];
        for &f in &self.filters {
            self.mark(f, &mut for_filters);
        }
        let mut for_actions = for_filters.clone();
        for t in targets {
            self.mark(t, &mut for_actions);
        }
        // Column ids are a topological order: inputs always precede outputs.
        Plan {
            filter_columns: (0..n).filter(|&i| for_filters[i]).collect(),
            filters: self.filters.clone(),
            rest: (0..n).filter(|&i| for_actions[i] && !for_filters[i]).collect(),
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("n_rows", &self.n_rows)
            .field("n_threads", &self.n_threads)
            .field("columns", &self.column_names())
            .field("filters", &self.filters.len())
            .field("pending", &self.pending.len())
            .field("runs", &self.runs)
            .finish()
    }
}

impl ColumnarEngine for Frame {
    fn define_column(&mut self, name: &str, kernel: Kernel, inputs: &[String]) -> Result<()> {
        if self.index.contains_key(name) {
            return Err(Error::DuplicateColumn(name.to_string()));
        }
        let ids = inputs
            .iter()
            .map(|c| self.lookup_typed(c, ColumnType::Scalar))
            .collect::<Result<Vec<_>>>()?;
        let ty = kernel.output_type();
        self.insert(name.to_string(), ty, Source::Derived { inputs: ids, kernel })
    }

    fn filter_rows(&mut self, column: &str) -> Result<()> {
        let id = self.lookup_typed(column, ColumnType::Scalar)?;
        self.filters.push(id);
        Ok(())
    }

    fn column_exists(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.index.get(name).map(|&i| self.columns[i].ty)
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn n_slots(&self) -> usize {
        if self.n_threads == 0 { rayon::current_num_threads().max(1) } else { self.n_threads }
    }

    fn book_aggregation(&mut self, column: &str, action: Box<dyn SlotAction>) -> Result<()> {
        let id = self.lookup_typed(column, ColumnType::Vector)?;
        tracing::debug!(aggregation = action.name(), column, "aggregation booked");
        self.pending.push(Booking { column: id, action });
        Ok(())
    }

    fn run_if_pending(&mut self) -> Result<()> {
        self.run()
    }
}

/// Split `0..n_rows` into `n_slots` contiguous, near-equal ranges.
fn split_rows(n_rows: usize, n_slots: usize) -> Vec<Range<usize>> {
    let base = n_rows / n_slots;
    let extra = n_rows % n_slots;
    let mut start = 0;
    (0..n_slots)
        .map(|slot| {
            let len = base + usize::from(slot < extra);
            let r = start..start + len;
            start += len;
            r
        })
        .collect()
}

/// Per-slot evaluation buffers, indexed by column id.
struct RowState {
    scalars: Vec<f64>,
    vectors: Vec<Vec<f64>>,
    args: Vec<f64>,
}

impl RowState {
    fn new(n_columns: usize) -> Self {
        Self { scalars: vec![0.0; n_columns], vectors: vec![Vec::new(); n_columns], args: Vec::new() }
    }

    fn eval(&mut self, columns: &[Column], id: usize, row: usize) {
        match &columns[id].source {
            Source::Data(data) => self.scalars[id] = data[row],
            Source::Derived { inputs, kernel } => {
                self.args.clear();
                self.args.extend(inputs.iter().map(|&i| self.scalars[i]));
                match kernel {
                    Kernel::Scalar(f) => self.scalars[id] = f(&self.args),
                    Kernel::Vector(f) => {
                        let out = &mut self.vectors[id];
                        out.clear();
                        f(&self.args, out);
                    }
                }
            }
        }
    }

    /// Evaluate the plan for one row; `false` if a filter rejects it.
    fn eval_row(&mut self, columns: &[Column], plan: &Plan, row: usize) -> bool {
        for &id in &plan.filter_columns {
            self.eval(columns, id, row);
        }
        for &f in &plan.filters {
            let v = self.scalars[f];
            if v.is_nan() || v <= 0.0 {
                return false;
            }
        }
        for &id in &plan.rest {
            self.eval(columns, id, row);
        }
        true
    }
}

fn process_slot(
    columns: &[Column],
    plan: &Plan,
    rows: Range<usize>,
    mut fills: Vec<(usize, &mut dyn SlotFill)>,
) {
    for (_, fill) in fills.iter_mut() {
        fill.init_task();
    }
    let mut st = RowState::new(columns.len());
    for row in rows {
        if !st.eval_row(columns, plan, row) {
            continue;
        }
        for (col, fill) in fills.iter_mut() {
            fill.exec(&st.vectors[*col]);
        }
    }
}
