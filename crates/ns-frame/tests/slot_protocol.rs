//! The event loop drives aggregations through the slot protocol.

use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use ns_frame::{ColumnarEngine, Frame, Kernel, SlotAction, SlotFill};

#[derive(Default)]
struct Slot {
    tasks: usize,
    rows: usize,
    sum: f64,
}

impl SlotFill for Slot {
    fn init_task(&mut self) {
        self.tasks += 1;
    }

    fn exec(&mut self, values: &[f64]) {
        self.rows += 1;
        self.sum += values.iter().sum::<f64>();
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Totals {
    initialized_with: usize,
    tasks: usize,
    rows: usize,
    sum: f64,
    finalized: usize,
}

struct Summing {
    slots: Vec<Slot>,
    totals: Arc<Mutex<Totals>>,
}

impl Summing {
    fn new() -> (Self, Arc<Mutex<Totals>>) {
        let totals = Arc::new(Mutex::new(Totals::default()));
        (Self { slots: Vec::new(), totals: Arc::clone(&totals) }, totals)
    }
}

impl SlotAction for Summing {
    fn name(&self) -> &str {
        "summing"
    }

    fn initialize(&mut self, n_slots: usize) {
        self.slots = (0..n_slots).map(|_| Slot::default()).collect();
        self.totals.lock().unwrap().initialized_with = n_slots;
    }

    fn slot_fills(&mut self) -> Vec<&mut dyn SlotFill> {
        self.slots.iter_mut().map(|s| s as &mut dyn SlotFill).collect()
    }

    fn finalize(&mut self) {
        let mut t = self.totals.lock().unwrap();
        t.finalized += 1;
        for s in &self.slots {
            t.tasks += s.tasks;
            t.rows += s.rows;
            t.sum += s.sum;
        }
    }
}

fn frame(threads: usize) -> Frame {
    let x: Vec<f64> = (0..101).map(f64::from).collect();
    Frame::from_columns([("x", x)]).unwrap().with_threads(threads)
}

#[test]
fn every_surviving_row_is_seen_once() {
    for threads in [1, 3, 7] {
        let mut f = frame(threads);
        f.define_expr("big", "x >= 50").unwrap();
        f.filter_rows("big").unwrap();
        f.define_column("v", Kernel::concat(), &["x".into(), "x".into()]).unwrap();

        let (action, totals) = Summing::new();
        f.book_aggregation("v", Box::new(action)).unwrap();
        f.run_if_pending().unwrap();

        let t = totals.lock().unwrap().clone();
        assert_eq!(t.initialized_with, threads);
        assert_eq!(t.tasks, threads);
        assert_eq!(t.finalized, 1);
        assert_eq!(t.rows, 51);
        let expected: f64 = (50..=100).map(|v| 2.0 * f64::from(v)).sum();
        assert_relative_eq!(t.sum, expected);
    }
}

#[test]
fn one_pass_serves_every_booking() {
    let mut f = frame(4);
    f.define_column("v", Kernel::vector(|x, out| out.push(x[0] * 0.5)), &["x".into()])
        .unwrap();
    let (a, ta) = Summing::new();
    let (b, tb) = Summing::new();
    f.book_aggregation("v", Box::new(a)).unwrap();
    f.book_aggregation("v", Box::new(b)).unwrap();
    f.run().unwrap();
    assert_eq!(f.runs(), 1);
    assert_eq!(ta.lock().unwrap().rows, 101);
    assert_relative_eq!(tb.lock().unwrap().sum, 0.5 * 5050.0);

    // Nothing pending: no new pass.
    f.run_if_pending().unwrap();
    assert_eq!(f.runs(), 1);
}

#[test]
fn aggregations_need_vector_columns() {
    let mut f = frame(1);
    let (a, _) = Summing::new();
    assert!(f.book_aggregation("x", Box::new(a)).is_err());
    let (a, _) = Summing::new();
    assert!(f.book_aggregation("missing", Box::new(a)).is_err());
}

/// Prepares one slot fewer than requested.
struct ShortSlots(Summing);

impl SlotAction for ShortSlots {
    fn name(&self) -> &str {
        "short"
    }

    fn initialize(&mut self, n_slots: usize) {
        self.0.initialize(n_slots.saturating_sub(1));
    }

    fn slot_fills(&mut self) -> Vec<&mut dyn SlotFill> {
        self.0.slot_fills()
    }

    fn finalize(&mut self) {
        self.0.finalize();
    }
}

#[test]
fn failed_run_keeps_bookings_pending() {
    let mut f = frame(3);
    f.define_column("v", Kernel::concat(), &["x".into()]).unwrap();
    let (good, tg) = Summing::new();
    let (short, ts) = Summing::new();
    f.book_aggregation("v", Box::new(good)).unwrap();
    f.book_aggregation("v", Box::new(ShortSlots(short))).unwrap();

    let err = f.run().unwrap_err();
    assert!(err.to_string().contains("short"), "{err}");
    assert_eq!(f.runs(), 0);
    assert_eq!(f.n_pending(), 2);
    assert_eq!(tg.lock().unwrap().finalized, 0);
    assert_eq!(ts.lock().unwrap().finalized, 0);

    // The same error is reported again instead of an empty pass.
    assert!(f.run_if_pending().is_err());
    assert_eq!(f.n_pending(), 2);
}
