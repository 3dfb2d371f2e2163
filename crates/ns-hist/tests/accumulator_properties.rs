//! Property tests for slot merging and zero-weight handling.

use ns_frame::SlotAction;
use ns_hist::{Axis, NdFillAccumulator, SparseHistND};
use proptest::prelude::*;

fn axes() -> Vec<Axis> {
    vec![Axis { bins: 3, lo: -0.5, hi: 2.5 }, Axis { bins: 8, lo: 0.0, hi: 10.0 }]
}

/// `(variation index, value, weight)` per event, two slices per event.
fn events() -> impl Strategy<Value = Vec<[f64; 6]>> {
    proptest::collection::vec(
        (0u8..3, -2.0f64..12.0, -1.0f64..5.0, 0u8..3, -2.0f64..12.0, -1.0f64..5.0).prop_map(
            |(i0, x0, w0, i1, x1, w1)| [f64::from(i0), x0, w0, f64::from(i1), x1, w1],
        ),
        0..200,
    )
}

fn assert_same_content(a: &SparseHistND, b: &SparseHistND) -> Result<(), TestCaseError> {
    prop_assert_eq!(a.entries(), b.entries());
    prop_assert_eq!(a.n_filled_bins(), b.n_filled_bins());
    for (idx, sa) in a.iter_sorted() {
        let sb = b.bin(&a.coordinates(idx));
        prop_assert!((sa.sumw - sb.sumw).abs() <= 1e-9 * (1.0 + sa.sumw.abs()));
        prop_assert!((sa.sumw2 - sb.sumw2).abs() <= 1e-9 * (1.0 + sa.sumw2.abs()));
        prop_assert_eq!(sa.entries, sb.entries);
    }
    Ok(())
}

proptest! {
    #[test]
    fn merge_order_does_not_matter(evts in events(), n_slots in 1usize..6, seed in any::<u64>()) {
        let mut acc = NdFillAccumulator::new("h", axes(), 2, n_slots).unwrap();
        for (i, e) in evts.iter().enumerate() {
            acc.exec(i % n_slots, e);
        }

        let forward = acc.merged();
        let mut order: Vec<usize> = (0..n_slots).collect();
        order.rotate_left((seed as usize) % n_slots);
        order.reverse();
        let mut shuffled = SparseHistND::new("h", axes()).unwrap();
        for s in order {
            shuffled.add(acc.slot_histogram(s)).unwrap();
        }
        assert_same_content(&forward, &shuffled)?;

        // The single-slot fill is the serial reference.
        let mut serial = NdFillAccumulator::new("h", axes(), 2, 1).unwrap();
        for e in &evts {
            serial.exec(0, e);
        }
        assert_same_content(&serial.merged(), &forward)?;
    }

    #[test]
    fn zero_weight_slices_leave_no_trace(evts in events(), zeros in events()) {
        let mut clean = NdFillAccumulator::new("h", axes(), 2, 1).unwrap();
        let mut noisy = NdFillAccumulator::new("h", axes(), 2, 1).unwrap();
        for e in &evts {
            clean.exec(0, e);
            noisy.exec(0, e);
        }
        for z in &zeros {
            let mut z = *z;
            z[2] = 0.0;
            z[5] = 0.0;
            noisy.exec(0, &z);
        }
        clean.finalize();
        noisy.finalize();
        let (a, b) = (clean.result(), noisy.result());
        assert_same_content(a.get().unwrap(), b.get().unwrap())?;
    }
}
