//! End-to-end: register a systematic, derive a quantity, book, run, flatten.

use approx::assert_relative_eq;
use ns_core::{HistogramDefinition, SelectionAxis};
use ns_frame::{ColumnarEngine, Frame, Kernel};
use ns_hist::{Axis, Histogram1D, OutputDirectory, book_nd, flatten};
use ns_syst::{Propagator, SystematicRegistry};

const PT: [f64; 3] = [1.0, 2.0, 3.0];

fn pt_frame(threads: usize) -> Frame {
    let up: Vec<f64> = PT.iter().map(|p| p * 1.1).collect();
    let down: Vec<f64> = PT.iter().map(|p| p * 0.9).collect();
    Frame::from_columns([("pt", PT.to_vec()), ("pt_PtScaleUp", up), ("pt_PtScaleDown", down)])
        .unwrap()
        .with_threads(threads)
}

fn run_scenario(threads: usize) -> OutputDirectory {
    let mut frame = pt_frame(threads);
    let mut registry = SystematicRegistry::new();
    registry.register_existing_systematics(&["PtScale"], &frame.column_names());

    let mut p = Propagator::new(&mut frame, &mut registry);
    p.define("E", Kernel::scalar(|x| x[0] * x[0]), &["pt"]).unwrap();
    p.define_constant("weight", 1.0).unwrap();
    let catalog = p.variation_catalog("systIdx").unwrap();

    let def = HistogramDefinition::new("hE", "E", "E [GeV^2]", "weight", 12, 0.0, 12.0).unwrap();
    let axes = [SelectionAxis::variation("systIdx", &catalog).unwrap()];
    let booked = book_nd(&mut frame, &registry, &[def], &axes, "all", &[catalog]).unwrap();
    assert_eq!(booked[0].num_fills(), 3);

    let out = flatten(&mut frame, &booked).unwrap();
    assert_eq!(frame.runs(), 1);
    out
}

fn plain(values: impl IntoIterator<Item = f64>) -> Histogram1D {
    let axis = Axis { bins: 12, lo: 0.0, hi: 12.0 };
    let mut h = Histogram1D::new("ref", "", 12, 0.0, 12.0);
    for v in values {
        h.add_to_bin(axis.find_bin(v), 1.0, 1.0, 1);
    }
    h
}

fn root(out: &OutputDirectory, name: &str) -> Histogram1D {
    out.get::<&str>(&[], name).unwrap_or_else(|| panic!("missing {name}")).clone()
}

#[test]
fn derived_columns_and_registry() {
    let mut frame = pt_frame(1);
    let mut registry = SystematicRegistry::new();
    registry.register_systematic("PtScale", ["pt"]);
    Propagator::new(&mut frame, &mut registry)
        .define("E", Kernel::scalar(|x| x[0] * x[0]), &["pt"])
        .unwrap();

    for c in ["pt_PtScaleUp", "pt_PtScaleDown", "E_PtScaleUp", "E_PtScaleDown"] {
        assert!(frame.column_exists(c), "{c}");
    }
    let up = frame.snapshot("E_PtScaleUp").unwrap();
    let down = frame.snapshot("E_PtScaleDown").unwrap();
    for (i, p) in PT.iter().enumerate() {
        assert_relative_eq!(up[i], (p * 1.1) * (p * 1.1), max_relative = 1e-12);
        assert_relative_eq!(down[i], (p * 0.9) * (p * 0.9), max_relative = 1e-12);
    }
    assert_eq!(registry.systematics_for_variable("E"), ["PtScale"]);
}

#[test]
fn nominal_matches_plain_fill() {
    let out = run_scenario(1);
    assert_eq!(out.n_histograms(), 3);
    let nominal = root(&out, "E");
    let expected = plain([1.0, 4.0, 9.0]);
    assert_eq!(nominal.bin_content, expected.bin_content);
    assert_eq!(nominal.sumw2, expected.sumw2);
    assert_eq!(nominal.entries, 3);
    assert_eq!(nominal.title, "E [GeV^2]");
}

#[test]
fn varied_siblings_follow_shifted_pt() {
    let out = run_scenario(1);
    let up = root(&out, "E_PtScaleUp");
    assert_eq!(up.bin_content, plain(PT.iter().map(|p| (p * 1.1) * (p * 1.1))).bin_content);
    let down = root(&out, "E_PtScaleDown");
    assert_eq!(down.bin_content, plain(PT.iter().map(|p| (p * 0.9) * (p * 0.9))).bin_content);
    // 3.3^2 = 10.89 moves the last event one bin up.
    assert_relative_eq!(up.bin_content[10], 1.0);
    assert_relative_eq!(root(&out, "E").bin_content[9], 1.0);
}

#[test]
fn thread_count_does_not_change_content() {
    let reference = run_scenario(1);
    for threads in [2, 3, 8] {
        let out = run_scenario(threads);
        for name in ["E", "E_PtScaleUp", "E_PtScaleDown"] {
            let a = root(&reference, name);
            let b = root(&out, name);
            for (x, y) in a.bin_content.iter().zip(&b.bin_content) {
                assert_relative_eq!(*x, *y, max_relative = 1e-12);
            }
            assert_eq!(a.entries, b.entries);
        }
    }
}

#[test]
fn single_affected_variable_gets_no_slice() {
    // Without the catalog column registered, only E is affected by PtScale:
    // one affected variable does not earn its own fill slice.
    let mut frame = pt_frame(1);
    let mut registry = SystematicRegistry::new();
    registry.register_systematic("PtScale", ["pt"]);
    let mut p = Propagator::new(&mut frame, &mut registry);
    p.define_expr("E", "pt * pt").unwrap();
    p.define_constant("weight", 1.0).unwrap();
    p.define_constant("region", 0.0).unwrap();

    let def = HistogramDefinition::new("hE", "E", "E", "weight", 12, 0.0, 12.0).unwrap();
    let catalog: Vec<String> = ["Nominal", "PtScaleUp", "PtScaleDown"].map(String::from).to_vec();
    let axes = [SelectionAxis::variation("region", &catalog).unwrap()];
    let booked = book_nd(&mut frame, &registry, &[def], &axes, "all", &[catalog]).unwrap();
    assert_eq!(booked[0].num_fills(), 1);

    let out = flatten(&mut frame, &booked).unwrap();
    assert_eq!(out.n_histograms(), 1);
    assert!(out.get::<&str>(&[], "E").is_some());
}

#[test]
fn filters_apply_to_every_variation() {
    let mut frame = pt_frame(2);
    let mut registry = SystematicRegistry::new();
    registry.register_existing_systematics(&["PtScale"], &frame.column_names());
    let mut p = Propagator::new(&mut frame, &mut registry);
    p.define_expr("E", "pt * pt").unwrap();
    p.filter_expr("sel", "pt > 1.5").unwrap();
    p.define_constant("weight", 2.0).unwrap();
    let catalog = p.variation_catalog("systIdx").unwrap();

    let def = HistogramDefinition::new("hE", "E", "E", "weight", 12, 0.0, 12.0).unwrap();
    let axes = [SelectionAxis::variation("systIdx", &catalog).unwrap()];
    let booked = book_nd(&mut frame, &registry, &[def], &axes, "sr", &[catalog]).unwrap();
    let out = flatten(&mut frame, &booked).unwrap();

    let nominal = root(&out, "E");
    assert_eq!(nominal.entries, 2);
    assert_relative_eq!(nominal.bin_content.iter().sum::<f64>(), 4.0);
    assert_relative_eq!(nominal.sumw2.iter().sum::<f64>(), 8.0);
    assert_eq!(root(&out, "E_PtScaleUp").entries, 2);
}

#[test]
fn writes_directory_tree() {
    let out = run_scenario(2);
    let tmp = tempfile::tempdir().unwrap();
    out.write_json_tree(tmp.path()).unwrap();
    for name in ["E", "E_PtScaleUp", "E_PtScaleDown"] {
        assert!(tmp.path().join(format!("{name}.json")).is_file(), "{name}");
    }
}
