use approx::assert_relative_eq;
use ns_frame::{ColumnarEngine, Frame, Kernel};
use ns_syst::{Propagator, SystematicRegistry};

fn frame() -> Frame {
    Frame::from_columns([
        ("x", vec![1.0, 2.0, 4.0]),
        ("x_JESUp", vec![1.5, 2.5, 4.5]),
        ("x_JESDown", vec![0.5, 1.5, 3.5]),
        ("y", vec![3.0, 3.0, 3.0]),
        ("y_JERUp", vec![3.3, 3.3, 3.3]),
        ("y_JERDown", vec![2.7, 2.7, 2.7]),
        ("k", vec![2.0, 2.0, 2.0]),
    ])
    .unwrap()
}

#[test]
fn empty_systematics_never_create_variations() {
    let mut f = frame();
    let mut reg = SystematicRegistry::new();
    reg.register_existing_systematics(&["JES", "Lumi", "JER"], &f.column_names());
    assert!(reg.contains("Lumi"));
    assert!(reg.variables_for_systematic("Lumi").is_empty());

    let mut p = Propagator::new(&mut f, &mut reg);
    p.define_expr("a", "x * y").unwrap();
    p.define_expr("b", "a + k").unwrap();
    let cat = p.variation_catalog("idx").unwrap();

    assert_eq!(cat.len(), 1 + 2 * 3);
    assert!(f.column_names().iter().all(|c| !c.contains("LumiUp") || c == "idx_LumiUp"));
    assert_eq!(reg.systematics_for_variable("b"), ["JES", "JER"]);
}

#[test]
fn two_systematics_vary_independently() {
    let mut f = frame();
    let mut reg = SystematicRegistry::new();
    reg.register_existing_systematics(&["JES", "JER"], &f.column_names());

    Propagator::new(&mut f, &mut reg)
        .define("m", Kernel::scalar(|v| v[0] * v[1] + v[2]), &["x", "y", "k"])
        .unwrap();

    let jes_up = f.snapshot("m_JESUp").unwrap();
    let jer_down = f.snapshot("m_JERDown").unwrap();
    for i in 0..3 {
        let x = [1.0, 2.0, 4.0][i];
        assert_relative_eq!(jes_up[i], (x + 0.5) * 3.0 + 2.0);
        assert_relative_eq!(jer_down[i], x * 2.7 + 2.0);
    }
    assert!(!f.column_exists("k_JESUp"));
    assert!(!f.column_exists("m_JESJERUp"));
}

#[test]
fn vector_definitions_propagate() {
    let mut f = frame();
    let mut reg = SystematicRegistry::new();
    reg.register_systematic("JES", ["x"]);
    let affecting = Propagator::new(&mut f, &mut reg)
        .define("pair", Kernel::vector(|v, out| out.extend([v[0], 2.0 * v[0]])), &["x"])
        .unwrap();
    assert_eq!(affecting, ["JES"]);
    assert_eq!(f.column_type("pair_JESUp"), f.column_type("pair"));
    assert_eq!(reg.systematics_for_variable("pair"), ["JES"]);
}
