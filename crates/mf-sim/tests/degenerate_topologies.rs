//! Integration test: structurally broken networks fail loudly.
//!
//! Configuration errors must abort with a descriptive error; they are never
//! skipped or papered over.

use mf_dist::Sampler;
use mf_model::{CompartmentSpec, ExternalInflowSpec, Model, PeriodTc, TransferKind, TransferSpec};
use mf_sim::{SimError, SimOptions, Simulator};

#[test]
fn conservative_cycle_makes_the_system_singular() {
    // a <-> b with TC 1.0 both ways: (I - T) loses rank and the period
    // equilibrium has no solution
    let mut model = Model::new("closed loop");
    model
        .add_compartment(CompartmentSpec::flow(
            "a",
            vec![TransferSpec::constant("b", 1.0, 1)],
        ))
        .unwrap();
    model
        .add_compartment(CompartmentSpec::flow(
            "b",
            vec![TransferSpec::constant("a", 1.0, 1)],
        ))
        .unwrap();
    model.add_inflow(ExternalInflowSpec::fixed_list("a", &[100.0]));

    let mut sim = Simulator::new(SimOptions {
        runs: 1,
        periods: 1,
        seed: 1,
        ..SimOptions::default()
    })
    .unwrap();
    sim.set_model(&model).unwrap();

    let err = sim.run().unwrap_err();
    assert!(matches!(
        err,
        SimError::SingularSystem { run: 0, period: 0 }
    ));
}

#[test]
fn lossy_cycle_still_solves() {
    // the same loop with TC 0.5 back keeps (I - T) invertible; the
    // equilibrium is the geometric series of the recirculation
    let mut model = Model::new("lossy loop");
    model
        .add_compartment(
            CompartmentSpec::flow("a", vec![TransferSpec::constant("b", 1.0, 1)]).logged(true, false),
        )
        .unwrap();
    model
        .add_compartment(
            CompartmentSpec::flow(
                "b",
                vec![
                    TransferSpec::constant("a", 0.5, 1),
                    TransferSpec::constant("out", 0.5, 1),
                ],
            )
            .logged(true, false),
        )
        .unwrap();
    model
        .add_compartment(CompartmentSpec::sink("out").logged(true, false))
        .unwrap();
    model.add_inflow(ExternalInflowSpec::fixed_list("a", &[100.0]));

    let mut sim = Simulator::new(SimOptions {
        runs: 1,
        periods: 1,
        seed: 1,
        ..SimOptions::default()
    })
    .unwrap();
    sim.set_model(&model).unwrap();
    sim.run().unwrap();

    let inflows = sim.logged_inflows();
    // x_a = 100 + 0.5 x_b, x_b = x_a  =>  x_a = x_b = 200
    assert!((inflows["a"].get(0, 0) - 200.0).abs() < 1e-9);
    assert!((inflows["b"].get(0, 0) - 200.0).abs() < 1e-9);
    assert!((inflows["out"].get(0, 0) - 100.0).abs() < 1e-9);
}

#[test]
fn unknown_transfer_target_fails_at_setup() {
    let mut model = Model::new("dangling edge");
    model
        .add_compartment(CompartmentSpec::flow(
            "a",
            vec![TransferSpec::constant("missing", 1.0, 1)],
        ))
        .unwrap();
    model.add_inflow(ExternalInflowSpec::fixed_list("a", &[1.0]));

    let mut sim = Simulator::new(SimOptions {
        runs: 1,
        periods: 1,
        ..SimOptions::default()
    })
    .unwrap();
    let err = sim.set_model(&model).unwrap_err();
    match err {
        SimError::UnknownTarget {
            compartment,
            target,
        } => {
            assert_eq!(compartment, "a");
            assert_eq!(target, "missing");
        }
        other => panic!("expected UnknownTarget, got {other}"),
    }
}

#[test]
fn period_defined_transfer_shorter_than_horizon_is_fatal() {
    let mut model = Model::new("short period list");
    model
        .add_compartment(CompartmentSpec::flow(
            "a",
            vec![TransferSpec {
                target: "out".into(),
                priority: 1,
                kind: TransferKind::PeriodDefined(vec![PeriodTc {
                    sampler: Sampler::Fixed(1.0),
                    priority: 1,
                }]),
            }],
        ))
        .unwrap();
    model.add_compartment(CompartmentSpec::sink("out")).unwrap();
    model.add_inflow(ExternalInflowSpec::fixed_list("a", &[1.0, 1.0]));

    // two periods, one configured TC entry
    let mut sim = Simulator::new(SimOptions {
        runs: 1,
        periods: 2,
        ..SimOptions::default()
    })
    .unwrap();
    sim.set_model(&model).unwrap();
    let err = sim.run().unwrap_err();
    assert!(matches!(err, SimError::Model(_)), "got {err}");
}
