//! Built-in demonstration scenarios.
//!
//! Each scenario is a complete in-code model, standing in for the external
//! importer collaborator that would normally produce one.

use mf_dist::{ReleaseFunction, Sampler};
use mf_entropy::{FlowKind, FlowSeries, NodeRef};
use mf_model::{CompartmentSpec, ExternalInflowSpec, LocalReleaseSpec, Model, TransferSpec};
use mf_sim::Simulator;

pub struct ScenarioInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub const SCENARIOS: &[ScenarioInfo] = &[
    ScenarioInfo {
        name: "chain",
        description: "production -> use -> landfill, fixed inflow",
    },
    ScenarioInfo {
        name: "stock-release",
        description: "stochastic split into a Weibull-release stock and export",
    },
];

pub fn build(name: &str, periods: usize) -> Option<Model> {
    match name {
        "chain" => Some(chain(periods)),
        "stock-release" => Some(stock_release(periods)),
        _ => None,
    }
}

fn chain(periods: usize) -> Model {
    let mut model = Model::new("chain");
    model
        .add_compartment(
            CompartmentSpec::flow(
                "production",
                vec![TransferSpec::constant("use", 1.0, 1)],
            )
            .with_categories(vec!["industry".into()])
            .logged(true, true),
        )
        .expect("fresh model");
    model
        .add_compartment(
            CompartmentSpec::flow("use", vec![TransferSpec::constant("landfill", 1.0, 1)])
                .with_categories(vec!["consumption".into()])
                .logged(true, true),
        )
        .expect("fresh model");
    model
        .add_compartment(
            CompartmentSpec::sink("landfill")
                .with_categories(vec!["disposal".into()])
                .logged(true, false),
        )
        .expect("fresh model");
    model.add_inflow(ExternalInflowSpec::fixed_list(
        "production",
        &vec![1000.0; periods],
    ));
    model
}

fn stock_release(periods: usize) -> Model {
    let mut model = Model::new("stock-release");
    model
        .add_compartment(
            CompartmentSpec::flow(
                "production",
                vec![
                    TransferSpec::stochastic(
                        "in-use stock",
                        Sampler::Triangular {
                            low: 0.55,
                            mode: 0.6,
                            high: 0.65,
                        },
                        2,
                    ),
                    TransferSpec::constant("export", 0.4, 1),
                ],
            )
            .with_categories(vec!["industry".into()])
            .logged(true, true),
        )
        .expect("fresh model");
    model
        .add_compartment(
            CompartmentSpec::stock(
                "in-use stock",
                vec![TransferSpec::constant("landfill", 1.0, 1)],
                LocalReleaseSpec::Function {
                    function: ReleaseFunction::Weibull {
                        shape: 1.8,
                        scale: 6.0,
                        location: None,
                    },
                    delay: 0,
                },
            )
            .with_categories(vec!["consumption".into()])
            .logged(true, true),
        )
        .expect("fresh model");
    model
        .add_compartment(
            CompartmentSpec::sink("export")
                .with_categories(vec!["trade".into()])
                .logged(true, false),
        )
        .expect("fresh model");
    model
        .add_compartment(
            CompartmentSpec::sink("landfill")
                .with_categories(vec!["disposal".into()])
                .logged(true, false),
        )
        .expect("fresh model");
    model.add_inflow(
        ExternalInflowSpec::fixed_list("production", &vec![1000.0; periods]).with_derivation(
            Sampler::Normal {
                mean: 1.0,
                std_dev: 0.1,
            },
        ),
    );
    model
}

/// Background concentration the entropy normalizer is derived from.
const BACKGROUND_CONCENTRATION: f64 = 1e-6;

/// Substance concentration assumed on every demo flow.
const FLOW_CONCENTRATION: f64 = 0.02;

/// Entropy input for the stock-release scenario: stage 1 is the production
/// split, stage 2 the stock and its release path.
pub fn entropy_inputs(
    name: &str,
    sim: &Simulator,
    periods: usize,
) -> Option<(f64, Vec<FlowSeries>)> {
    if name != "stock-release" {
        return None;
    }
    let node = |n: &str| NodeRef::new(n, "demo", "t");
    let concentrations = vec![FLOW_CONCENTRATION; periods];
    let flows = sim.logged_flows();
    let inflows = sim.logged_inflows();

    let mut series = vec![
        FlowSeries::from_record(
            FlowKind::Flow,
            node("production"),
            node("in-use stock"),
            vec![1],
            flows["production"]["in-use stock"],
            concentrations.clone(),
        ),
        FlowSeries::from_record(
            FlowKind::Flow,
            node("production"),
            node("export"),
            vec![1],
            flows["production"]["export"],
            concentrations.clone(),
        ),
        // releases leave from the stock body node, downstream of the delay edge
        FlowSeries::from_record(
            FlowKind::Flow,
            node("in-use stock body"),
            node("landfill"),
            vec![2],
            flows["in-use stock"]["landfill"],
            concentrations.clone(),
        ),
    ];
    // the stock's net storage enters stage 2 as a delay flow
    series.push(FlowSeries::from_record(
        FlowKind::Delay,
        node("in-use stock"),
        node("in-use stock body"),
        vec![2],
        inflows["in-use stock"],
        concentrations,
    ));

    let h_max = (1.0 / BACKGROUND_CONCENTRATION).log2();
    Some((h_max, series))
}
