//! Per-period flow partition and pre-passes.

use mf_core::Real;

use crate::flow::{FlowKind, FlowRecord, UnitConversion};

/// All flow records of one period, after pre-processing.
#[derive(Debug, Clone)]
pub(crate) struct PeriodFlows {
    pub flows: Vec<FlowRecord>,
}

impl PeriodFlows {
    pub fn new(flows: Vec<FlowRecord>) -> Self {
        Self { flows }
    }

    /// Resolve delay flows to the net balance of their stock node.
    ///
    /// A stock's logged flow value is throughput; the entropy weighting
    /// needs what actually stays at the node this period, which is the sum
    /// of flows into the stock minus the sum of flows leaving it.
    pub fn resolve_delay_net_values(&mut self) {
        let nets: Vec<Option<Real>> = self
            .flows
            .iter()
            .map(|flow| {
                if flow.kind != FlowKind::Delay {
                    return None;
                }
                let inflow: Real = self
                    .flows
                    .iter()
                    .filter(|other| other.dest == flow.source)
                    .map(|other| other.material_flow)
                    .sum();
                let outflow: Real = self
                    .flows
                    .iter()
                    .filter(|other| other.source == flow.dest)
                    .map(|other| other.material_flow)
                    .sum();
                Some(inflow - outflow)
            })
            .collect();

        for (flow, net) in self.flows.iter_mut().zip(nets) {
            if let Some(net) = net {
                flow.set_material_flow(net);
            }
        }
    }

    /// Apply declared unit conversions for this period.
    pub fn convert_units(&mut self, conversions: &[UnitConversion], period: usize) {
        for flow in &mut self.flows {
            for conversion in conversions {
                if flow.source.unit == conversion.from_unit
                    && flow.dest.unit == conversion.to_unit
                {
                    flow.convert(conversion.factors[period]);
                }
            }
        }
    }

    pub fn stage_flows(&self, stage: u32) -> impl Iterator<Item = &FlowRecord> {
        self.flows.iter().filter(move |f| f.in_stage(stage))
    }
}
