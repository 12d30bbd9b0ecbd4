//! Compartment specs: the nodes of the material-flow network.

use crate::release::{LocalReleaseSpec, PeriodDefinedReleaseSpec};
use crate::transfer::TransferSpec;

/// What a compartment does with the material flowing through it.
///
/// The source system modeled stocks as multiple inheritance over flow
/// compartments and sinks; here the behaviors are a closed tagged variant
/// and the simulator matches exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum CompartmentKind {
    /// Passes everything on within the period; no residence time.
    Flow {
        transfers: Vec<TransferSpec>,
        adjust_tcs: bool,
    },
    /// Accumulates all inflow forever.
    Sink,
    /// Accumulates inflow and releases it over later periods per a single
    /// release strategy; the profile's index-0 rate passes through
    /// immediately.
    Stock {
        transfers: Vec<TransferSpec>,
        adjust_tcs: bool,
        release: LocalReleaseSpec,
        log_immediate_flows: bool,
    },
    /// A stock whose release schedule and immediate rate are defined per
    /// outgoing target and per storage period.
    TargetDefinedStock {
        transfers: Vec<TransferSpec>,
        releases: Vec<PeriodDefinedReleaseSpec>,
        log_immediate_flows: bool,
    },
}

/// A named node plus logging/aggregation metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CompartmentSpec {
    pub name: String,
    pub categories: Vec<String>,
    pub log_inflows: bool,
    pub log_outflows: bool,
    pub kind: CompartmentKind,
}

impl CompartmentSpec {
    pub fn flow(name: impl Into<String>, transfers: Vec<TransferSpec>) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
            log_inflows: false,
            log_outflows: false,
            kind: CompartmentKind::Flow {
                transfers,
                adjust_tcs: true,
            },
        }
    }

    pub fn sink(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
            log_inflows: false,
            log_outflows: false,
            kind: CompartmentKind::Sink,
        }
    }

    pub fn stock(
        name: impl Into<String>,
        transfers: Vec<TransferSpec>,
        release: LocalReleaseSpec,
    ) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
            log_inflows: false,
            log_outflows: false,
            kind: CompartmentKind::Stock {
                transfers,
                adjust_tcs: true,
                release,
                log_immediate_flows: false,
            },
        }
    }

    pub fn target_defined_stock(
        name: impl Into<String>,
        transfers: Vec<TransferSpec>,
        releases: Vec<PeriodDefinedReleaseSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
            log_inflows: false,
            log_outflows: false,
            kind: CompartmentKind::TargetDefinedStock {
                transfers,
                releases,
                log_immediate_flows: false,
            },
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn logged(mut self, inflows: bool, outflows: bool) -> Self {
        self.log_inflows = inflows;
        self.log_outflows = outflows;
        self
    }

    /// Outgoing transfers, if this compartment kind has any.
    pub fn transfers(&self) -> &[TransferSpec] {
        match &self.kind {
            CompartmentKind::Flow { transfers, .. }
            | CompartmentKind::Stock { transfers, .. }
            | CompartmentKind::TargetDefinedStock { transfers, .. } => transfers,
            CompartmentKind::Sink => &[],
        }
    }

    /// Does material pass through this compartment within a period?
    pub fn is_flow_like(&self) -> bool {
        !matches!(self.kind, CompartmentKind::Sink)
    }

    /// Does this compartment carry inventory across periods?
    pub fn is_sink_like(&self) -> bool {
        matches!(
            self.kind,
            CompartmentKind::Sink
                | CompartmentKind::Stock { .. }
                | CompartmentKind::TargetDefinedStock { .. }
        )
    }

    /// Is this a stock (sink with scheduled future release)?
    pub fn is_stock(&self) -> bool {
        matches!(
            self.kind,
            CompartmentKind::Stock { .. } | CompartmentKind::TargetDefinedStock { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification() {
        let flow = CompartmentSpec::flow("use", vec![TransferSpec::constant("sink", 1.0, 1)]);
        let sink = CompartmentSpec::sink("landfill");
        let stock = CompartmentSpec::stock(
            "in-use stock",
            vec![TransferSpec::constant("sink", 1.0, 1)],
            LocalReleaseSpec::FixedRate {
                rate: 0.5,
                delay: 1,
            },
        );

        assert!(flow.is_flow_like() && !flow.is_sink_like() && !flow.is_stock());
        assert!(!sink.is_flow_like() && sink.is_sink_like() && !sink.is_stock());
        assert!(stock.is_flow_like() && stock.is_sink_like() && stock.is_stock());
        assert_eq!(sink.transfers().len(), 0);
        assert_eq!(stock.transfers().len(), 1);
    }
}
