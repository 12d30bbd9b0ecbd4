//! Flow series input and per-period flow records.

use mf_core::{Real, RunPeriodMatrix};

/// Identity of a network node for entropy purposes: name plus the material
/// and unit it is declared in. Two nodes match only on all three.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub name: String,
    pub material: String,
    pub unit: String,
}

impl NodeRef {
    pub fn new(
        name: impl Into<String>,
        material: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            material: material.into(),
            unit: unit.into(),
        }
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.name, self.material, self.unit)
    }
}

/// How a flow participates in the entropy computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    /// Ordinary transfer between compartments.
    Flow,
    /// External inflow into the system boundary.
    Inflow,
    /// Flow into a stock node; its raw logged value is throughput, so the
    /// net node balance (inflow - outflow) is resolved before weighting.
    Delay,
}

/// One flow's mean trajectory plus its substance concentrations.
///
/// `values` are the per-period means of the simulator's logged flow record;
/// `stages` are the pipeline stages this flow belongs to (possibly several).
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSeries {
    pub kind: FlowKind,
    pub source: NodeRef,
    pub dest: NodeRef,
    pub stages: Vec<u32>,
    /// The series carries substance amounts rather than material amounts;
    /// material is recovered by dividing by the concentration.
    pub substance_given: bool,
    pub values: Vec<Real>,
    pub concentrations: Vec<Real>,
}

impl FlowSeries {
    pub fn new(
        kind: FlowKind,
        source: NodeRef,
        dest: NodeRef,
        stages: Vec<u32>,
        values: Vec<Real>,
        concentrations: Vec<Real>,
    ) -> Self {
        Self {
            kind,
            source,
            dest,
            stages,
            substance_given: false,
            values,
            concentrations,
        }
    }

    /// Build a series from a logged runs x periods record, averaging over
    /// runs. This is the bridge from the simulator's record matrices.
    pub fn from_record(
        kind: FlowKind,
        source: NodeRef,
        dest: NodeRef,
        stages: Vec<u32>,
        record: &RunPeriodMatrix,
        concentrations: Vec<Real>,
    ) -> Self {
        Self::new(
            kind,
            source,
            dest,
            stages,
            record.mean_per_period(),
            concentrations,
        )
    }

    pub fn substance_given(mut self) -> Self {
        self.substance_given = true;
        self
    }
}

/// Declared factor series converting one unit into another, applied to any
/// flow whose source carries `from_unit` and whose destination carries
/// `to_unit`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitConversion {
    pub from_unit: String,
    pub to_unit: String,
    pub factors: Vec<Real>,
}

/// A flow's resolved state within one period.
#[derive(Debug, Clone)]
pub(crate) struct FlowRecord {
    pub kind: FlowKind,
    pub source: NodeRef,
    pub dest: NodeRef,
    pub stages: Vec<u32>,
    pub material_flow: Real,
    pub substance_flow: Real,
    pub concentration: Real,
}

impl FlowRecord {
    pub fn new(series: &FlowSeries, period: usize) -> Self {
        let value = series.values[period];
        let concentration = series.concentrations[period];
        let (material_flow, substance_flow) = if concentration == 0.0 {
            (0.0, 0.0)
        } else if series.substance_given {
            (value / concentration, value)
        } else {
            (value, value * concentration)
        };
        Self {
            kind: series.kind,
            source: series.source.clone(),
            dest: series.dest.clone(),
            stages: series.stages.clone(),
            material_flow,
            substance_flow,
            concentration,
        }
    }

    /// Replace the material flow, keeping the concentration (used when a
    /// delay flow is resolved to its net node balance).
    pub fn set_material_flow(&mut self, value: Real) {
        self.material_flow = value;
        self.substance_flow = value * self.concentration;
    }

    /// Scale both flows by a unit-conversion factor.
    pub fn convert(&mut self, factor: Real) {
        self.material_flow *= factor;
        self.substance_flow *= factor;
    }

    pub fn in_stage(&self, stage: u32) -> bool {
        self.stages.contains(&stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(value: Real, concentration: Real) -> FlowSeries {
        FlowSeries::new(
            FlowKind::Flow,
            NodeRef::new("a", "pvc", "t"),
            NodeRef::new("b", "pvc", "t"),
            vec![1],
            vec![value],
            vec![concentration],
        )
    }

    #[test]
    fn record_multiplies_concentration() {
        let record = FlowRecord::new(&series(100.0, 0.02), 0);
        assert_eq!(record.material_flow, 100.0);
        assert!((record.substance_flow - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_concentration_zeroes_both_flows() {
        let record = FlowRecord::new(&series(100.0, 0.0), 0);
        assert_eq!(record.material_flow, 0.0);
        assert_eq!(record.substance_flow, 0.0);
    }

    #[test]
    fn substance_given_recovers_material() {
        let record = FlowRecord::new(&series(2.0, 0.02).substance_given(), 0);
        assert!((record.material_flow - 100.0).abs() < 1e-9);
        assert_eq!(record.substance_flow, 2.0);
    }

    #[test]
    fn mean_series_from_record_matrix() {
        let mut matrix = RunPeriodMatrix::zeros(2, 2);
        matrix.set(0, 0, 10.0);
        matrix.set(1, 0, 30.0);
        let series = FlowSeries::from_record(
            FlowKind::Flow,
            NodeRef::new("a", "pvc", "t"),
            NodeRef::new("b", "pvc", "t"),
            vec![1],
            &matrix,
            vec![0.5, 0.5],
        );
        assert_eq!(series.values, vec![20.0, 0.0]);
    }
}
