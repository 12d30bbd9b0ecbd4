//! The model aggregate: a named, validated compartment network.

use std::collections::BTreeSet;

use crate::compartment::{CompartmentKind, CompartmentSpec};
use crate::error::{ModelError, ModelResult};
use crate::inflow::ExternalInflowSpec;
use crate::release::{LocalReleaseSpec, PeriodDefinedReleaseSpec};
use crate::transfer::TransferSpec;

/// A complete system description: compartments plus external inflows.
///
/// The model is the unit handed to the simulator; after `check_validity`
/// succeeds the simulator may assume a structurally sound network. Unknown
/// transfer targets are still resolved (and rejected) at setup, where the
/// dense index mapping is built.
#[derive(Debug, Clone, Default)]
pub struct Model {
    name: String,
    compartments: Vec<CompartmentSpec>,
    inflows: Vec<ExternalInflowSpec>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compartments: Vec::new(),
            inflows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compartments(&self) -> &[CompartmentSpec] {
        &self.compartments
    }

    pub fn inflows(&self) -> &[ExternalInflowSpec] {
        &self.inflows
    }

    /// Add a compartment; names must be unique.
    pub fn add_compartment(&mut self, compartment: CompartmentSpec) -> ModelResult<()> {
        if self.compartment(&compartment.name).is_some() {
            return Err(ModelError::DuplicateCompartment {
                name: compartment.name,
            });
        }
        self.compartments.push(compartment);
        Ok(())
    }

    pub fn add_inflow(&mut self, inflow: ExternalInflowSpec) {
        self.inflows.push(inflow);
    }

    /// Look up a compartment by name.
    pub fn compartment(&self, name: &str) -> Option<&CompartmentSpec> {
        self.compartments.iter().find(|c| c.name == name)
    }

    pub fn compartment_mut(&mut self, name: &str) -> Option<&mut CompartmentSpec> {
        self.compartments.iter_mut().find(|c| c.name == name)
    }

    /// Append a transfer to a named compartment.
    pub fn add_transfer(&mut self, name: &str, transfer: TransferSpec) -> ModelResult<()> {
        let compartment =
            self.compartment_mut(name)
                .ok_or_else(|| ModelError::UnknownCompartment {
                    name: name.to_string(),
                })?;
        match &mut compartment.kind {
            CompartmentKind::Flow { transfers, .. }
            | CompartmentKind::Stock { transfers, .. }
            | CompartmentKind::TargetDefinedStock { transfers, .. } => {
                transfers.push(transfer);
                Ok(())
            }
            CompartmentKind::Sink => Err(ModelError::NotAFlowCompartment {
                name: name.to_string(),
            }),
        }
    }

    /// Replace the release strategy of a named stock.
    pub fn set_release_strategy(
        &mut self,
        name: &str,
        strategy: LocalReleaseSpec,
    ) -> ModelResult<()> {
        let compartment =
            self.compartment_mut(name)
                .ok_or_else(|| ModelError::UnknownCompartment {
                    name: name.to_string(),
                })?;
        match &mut compartment.kind {
            CompartmentKind::Stock { release, .. } => {
                *release = strategy;
                Ok(())
            }
            _ => Err(ModelError::NotAStock {
                name: name.to_string(),
            }),
        }
    }

    /// Replace the per-period release strategies of a named
    /// target-defined-release stock.
    pub fn set_periodical_release_strategies(
        &mut self,
        name: &str,
        strategies: Vec<PeriodDefinedReleaseSpec>,
    ) -> ModelResult<()> {
        let compartment =
            self.compartment_mut(name)
                .ok_or_else(|| ModelError::UnknownCompartment {
                    name: name.to_string(),
                })?;
        match &mut compartment.kind {
            CompartmentKind::TargetDefinedStock { releases, .. } => {
                *releases = strategies;
                Ok(())
            }
            _ => Err(ModelError::NotAStock {
                name: name.to_string(),
            }),
        }
    }

    /// Union of all member categories, sorted for deterministic iteration.
    pub fn categories(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self
            .compartments
            .iter()
            .flat_map(|c| c.categories.iter())
            .collect();
        set.into_iter().cloned().collect()
    }

    /// Structural validation: flow compartments carry transfers, transfer
    /// and release parametrizations are well-formed, target-defined stocks
    /// pair every transfer with a release strategy, and at least one inflow
    /// exists.
    pub fn check_validity(&self) -> ModelResult<()> {
        for compartment in &self.compartments {
            if compartment.is_flow_like() && compartment.transfers().is_empty() {
                return Err(ModelError::NoTransfers {
                    name: compartment.name.clone(),
                });
            }
            for transfer in compartment.transfers() {
                transfer.validate()?;
            }
            if let CompartmentKind::TargetDefinedStock {
                transfers,
                releases,
                ..
            } = &compartment.kind
            {
                for transfer in transfers {
                    if !releases.iter().any(|r| r.target == transfer.target) {
                        return Err(ModelError::MissingRelease {
                            name: compartment.name.clone(),
                            target: transfer.target.clone(),
                        });
                    }
                }
                for release in releases {
                    if release.functions.len() != release.delays.len() {
                        return Err(ModelError::ReleaseListMismatch {
                            name: compartment.name.clone(),
                            target: release.target.clone(),
                            functions: release.functions.len(),
                            delays: release.delays.len(),
                        });
                    }
                }
            }
        }
        if self.inflows.is_empty() {
            return Err(ModelError::NoInflows);
        }
        for inflow in &self.inflows {
            inflow.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_dist::ReleaseFunction;

    fn simple_model() -> Model {
        let mut model = Model::new("test system");
        model
            .add_compartment(CompartmentSpec::flow(
                "use",
                vec![TransferSpec::constant("landfill", 1.0, 1)],
            ))
            .unwrap();
        model
            .add_compartment(CompartmentSpec::sink("landfill"))
            .unwrap();
        model.add_inflow(ExternalInflowSpec::fixed_list("use", &[100.0]));
        model
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut model = simple_model();
        let err = model
            .add_compartment(CompartmentSpec::sink("landfill"))
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateCompartment { .. }));
    }

    #[test]
    fn categories_are_a_sorted_union() {
        let mut model = Model::new("m");
        model
            .add_compartment(
                CompartmentSpec::sink("a").with_categories(vec!["soil".into(), "air".into()]),
            )
            .unwrap();
        model
            .add_compartment(CompartmentSpec::sink("b").with_categories(vec!["soil".into()]))
            .unwrap();
        assert_eq!(model.categories(), vec!["air".to_string(), "soil".into()]);
    }

    #[test]
    fn add_transfer_by_name() {
        let mut model = simple_model();
        model
            .add_transfer("use", TransferSpec::constant("landfill", 0.5, 2))
            .unwrap();
        assert_eq!(model.compartment("use").unwrap().transfers().len(), 2);

        let err = model
            .add_transfer("landfill", TransferSpec::constant("use", 0.5, 1))
            .unwrap_err();
        assert!(matches!(err, ModelError::NotAFlowCompartment { .. }));

        let err = model
            .add_transfer("nope", TransferSpec::constant("use", 0.5, 1))
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownCompartment { .. }));
    }

    #[test]
    fn validity_needs_transfers_and_inflows() {
        let mut model = Model::new("m");
        model
            .add_compartment(CompartmentSpec::flow("use", vec![]))
            .unwrap();
        assert!(matches!(
            model.check_validity().unwrap_err(),
            ModelError::NoTransfers { .. }
        ));

        let mut model = Model::new("m");
        model.add_compartment(CompartmentSpec::sink("s")).unwrap();
        assert!(matches!(
            model.check_validity().unwrap_err(),
            ModelError::NoInflows
        ));

        assert!(simple_model().check_validity().is_ok());
    }

    #[test]
    fn tdr_stock_needs_release_per_target() {
        let mut model = Model::new("m");
        model
            .add_compartment(CompartmentSpec::target_defined_stock(
                "landfill",
                vec![TransferSpec::constant("water", 1.0, 1)],
                vec![],
            ))
            .unwrap();
        model.add_compartment(CompartmentSpec::sink("water")).unwrap();
        model.add_inflow(ExternalInflowSpec::fixed_list("landfill", &[1.0]));
        assert!(matches!(
            model.check_validity().unwrap_err(),
            ModelError::MissingRelease { .. }
        ));

        model
            .set_periodical_release_strategies(
                "landfill",
                vec![PeriodDefinedReleaseSpec {
                    target: "water".into(),
                    functions: vec![ReleaseFunction::FixedRate(0.5)],
                    delays: vec![0],
                }],
            )
            .unwrap();
        assert!(model.check_validity().is_ok());
    }
}
