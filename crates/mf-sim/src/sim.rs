//! Simulator facade: options, record allocation, the Monte-Carlo loop, and
//! post-hoc result accessors.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use mf_core::RunPeriodMatrix;
use mf_model::Model;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::engine::{RunOutput, run_one};
use crate::error::{SimError, SimResult};
use crate::records::{CompartmentClass, CompartmentRecords, CompartmentView};
use crate::setup::{self, CompiledModel, RuntimeCompartment, RuntimeKind};

/// Options for a simulation experiment.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Number of independent Monte-Carlo runs (the sample size).
    pub runs: usize,
    /// Number of periods (e.g. years) the system is simulated over.
    pub periods: usize,
    /// Seed for all probability distributions; runs derive independent
    /// streams from it.
    pub seed: u64,
    /// Use the simulator-wide normalization switch instead of each
    /// compartment's own setting.
    pub use_global_tc_settings: bool,
    /// The simulator-wide normalization switch: adjust outgoing TCs to sum
    /// to one. Only honored together with `use_global_tc_settings`.
    pub normalize_tcs: bool,
    /// Fan runs out over the rayon thread pool. Results are identical to a
    /// sequential execution.
    pub parallel: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            runs: 100,
            periods: 10,
            seed: 1,
            use_global_tc_settings: true,
            normalize_tcs: true,
            parallel: false,
        }
    }
}

/// The simulation experiment driver.
///
/// Lifecycle: `new` -> `set_model` (compiles the network, allocates all
/// record matrices to their final runs x periods size) -> `run` (fills
/// them) -> accessors.
#[derive(Debug)]
pub struct Simulator {
    options: SimOptions,
    compiled: Option<CompiledModel>,
    records: Vec<CompartmentRecords>,
}

impl Simulator {
    pub fn new(options: SimOptions) -> SimResult<Self> {
        if options.runs == 0 {
            return Err(SimError::InvalidOptions {
                what: "runs must be positive",
            });
        }
        if options.periods == 0 {
            return Err(SimError::InvalidOptions {
                what: "periods must be positive",
            });
        }
        Ok(Self {
            options,
            compiled: None,
            records: Vec::new(),
        })
    }

    pub fn options(&self) -> &SimOptions {
        &self.options
    }

    /// Compile and freeze the model: dense compartment numbers, resolved
    /// targets, discretized release profiles, allocated record matrices.
    pub fn set_model(&mut self, model: &Model) -> SimResult<()> {
        let compiled = setup::compile(model, self.options.seed)?;
        let runs = self.options.runs;
        let periods = self.options.periods;

        let mut records = Vec::with_capacity(compiled.compartments.len());
        for comp in &compiled.compartments {
            let mut record = CompartmentRecords::empty();
            if comp.log_inflows {
                record.inflows = Some(RunPeriodMatrix::zeros(runs, periods));
            }
            if comp.log_outflows && comp.is_flow_like() {
                record.outflows = Some(
                    comp.transfers
                        .iter()
                        .map(|t| (t.spec.target.clone(), RunPeriodMatrix::zeros(runs, periods)))
                        .collect(),
                );
            }
            if comp.logs_immediate_flows() {
                record.immediate = Some(
                    comp.transfers
                        .iter()
                        .map(|t| (t.spec.target.clone(), RunPeriodMatrix::zeros(runs, periods)))
                        .collect(),
                );
            }
            if comp.is_sink_like() {
                record.inventory = Some(RunPeriodMatrix::zeros(runs, periods));
            }
            records.push(record);
        }

        self.records = records;
        self.compiled = Some(compiled);
        Ok(())
    }

    /// Execute all runs and merge their log rows into the record matrices.
    pub fn run(&mut self) -> SimResult<()> {
        let compiled = self.compiled.as_ref().ok_or(SimError::NoModel)?;
        let SimOptions {
            runs,
            periods,
            seed,
            use_global_tc_settings,
            normalize_tcs,
            parallel,
        } = self.options.clone();

        info!(
            model = %compiled.name,
            seed,
            runs,
            periods,
            parallel,
            "starting simulation"
        );

        let outputs: SimResult<Vec<RunOutput>> = if parallel {
            (0..runs)
                .into_par_iter()
                .map(|run| {
                    run_one(
                        compiled,
                        run,
                        periods,
                        seed,
                        use_global_tc_settings,
                        normalize_tcs,
                    )
                })
                .collect()
        } else {
            (0..runs)
                .map(|run| {
                    let output = run_one(
                        compiled,
                        run,
                        periods,
                        seed,
                        use_global_tc_settings,
                        normalize_tcs,
                    )?;
                    debug!(run, "run complete");
                    Ok(output)
                })
                .collect()
        };
        let outputs = outputs?;

        for (run, output) in outputs.into_iter().enumerate() {
            self.merge_run(run, output)?;
        }

        info!("simulation complete");
        Ok(())
    }

    fn merge_run(&mut self, run: usize, output: RunOutput) -> SimResult<()> {
        for (record, row) in self.records.iter_mut().zip(output.inflows) {
            if let (Some(matrix), Some(row)) = (record.inflows.as_mut(), row) {
                matrix.set_row(run, &row)?;
            }
        }
        for (record, rows) in self.records.iter_mut().zip(output.outflows) {
            if let (Some(matrices), Some(rows)) = (record.outflows.as_mut(), rows) {
                for ((_, matrix), row) in matrices.iter_mut().zip(rows) {
                    matrix.set_row(run, &row)?;
                }
            }
        }
        for (record, rows) in self.records.iter_mut().zip(output.immediate) {
            if let (Some(matrices), Some(rows)) = (record.immediate.as_mut(), rows) {
                for ((_, matrix), row) in matrices.iter_mut().zip(rows) {
                    matrix.set_row(run, &row)?;
                }
            }
        }
        for (record, row) in self.records.iter_mut().zip(output.inventory) {
            if let (Some(matrix), Some(row)) = (record.inventory.as_mut(), row) {
                matrix.set_row(run, &row)?;
            }
        }
        Ok(())
    }

    fn runtime_compartments(&self) -> &[RuntimeCompartment] {
        self.compiled
            .as_ref()
            .map(|c| c.compartments.as_slice())
            .unwrap_or(&[])
    }

    fn view(comp: &RuntimeCompartment) -> CompartmentView<'_> {
        let class = match &comp.kind {
            RuntimeKind::Flow { .. } => CompartmentClass::Flow,
            RuntimeKind::Sink => CompartmentClass::Sink,
            RuntimeKind::Stock { .. } => CompartmentClass::Stock,
            RuntimeKind::TargetDefinedStock { .. } => CompartmentClass::TargetDefinedStock,
        };
        CompartmentView {
            name: &comp.name,
            categories: &comp.categories,
            class,
        }
    }

    /// All compartments, in dense-number order.
    pub fn compartments(&self) -> Vec<CompartmentView<'_>> {
        self.runtime_compartments().iter().map(Self::view).collect()
    }

    /// Compartments that pass material on within a period.
    pub fn flow_compartments(&self) -> Vec<CompartmentView<'_>> {
        self.runtime_compartments()
            .iter()
            .filter(|c| c.is_flow_like())
            .map(Self::view)
            .collect()
    }

    /// Compartments that accumulate material (sinks and stocks).
    pub fn sinks(&self) -> Vec<CompartmentView<'_>> {
        self.runtime_compartments()
            .iter()
            .filter(|c| c.is_sink_like())
            .map(Self::view)
            .collect()
    }

    /// Stocks only (sinks with scheduled future release).
    pub fn stocks(&self) -> Vec<CompartmentView<'_>> {
        self.runtime_compartments()
            .iter()
            .filter(|c| c.is_stock())
            .map(Self::view)
            .collect()
    }

    /// The model-wide category list.
    pub fn categories(&self) -> &[String] {
        self.compiled
            .as_ref()
            .map(|c| c.categories.as_slice())
            .unwrap_or(&[])
    }

    pub fn compartments_of_category(&self, category: &str) -> Vec<CompartmentView<'_>> {
        self.runtime_compartments()
            .iter()
            .filter(|c| c.categories.iter().any(|cat| cat == category))
            .map(Self::view)
            .collect()
    }

    /// Inventory matrices of every sink and stock, keyed by name.
    pub fn all_stocked_material(&self) -> BTreeMap<&str, &RunPeriodMatrix> {
        self.zip_records()
            .filter_map(|(comp, record)| {
                record
                    .inventory
                    .as_ref()
                    .map(|matrix| (comp.name.as_str(), matrix))
            })
            .collect()
    }

    /// Logged inflow matrices, keyed by compartment name.
    pub fn logged_inflows(&self) -> BTreeMap<&str, &RunPeriodMatrix> {
        self.zip_records()
            .filter_map(|(comp, record)| {
                record
                    .inflows
                    .as_ref()
                    .map(|matrix| (comp.name.as_str(), matrix))
            })
            .collect()
    }

    /// All logged flows between compartments: source -> target -> matrix.
    pub fn logged_flows(&self) -> BTreeMap<&str, BTreeMap<&str, &RunPeriodMatrix>> {
        self.zip_records()
            .filter_map(|(comp, record)| {
                record.outflows.as_ref().map(|outflows| {
                    let flows: BTreeMap<&str, &RunPeriodMatrix> = outflows
                        .iter()
                        .map(|(target, matrix)| (target.as_str(), matrix))
                        .collect();
                    (comp.name.as_str(), flows)
                })
            })
            .collect()
    }

    /// Total outflow (summed over targets) per logging compartment.
    pub fn logged_total_outflows(&self) -> BTreeMap<String, RunPeriodMatrix> {
        let mut totals = BTreeMap::new();
        for (comp, record) in self.zip_records() {
            if let Some(outflows) = record.outflows.as_ref() {
                if let Some(total) = Self::sum_matrices(outflows.iter().map(|(_, m)| m)) {
                    totals.insert(comp.name.clone(), total);
                }
            }
        }
        totals
    }

    /// Immediate (pass-through) flows of stocks that log them:
    /// stock -> target -> matrix.
    pub fn immediate_flows_from_stocks(&self) -> BTreeMap<&str, BTreeMap<&str, &RunPeriodMatrix>> {
        self.zip_records()
            .filter_map(|(comp, record)| {
                record.immediate.as_ref().map(|immediate| {
                    let flows: BTreeMap<&str, &RunPeriodMatrix> = immediate
                        .iter()
                        .map(|(target, matrix)| (target.as_str(), matrix))
                        .collect();
                    (comp.name.as_str(), flows)
                })
            })
            .collect()
    }

    /// Summed inventory over all sinks/stocks of a category; `None` when the
    /// category has no inventory-tracking members.
    pub fn logged_category_stock(&self, category: &str) -> Option<RunPeriodMatrix> {
        Self::sum_matrices(
            self.zip_records()
                .filter(|(comp, _)| comp.categories.iter().any(|c| c == category))
                .filter_map(|(_, record)| record.inventory.as_ref()),
        )
    }

    /// Summed logged inflow over all compartments of a category.
    pub fn logged_category_inflows(&self, category: &str) -> Option<RunPeriodMatrix> {
        Self::sum_matrices(
            self.zip_records()
                .filter(|(comp, _)| comp.categories.iter().any(|c| c == category))
                .filter_map(|(_, record)| record.inflows.as_ref()),
        )
    }

    /// Sum of all outflows from compartments of a category to any target.
    pub fn logged_category_outflow_sum(&self, category: &str) -> Option<RunPeriodMatrix> {
        Self::sum_matrices(
            self.zip_records()
                .filter(|(comp, _)| comp.categories.iter().any(|c| c == category))
                .filter_map(|(_, record)| record.outflows.as_ref())
                .flat_map(|outflows| outflows.iter().map(|(_, m)| m)),
        )
    }

    /// Outflows from compartments of a category, merged per target name.
    pub fn logged_category_outflows(&self, category: &str) -> BTreeMap<String, RunPeriodMatrix> {
        let mut merged: BTreeMap<String, RunPeriodMatrix> = BTreeMap::new();
        for (comp, record) in self.zip_records() {
            if !comp.categories.iter().any(|c| c == category) {
                continue;
            }
            let Some(outflows) = record.outflows.as_ref() else {
                continue;
            };
            for (target, matrix) in outflows {
                match merged.entry(target.clone()) {
                    Entry::Occupied(mut entry) => {
                        // shapes always match: all matrices share runs x periods
                        let _ = entry.get_mut().add_matrix(matrix);
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(matrix.clone());
                    }
                }
            }
        }
        merged
    }

    /// Sum of the immediate stock outflows of a category.
    pub fn category_immediate_flow_sum(&self, category: &str) -> Option<RunPeriodMatrix> {
        Self::sum_matrices(
            self.zip_records()
                .filter(|(comp, _)| comp.categories.iter().any(|c| c == category))
                .filter_map(|(_, record)| record.immediate.as_ref())
                .flat_map(|immediate| immediate.iter().map(|(_, m)| m)),
        )
    }

    fn zip_records(&self) -> impl Iterator<Item = (&RuntimeCompartment, &CompartmentRecords)> {
        self.runtime_compartments().iter().zip(self.records.iter())
    }

    fn sum_matrices<'a>(
        mut matrices: impl Iterator<Item = &'a RunPeriodMatrix>,
    ) -> Option<RunPeriodMatrix> {
        let mut total = matrices.next()?.clone();
        for matrix in matrices {
            let _ = total.add_matrix(matrix);
        }
        Some(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_validated() {
        assert!(matches!(
            Simulator::new(SimOptions {
                runs: 0,
                ..SimOptions::default()
            })
            .unwrap_err(),
            SimError::InvalidOptions { .. }
        ));
        assert!(matches!(
            Simulator::new(SimOptions {
                periods: 0,
                ..SimOptions::default()
            })
            .unwrap_err(),
            SimError::InvalidOptions { .. }
        ));
    }

    #[test]
    fn run_without_model_fails() {
        let mut sim = Simulator::new(SimOptions::default()).unwrap();
        assert!(matches!(sim.run().unwrap_err(), SimError::NoModel));
    }

    #[test]
    fn accessors_are_empty_before_set_model() {
        let sim = Simulator::new(SimOptions::default()).unwrap();
        assert!(sim.compartments().is_empty());
        assert!(sim.logged_flows().is_empty());
        assert!(sim.all_stocked_material().is_empty());
        assert!(sim.logged_category_stock("soil").is_none());
    }
}
