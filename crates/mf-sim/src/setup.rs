//! Model compilation: from the declarative `mf_model::Model` to the runtime
//! network the engine iterates over.
//!
//! Setup assigns every compartment its dense 0..N-1 number (its row/column
//! in the per-period linear system, fixed here and never mutated
//! afterwards), resolves transfer target names to numbers, and discretizes
//! release strategies into profiles.

use std::collections::HashMap;

use mf_dist::ReleaseProfile;
use mf_model::{CompartmentKind, Model, TransferSpec};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::{SimError, SimResult};

/// A resolved outgoing edge: the sampling spec plus the target's dense
/// compartment number.
#[derive(Debug, Clone)]
pub(crate) struct RuntimeTransfer {
    pub spec: TransferSpec,
    pub target: usize,
}

/// Per-kind runtime behavior data.
#[derive(Debug, Clone)]
pub(crate) enum RuntimeKind {
    Flow {
        adjust_tcs: bool,
    },
    Sink,
    Stock {
        adjust_tcs: bool,
        profile: ReleaseProfile,
        log_immediate_flows: bool,
    },
    /// One profile per storage period, per outgoing transfer (indexed in
    /// transfer order).
    TargetDefinedStock {
        profiles: Vec<Vec<ReleaseProfile>>,
        log_immediate_flows: bool,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeCompartment {
    pub number: usize,
    pub name: String,
    pub categories: Vec<String>,
    pub log_inflows: bool,
    pub log_outflows: bool,
    pub transfers: Vec<RuntimeTransfer>,
    pub kind: RuntimeKind,
}

impl RuntimeCompartment {
    pub fn is_flow_like(&self) -> bool {
        !matches!(self.kind, RuntimeKind::Sink)
    }

    pub fn is_sink_like(&self) -> bool {
        !matches!(self.kind, RuntimeKind::Flow { .. })
    }

    pub fn is_stock(&self) -> bool {
        matches!(
            self.kind,
            RuntimeKind::Stock { .. } | RuntimeKind::TargetDefinedStock { .. }
        )
    }

    pub fn logs_immediate_flows(&self) -> bool {
        match &self.kind {
            RuntimeKind::Stock {
                log_immediate_flows,
                ..
            }
            | RuntimeKind::TargetDefinedStock {
                log_immediate_flows,
                ..
            } => *log_immediate_flows,
            _ => false,
        }
    }

    /// Fraction of this period's resolved inflow that passes straight
    /// through transfer `idx`. Exactly 1 for plain flow compartments.
    pub fn immediate_rate(&self, idx: usize, period: usize) -> SimResult<f64> {
        match &self.kind {
            RuntimeKind::Flow { .. } => Ok(1.0),
            RuntimeKind::Sink => Ok(0.0),
            RuntimeKind::Stock { profile, .. } => Ok(profile.immediate_rate()),
            RuntimeKind::TargetDefinedStock { profiles, .. } => {
                let per_period = &profiles[idx];
                per_period
                    .get(period)
                    .map(|p| p.immediate_rate())
                    .ok_or_else(|| SimError::ReleasePeriodOutOfRange {
                        stock: self.name.clone(),
                        period,
                        len: per_period.len(),
                    })
            }
        }
    }

    /// Should this compartment's outgoing TCs be normalized?
    pub fn adjusts_tcs(&self, use_global_settings: bool, global_adjust: bool) -> bool {
        let local = match &self.kind {
            RuntimeKind::Flow { adjust_tcs } | RuntimeKind::Stock { adjust_tcs, .. } => *adjust_tcs,
            RuntimeKind::TargetDefinedStock { .. } => true,
            RuntimeKind::Sink => false,
        };
        if !self.is_flow_like() {
            return false;
        }
        if use_global_settings {
            global_adjust
        } else {
            local
        }
    }
}

/// The frozen network: compartments in dense-number order plus the inflow
/// specs and derived category list.
#[derive(Debug, Clone)]
pub(crate) struct CompiledModel {
    pub name: String,
    pub compartments: Vec<RuntimeCompartment>,
    pub inflows: Vec<(usize, mf_model::ExternalInflowSpec)>,
    pub categories: Vec<String>,
}

/// Validate and freeze a model.
///
/// Release-profile discretization may itself draw random rates, so it uses
/// a dedicated stream off the simulation seed and stays independent of the
/// per-run streams.
pub(crate) fn compile(model: &Model, seed: u64) -> SimResult<CompiledModel> {
    model.check_validity()?;

    let mut numbers: HashMap<&str, usize> = HashMap::new();
    for (number, spec) in model.compartments().iter().enumerate() {
        numbers.insert(spec.name.as_str(), number);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut compartments = Vec::with_capacity(model.compartments().len());

    for (number, spec) in model.compartments().iter().enumerate() {
        let mut transfers = Vec::with_capacity(spec.transfers().len());
        for transfer in spec.transfers() {
            let target = *numbers.get(transfer.target.as_str()).ok_or_else(|| {
                SimError::UnknownTarget {
                    compartment: spec.name.clone(),
                    target: transfer.target.clone(),
                }
            })?;
            transfers.push(RuntimeTransfer {
                spec: transfer.clone(),
                target,
            });
        }

        let kind = match &spec.kind {
            CompartmentKind::Flow { adjust_tcs, .. } => RuntimeKind::Flow {
                adjust_tcs: *adjust_tcs,
            },
            CompartmentKind::Sink => RuntimeKind::Sink,
            CompartmentKind::Stock {
                adjust_tcs,
                release,
                log_immediate_flows,
                ..
            } => RuntimeKind::Stock {
                adjust_tcs: *adjust_tcs,
                profile: release.build_profile(&mut rng)?,
                log_immediate_flows: *log_immediate_flows,
            },
            CompartmentKind::TargetDefinedStock {
                transfers: transfer_specs,
                releases,
                log_immediate_flows,
            } => {
                // profiles ordered to match the transfer list
                let mut profiles = Vec::with_capacity(transfer_specs.len());
                for transfer in transfer_specs {
                    let release = releases
                        .iter()
                        .find(|r| r.target == transfer.target)
                        .ok_or_else(|| SimError::UnknownTarget {
                            compartment: spec.name.clone(),
                            target: transfer.target.clone(),
                        })?;
                    profiles.push(release.build_profiles(&spec.name, &mut rng)?);
                }
                RuntimeKind::TargetDefinedStock {
                    profiles,
                    log_immediate_flows: *log_immediate_flows,
                }
            }
        };

        compartments.push(RuntimeCompartment {
            number,
            name: spec.name.clone(),
            categories: spec.categories.clone(),
            log_inflows: spec.log_inflows,
            log_outflows: spec.log_outflows,
            transfers,
            kind,
        });
    }

    let mut inflows = Vec::with_capacity(model.inflows().len());
    for inflow in model.inflows() {
        let target = *numbers.get(inflow.target.as_str()).ok_or_else(|| {
            SimError::UnknownTarget {
                compartment: "external inflow".to_string(),
                target: inflow.target.clone(),
            }
        })?;
        inflows.push((target, inflow.clone()));
    }

    Ok(CompiledModel {
        name: model.name().to_string(),
        compartments,
        inflows,
        categories: model.categories(),
    })
}
