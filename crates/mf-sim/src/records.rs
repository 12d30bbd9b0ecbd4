//! Logged simulation records and read-only views.
//!
//! Every record matrix is runs x periods, allocated to its final size when
//! the model is set and filled row-by-row as runs complete.

use mf_core::RunPeriodMatrix;

/// Coarse classification of a compartment, for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompartmentClass {
    Flow,
    Sink,
    Stock,
    TargetDefinedStock,
}

/// Read-only compartment listing entry.
#[derive(Debug, Clone, Copy)]
pub struct CompartmentView<'a> {
    pub name: &'a str,
    pub categories: &'a [String],
    pub class: CompartmentClass,
}

/// All record matrices of one compartment. Entries are `None` when the
/// corresponding log flag is off or the quantity does not apply.
#[derive(Debug, Clone)]
pub(crate) struct CompartmentRecords {
    /// Total resolved inflow per run/period.
    pub inflows: Option<RunPeriodMatrix>,
    /// Outflow per outgoing transfer (transfer order), per run/period.
    pub outflows: Option<Vec<(String, RunPeriodMatrix)>>,
    /// Immediate (pass-through) stock outflow per transfer, per run/period.
    pub immediate: Option<Vec<(String, RunPeriodMatrix)>>,
    /// Stored amount per run/period (sinks and stocks).
    pub inventory: Option<RunPeriodMatrix>,
}

impl CompartmentRecords {
    pub fn empty() -> Self {
        Self {
            inflows: None,
            outflows: None,
            immediate: None,
            inventory: None,
        }
    }
}
