//! Result data types.

use mf_core::RunPeriodMatrix;
use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub model: String,
    pub seed: u64,
    pub runs: usize,
    pub periods: usize,
    pub timestamp: String,
    pub engine_version: String,
}

/// Per-period percentile trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentileSeries {
    pub percentile: f64,
    pub values: Vec<f64>,
}

/// Per-period aggregation of one runs x periods record.
///
/// Median and percentiles are only meaningful over several runs; with a
/// single run they are omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub mean: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub percentiles: Vec<PercentileSeries>,
}

impl SummaryStatistics {
    pub fn from_record(
        record: &RunPeriodMatrix,
        include_median: bool,
        percentiles: &[f64],
    ) -> Self {
        let multi_run = record.runs() > 1;
        Self {
            mean: record.mean_per_period(),
            median: (include_median && multi_run).then(|| record.median_per_period()),
            percentiles: if multi_run {
                percentiles
                    .iter()
                    .map(|&p| PercentileSeries {
                        percentile: p,
                        values: record.percentile_per_period(p),
                    })
                    .collect()
            } else {
                Vec::new()
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSummary {
    pub source: String,
    pub target: String,
    pub stats: SummaryStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InflowSummary {
    pub compartment: String,
    pub stats: SummaryStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySummary {
    pub compartment: String,
    pub stats: SummaryStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntropySummary {
    pub stage: u32,
    pub values: Vec<f64>,
}

/// The complete serializable outcome of one simulation experiment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimulationSummary {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inflows: Vec<InflowSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flows: Vec<FlowSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inventories: Vec<InventorySummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entropy: Vec<EntropySummary>,
}
