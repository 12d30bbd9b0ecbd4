use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Duplicate compartment name: {name}")]
    DuplicateCompartment { name: String },

    #[error("No such compartment: {name}")]
    UnknownCompartment { name: String },

    #[error("Compartment {name} accepts no outgoing transfers")]
    NotAFlowCompartment { name: String },

    #[error("Compartment {name} is not a stock")]
    NotAStock { name: String },

    #[error("Flow compartment {name} has no outgoing transfers")]
    NoTransfers { name: String },

    #[error("Stock {name} has no release strategy for target {target}")]
    MissingRelease { name: String, target: String },

    #[error("Model has no external inflows")]
    NoInflows,

    #[error(
        "Period-defined transfer to {target}: period {period} outside the configured {len} periods"
    )]
    TransferPeriodOutOfRange {
        target: String,
        period: usize,
        len: usize,
    },

    #[error("Period-defined transfer to {target} has no period entries")]
    EmptyPeriodTransfer { target: String },

    #[error("Aggregated transfer to {target}: {parts} parts but {weights} weights")]
    AggregatedWeightMismatch {
        target: String,
        parts: usize,
        weights: usize,
    },

    #[error("Aggregated transfer to {target} has no partial distributions")]
    EmptyAggregatedTransfer { target: String },

    #[error("Release strategy for {name} -> {target}: {functions} functions but {delays} delays")]
    ReleaseListMismatch {
        name: String,
        target: String,
        functions: usize,
        delays: usize,
    },

    #[error("In transfer to {target}: {source}")]
    TransferDistribution {
        target: String,
        source: mf_dist::DistError,
    },

    #[error(transparent)]
    Dist(#[from] mf_dist::DistError),
}
