use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid simulation options: {what}")]
    InvalidOptions { what: &'static str },

    #[error("No model set; call set_model before running")]
    NoModel,

    #[error("Transfer from {compartment} references unknown target {target}")]
    UnknownTarget { compartment: String, target: String },

    #[error("Stock {stock}: no release strategy configured for storage period {period} ({len} configured)")]
    ReleasePeriodOutOfRange {
        stock: String,
        period: usize,
        len: usize,
    },

    #[error(
        "Linear equilibrium system is singular in run {run}, period {period}: \
         the flow-compartment graph does not admit a steady per-period solution"
    )]
    SingularSystem { run: usize, period: usize },

    #[error(transparent)]
    Model(#[from] mf_model::ModelError),

    #[error(transparent)]
    Core(#[from] mf_core::CoreError),
}
