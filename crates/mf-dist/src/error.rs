use thiserror::Error;

pub type DistResult<T> = Result<T, DistError>;

#[derive(Error, Debug)]
pub enum DistError {
    #[error("Invalid distribution parameters for {what}: {details}")]
    InvalidParameters { what: &'static str, details: String },

    #[error("Empty sample list for {what}")]
    EmptySample { what: &'static str },

    #[error("Invalid release rate {rate}: must be in (0, 1]")]
    InvalidReleaseRate { rate: f64 },
}
