use thiserror::Error;

pub type EntropyResult<T> = Result<T, EntropyError>;

#[derive(Error, Debug)]
pub enum EntropyError {
    #[error("Hmax must be positive, got {value}")]
    InvalidHmax { value: f64 },

    #[error("Flow {src} -> {dest}: {got} values for {expected} periods")]
    SeriesLengthMismatch {
        src: String,
        dest: String,
        expected: usize,
        got: usize,
    },

    #[error("Flow {src} -> {dest}: {got} concentrations for {expected} periods")]
    ConcentrationLengthMismatch {
        src: String,
        dest: String,
        expected: usize,
        got: usize,
    },

    #[error("Unit conversion {from_unit} -> {to_unit}: {got} factors for {expected} periods")]
    ConversionLengthMismatch {
        from_unit: String,
        to_unit: String,
        expected: usize,
        got: usize,
    },
}
