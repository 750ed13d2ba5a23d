use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

/// Failures while turning a data file into a normalized series.
///
/// A load that fails with any of these leaves the previously loaded
/// series untouched.
#[derive(Debug, Display, Error)]
pub enum DataError {
    #[display("failed to read data file")]
    ReadFile,
    #[display("no data file found, searched: {searched}")]
    NotFound { searched: String },
    #[display("missing required column \"{column}\"")]
    MissingColumn { column: String },
    #[display("invalid value in row {row}, column \"{column}\"")]
    InvalidValue { row: usize, column: String },
    #[display("inconsistent OHLC values in row {row}")]
    InconsistentBar { row: usize },
    #[display("no timestamp could be parsed")]
    UnparsableTimestamps,
    #[display("no data remaining after filtering trading hours")]
    EmptyAfterFilter,
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
}
