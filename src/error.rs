//! Library error types.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, XbmError>;

/// Errors raised while parsing or transforming XBM log files.
#[derive(Debug, Error)]
pub enum XbmError {
    /// The file or header structure could not be understood.
    #[error("{0}")]
    Parse(String),

    /// A legacy combined sensor header line was found but one of its fields
    /// could not be parsed.
    #[error("could not parse {field} for sensor '{sensor}' from legacy MPU header line")]
    SensorField {
        sensor: &'static str,
        field: &'static str,
    },

    /// No per-axis calibration was resolvable from the header and no override
    /// was supplied.
    #[error("no IMU sensor information was found; check the log header or provide an override")]
    MissingSensorSpec,

    /// A sensor calibration record failed shape validation.
    #[error("invalid sensor calibration for '{sensor}': {reason}")]
    InvalidSensor { sensor: String, reason: String },

    /// A trim or index lookup referenced a column a sub-table does not have.
    #[error("could not locate reference column '{column}' in the {table} table")]
    ColumnNotFound {
        column: String,
        table: &'static str,
    },

    #[error("failed to read '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed combined-log metadata")]
    Metadata(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
