//! xbmlog - parsing and batch processing for XBM data-logger CSV files
//!
//! This library ingests the raw CSV files written by XBM accelerometer/GPS
//! data loggers, converts raw counts to physical units, derives total
//! acceleration and pressure altitude, and serializes the result into a
//! self-describing combined CSV format that round-trips losslessly.
//!
//! ## Module Structure
//!
//! - [`error`] - Library error types
//! - [`sensor`] - Per-sensor calibration records and their header grammars
//! - [`header`] - Free-text header extraction, logger-type detection, column-name mapping
//! - [`table`] - Column-major data table (split / join / trim / CSV IO)
//! - [`log`] - Raw-log load pipeline, derivations, and the [`log::XbmLog`] container
//! - [`session`] - Grouping of raw log files into logging sessions
//! - [`batch`] - Batch discovery and per-session combination of logger directories

pub mod batch;
pub mod error;
pub mod header;
pub mod log;
pub mod sensor;
pub mod session;
pub mod table;

pub use error::{Result, XbmError};
pub use header::{HeaderInfo, LoggerType};
pub use log::{LoadOptions, XbmLog};
pub use sensor::{SensorInfo, SensorSpec};
pub use table::DataTable;
