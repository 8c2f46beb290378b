//! Extraction and parsing of the `;`-prefixed free-text log file header.
//!
//! Header layout varies with firmware version, so parsing is line-classified:
//! each header line is matched against the small set of line shapes we care
//! about (`Title`, `Version`, sensor configuration) and everything else is
//! ignored. The final header line is always the short-name column header row.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::error::{Result, XbmError};
use crate::sensor::SensorSpec;

/// Comment prefix used for header lines, in-body device commentary, and the
/// combined-file metadata line.
pub const DEFAULT_HEADER_PREFIX: &str = ";";

/// Substring emitted by the device self-test when a sensor fault aborts
/// logging, e.g. `MPU Fault`.
const FAULT_MARKER: &str = "Fault";

/// Firmware versions that write the single combined `MPU SR, ...` sensor
/// configuration line instead of one line per sensor.
pub const LEGACY_FIRMWARE_VERSIONS: &[i32] = &[1379];

/// Short column names used by the device, mapped to their long names.
///
/// Names not present here pass through verbatim.
const HEADER_MAP: &[(&str, &str)] = &[
    ("Time", "time"),
    ("Ax", "accel_x"),
    ("Ay", "accel_y"),
    ("Az", "accel_z"),
    ("Gx", "gyro_x"),
    ("Gy", "gyro_y"),
    ("Gz", "gyro_z"),
    ("Qw", "quat_w"),
    ("Qx", "quat_x"),
    ("Qy", "quat_y"),
    ("Qz", "quat_z"),
    ("Mx", "mag_x"),
    ("My", "mag_y"),
    ("Mz", "mag_z"),
    ("P", "pressure"),
    ("T", "temperature"),
    ("TOW", "time_of_week"),
    ("Lat", "latitude"),
    ("Lon", "longitude"),
    ("Height(m)", "height_ellipsoid"),
    ("MSL(m)", "height_msl"),
    ("hdop(m)", "hdop"),
    ("vdop(m)", "vdop"),
];

/// Device family, as reported by the header's `Title` line.
///
/// The two families differ in what their data columns mean: HAM-IMU devices
/// log raw counts that need per-sensor conversion, while IMU-GPS devices log
/// milli-units and carry the GPS column group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString)]
pub enum LoggerType {
    #[serde(rename = "HAM-IMU+alt")]
    #[strum(serialize = "HAM-IMU+alt")]
    HamImuAlt,
    #[serde(rename = "GPS")]
    #[strum(serialize = "GPS")]
    ImuGps,
}

/// Everything learned from a log file's header.
///
/// `firmware_version` uses `-1` as a "not reported" sentinel to preserve the
/// on-disk metadata shape. `sensors` is `None` for IMU-GPS devices (which do
/// not log raw counts) and for HAM-IMU headers parsed in lenient mode where
/// the sensor lines were absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub n_header_lines: usize,
    pub logger_type: LoggerType,
    pub firmware_version: i32,
    pub serial: String,
    pub header_spec: Vec<String>,
    pub sensors: Option<SensorSpec>,
}

/// Extract header lines from the provided log file.
///
/// Header lines are the unbroken run of `;`-prefixed lines at the top of the
/// file, returned with the prefix stripped and whitespace trimmed. The first
/// non-comment line stops extraction; if that line reports a sensor fault
/// (printed by the device self-test as a non-comment line) the file is
/// rejected.
pub fn extract_header(log_filepath: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(log_filepath).map_err(|source| XbmError::Read {
        path: log_filepath.to_path_buf(),
        source,
    })?;

    let mut header_lines = Vec::new();
    let mut last_seen = "";
    for line in contents.lines() {
        last_seen = line;
        if let Some(stripped) = line.strip_prefix(DEFAULT_HEADER_PREFIX) {
            header_lines.push(stripped.trim().to_string());
        } else {
            break;
        }
    }

    if last_seen.contains(FAULT_MARKER) {
        return Err(XbmError::Parse(format!(
            "sensor fault encountered: '{}'",
            last_seen.trim()
        )));
    }

    if header_lines.is_empty() {
        return Err(XbmError::Parse(format!(
            "no header lines found in '{}'; is this a valid log file?",
            log_filepath.display()
        )));
    }

    Ok(header_lines)
}

/// Map comma-separated header short names to their long names.
///
/// Names without a known mapping are passed through as-is with a warning.
pub fn map_headers(header_line: &str) -> Vec<String> {
    header_line
        .split(',')
        .map(|shortname| {
            let shortname = shortname.trim();
            match HEADER_MAP.iter().find(|(short, _)| *short == shortname) {
                Some((_, long)) => (*long).to_string(),
                None => {
                    tracing::warn!("could not map column header '{shortname}' to a long name");
                    shortname.to_string()
                }
            }
        })
        .collect()
}

/// Parse log file information from the provided header lines.
///
/// When `raise_on_missing_sensor` is `false`, a HAM-IMU header without a
/// complete sensor configuration parses successfully with `sensors: None`,
/// deferring the failure to the point where a conversion is actually needed.
pub fn parse_header(header_lines: &[String], raise_on_missing_sensor: bool) -> Result<HeaderInfo> {
    let ver_sn_re = Regex::new(r"Version,\s+(\d+)[\w\s,]+SN:(\w+)").expect("Failed to compile regex");

    let mut logger_type = None;
    let mut version = None;
    let mut legacy_sensor_line = None;
    for line in header_lines {
        if line.starts_with("Title") {
            // Expected like "Title, http://www.gcdataconcepts.com, HAM-IMU+alt, MPU9250 BMP280".
            // IMU-GPS titles list their component sensors instead of a single family
            // name, so the GPS token is checked across the whole line.
            if line.contains("GPS") {
                logger_type = Some(LoggerType::ImuGps);
            } else {
                let family = line.split(',').nth(2).map(str::trim).unwrap_or_default();
                logger_type = Some(LoggerType::from_str(family).map_err(|_| {
                    XbmError::Parse(format!("unsupported logger type: '{family}'"))
                })?);
            }
            continue;
        }

        if line.starts_with("Version") {
            let caps = ver_sn_re.captures(line).ok_or_else(|| {
                XbmError::Parse("unexpected formatting of 'Version' header line".to_string())
            })?;
            let firmware_version = caps[1]
                .parse::<i32>()
                .map_err(|_| XbmError::Parse("non-numeric firmware version".to_string()))?;
            version = Some((firmware_version, caps[2].to_string()));
            continue;
        }

        if line.contains("MPU SR") {
            legacy_sensor_line = Some(line.as_str());
        }
    }

    let logger_type = logger_type.ok_or_else(|| {
        XbmError::Parse("unable to locate necessary header information; missing: 'logger_type'".to_string())
    })?;
    let (firmware_version, serial) = version.ok_or_else(|| {
        XbmError::Parse("unable to locate necessary header information; missing: 'firmware_version'".to_string())
    })?;

    // IMU-GPS devices report measured values rather than raw counts and carry
    // no per-sensor calibration lines
    let sensors = match logger_type {
        LoggerType::ImuGps => None,
        LoggerType::HamImuAlt => {
            if LEGACY_FIRMWARE_VERSIONS.contains(&firmware_version) {
                let line = legacy_sensor_line.ok_or_else(|| {
                    XbmError::Parse(format!(
                        "firmware {firmware_version} headers must carry a combined 'MPU SR' sensor line"
                    ))
                })?;
                Some(SensorSpec::from_legacy_header(line)?)
            } else {
                SensorSpec::from_header(header_lines, raise_on_missing_sensor)?
            }
        }
    };

    // Column headers are always the last header line
    let column_row = header_lines
        .last()
        .ok_or_else(|| XbmError::Parse("no header lines provided".to_string()))?;
    let header_spec = map_headers(column_row);

    Ok(HeaderInfo {
        n_header_lines: header_lines.len(),
        logger_type,
        firmware_version,
        serial,
        header_spec,
        sensors,
    })
}

/// Helper pipeline yielding `HeaderInfo` directly from the provided log file.
pub fn parse_from_file(log_filepath: &Path) -> Result<HeaderInfo> {
    parse_header(&extract_header(log_filepath)?, true)
}
