//! Sensor calibration records and their header grammars.
//!
//! HAM-IMU devices report per-sensor calibration in the file header. Modern
//! firmware writes one line per sensor:
//!
//! ```text
//! ;Accel, 225, 1000, 16, g
//! ```
//!
//! Legacy firmware instead writes a single combined line for all three MPU
//! sensors, which needs its own extraction path:
//!
//! ```text
//! ;MPU SR, 200,Hz,  Accel sens, 2048,counts/g, Gyro sens, 16,counts/dps,  Mag SR, 10,Hz,  Mag sens, 1666,counts/mT
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, XbmError};

/// Sensor names expected in a HAM-IMU header, in canonical order.
pub const EXPECTED_SENSOR_NAMES: [&str; 3] = ["Accel", "Gyro", "Mag"];

/// Calibration record for one physical sensor.
///
/// `sensitivity` is the counts-per-physical-unit divisor applied to raw data
/// columns. `full_scale` is the device-reported measurement range; legacy
/// firmware never reports it, in which case it is set to `-1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorInfo {
    pub name: String,
    pub sample_rate: u32,
    pub sensitivity: i32,
    pub full_scale: i32,
    pub units: String,
}

impl SensorInfo {
    /// Parse sensor configuration from a single header line.
    ///
    /// Sensor headers are assumed to be of the form
    /// `<name>, <sample rate>, <counts per unit>, <full scale>, <units>`,
    /// e.g. `"Accel, 225, 1000, 16, g"`.
    pub fn from_header_line(header_line: &str) -> Result<Self> {
        let malformed =
            || XbmError::Parse(format!("malformed sensor header line: '{header_line}'"));

        let chunks: Vec<&str> = header_line.split(',').map(str::trim).collect();
        if chunks.len() < 5 {
            return Err(malformed());
        }

        Ok(Self {
            name: chunks[0].to_string(),
            sample_rate: chunks[1].parse().map_err(|_| malformed())?,
            sensitivity: chunks[2].parse().map_err(|_| malformed())?,
            full_scale: chunks[3].parse().map_err(|_| malformed())?,
            units: chunks[4].to_string(),
        })
    }

    /// Check that the record is usable for unit conversion.
    ///
    /// Applied at the override boundary and before serialization so malformed
    /// calibration values never propagate into numeric operations.
    pub fn validate(&self) -> Result<()> {
        let reject = |reason: &str| {
            Err(XbmError::InvalidSensor {
                sensor: self.name.clone(),
                reason: reason.to_string(),
            })
        };

        if self.name.is_empty() {
            return reject("sensor name is empty");
        }
        if self.sample_rate == 0 {
            return reject("sample rate must be non-zero");
        }
        if self.sensitivity <= 0 {
            return reject("sensitivity must be a positive counts-per-unit divisor");
        }

        Ok(())
    }
}

/// Per-axis calibration for the full accelerometer/gyroscope/magnetometer set.
///
/// Resolution is all-or-nothing: a `SensorSpec` always holds all three
/// records, so a partially-resolved header can never leak into unit
/// conversion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSpec {
    #[serde(rename = "Accel")]
    pub accel: SensorInfo,
    #[serde(rename = "Gyro")]
    pub gyro: SensorInfo,
    #[serde(rename = "Mag")]
    pub mag: SensorInfo,
}

impl SensorSpec {
    /// Scan header lines for the three expected sensor configuration lines.
    ///
    /// Returns `Ok(None)` when the set is incomplete and `raise_on_missing`
    /// is `false`; the caller must then supply an override before unit
    /// conversion can run.
    pub fn from_header(header_lines: &[String], raise_on_missing: bool) -> Result<Option<Self>> {
        let mut found: [Option<SensorInfo>; 3] = [None, None, None];
        for line in header_lines {
            let head = line.split(',').next().map(str::trim).unwrap_or_default();
            if let Some(slot) = EXPECTED_SENSOR_NAMES.iter().position(|name| *name == head) {
                found[slot] = Some(SensorInfo::from_header_line(line)?);
            }
        }

        match found {
            [Some(accel), Some(gyro), Some(mag)] => Ok(Some(Self { accel, gyro, mag })),
            incomplete if raise_on_missing => {
                let missing: Vec<&str> = EXPECTED_SENSOR_NAMES
                    .iter()
                    .zip(&incomplete)
                    .filter(|(_, f)| f.is_none())
                    .map(|(name, _)| *name)
                    .collect();
                Err(XbmError::Parse(format!(
                    "unable to locate all expected sensor names; missing: {}",
                    missing.join(", ")
                )))
            }
            _ => Ok(None),
        }
    }

    /// Parse the single combined sensor line written by legacy firmware.
    ///
    /// The accelerometer and gyroscope share the MPU-wide sample rate; the
    /// magnetometer has its own. Legacy firmware never reports full scale, so
    /// all records carry the `-1` sentinel.
    pub fn from_legacy_header(header_line: &str) -> Result<Self> {
        fn capture(
            line: &str,
            pattern: &str,
            sensor: &'static str,
            field: &'static str,
        ) -> Result<(i32, String)> {
            let re = Regex::new(pattern).expect("Failed to compile regex");
            let caps = re
                .captures(line)
                .ok_or(XbmError::SensorField { sensor, field })?;
            let value = caps[1]
                .parse()
                .map_err(|_| XbmError::SensorField { sensor, field })?;
            let units = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
            Ok((value, units))
        }

        let (mpu_sr, _) = capture(header_line, r"MPU SR,\s*(\d+)\s*,\s*Hz", "MPU", "sample rate")?;
        let (accel_sens, accel_units) = capture(
            header_line,
            r"Accel sens,\s*(\d+)\s*,\s*counts/(\w+)",
            "Accel",
            "sensitivity",
        )?;
        let (gyro_sens, gyro_units) = capture(
            header_line,
            r"Gyro sens,\s*(\d+)\s*,\s*counts/(\w+)",
            "Gyro",
            "sensitivity",
        )?;
        let (mag_sr, _) = capture(header_line, r"Mag SR,\s*(\d+)\s*,\s*Hz", "Mag", "sample rate")?;
        let (mag_sens, mag_units) = capture(
            header_line,
            r"Mag sens,\s*(\d+)\s*,\s*counts/(\w+)",
            "Mag",
            "sensitivity",
        )?;

        let info = |name: &str, sample_rate: i32, sensitivity: i32, units: String| SensorInfo {
            name: name.to_string(),
            sample_rate: sample_rate as u32,
            sensitivity,
            full_scale: -1,
            units,
        };

        Ok(Self {
            accel: info("Accel", mpu_sr, accel_sens, accel_units),
            gyro: info("Gyro", mpu_sr, gyro_sens, gyro_units),
            mag: info("Mag", mag_sr, mag_sens, mag_units),
        })
    }

    /// Iterate the records in canonical (Accel, Gyro, Mag) order.
    pub fn iter(&self) -> impl Iterator<Item = &SensorInfo> {
        [&self.accel, &self.gyro, &self.mag].into_iter()
    }

    /// Validate every record in the spec.
    pub fn validate(&self) -> Result<()> {
        for info in self.iter() {
            info.validate()?;
        }
        Ok(())
    }
}
