//! The load pipeline and the [`XbmLog`] processed-log container.
//!
//! [`load_log`] turns a raw device file into physical units; [`XbmLog`] holds
//! the split motion / pressure-temperature / GPS tables plus analysis
//! metadata, and round-trips through the self-describing combined CSV format
//! (one comment-prefixed JSON metadata line, then a full outer-joined table).

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, XbmError};
use crate::header::{extract_header, parse_header, HeaderInfo, LoggerType, DEFAULT_HEADER_PREFIX};
use crate::sensor::SensorSpec;
use crate::table::DataTable;

/// Width of the centered rolling-mean window, in seconds.
pub const DEFAULT_ROLLING_WINDOW_S: f64 = 0.2;

/// Standard sea-level pressure, Pascals.
pub const GROUND_PRESSURE_PA: f64 = 101_325.0;

/// File-stem substrings identifying pipeline outputs rather than raw logs.
pub const SKIP_STRINGS: &[&str] = &["processed", "trimmed", "combined"];

const ACCEL_COLS: [&str; 3] = ["accel_x", "accel_y", "accel_z"];
const GYRO_COLS: [&str; 3] = ["gyro_x", "gyro_y", "gyro_z"];
const MAG_COLS: [&str; 3] = ["mag_x", "mag_y", "mag_z"];
const QUAT_COLS: [&str; 4] = ["quat_x", "quat_y", "quat_z", "quat_w"];

/// Columns split into the pressure/temperature sub-table.
const PRESS_TEMP_COLS: [&str; 4] = ["pressure", "temperature", "press_alt_m", "press_alt_ft"];

/// Columns split into the GPS sub-table, for IMU-GPS devices.
const GPS_COLS: [&str; 8] = [
    "time_of_week",
    "latitude",
    "longitude",
    "height_ellipsoid",
    "height_msl",
    "hdop",
    "vdop",
    "utc_timestamp",
];

/// Knobs for the raw-log load pipeline.
///
/// `sensitivity_override` works around firmware whose sensor headers report
/// the wrong counts/unit constants; when set, it replaces the header-derived
/// calibration and is recorded into the returned header so later reversal is
/// exact. `raise_on_missing_sensor` softens the missing-calibration failure
/// from header-parse time to conversion time.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    pub sensitivity_override: Option<SensorSpec>,
    pub rolling_window: f64,
    pub normalize_time: bool,
    pub normalize_gps: bool,
    pub raise_on_missing_sensor: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            sensitivity_override: None,
            rolling_window: DEFAULT_ROLLING_WINDOW_S,
            normalize_time: false,
            normalize_gps: false,
            raise_on_missing_sensor: true,
        }
    }
}

/// Convert raw counts to physical units (or back, with `reverse`).
fn apply_sensitivity(table: &mut DataTable, sensors: &SensorSpec, reverse: bool) {
    let groups = [
        (&sensors.accel, ACCEL_COLS),
        (&sensors.gyro, GYRO_COLS),
        (&sensors.mag, MAG_COLS),
    ];
    for (info, cols) in groups {
        let sensitivity = f64::from(info.sensitivity);
        for col in cols {
            if reverse {
                table.map_column(col, |v| v * sensitivity);
            } else {
                table.map_column(col, |v| v / sensitivity);
            }
        }
    }
}

/// Convert 16-bit quaternion counts and renormalize each row with RMS.
///
/// No-op unless all four quaternion columns are present (IMU-GPS devices and
/// legacy firmware do not log quaternions).
fn convert_quaternions(table: &mut DataTable) {
    if !QUAT_COLS.iter().all(|col| table.has_column(col)) {
        return;
    }

    for col in QUAT_COLS {
        table.map_column(col, |v| v / 65_536.0);
    }

    let mut rms = vec![0.0; table.n_rows()];
    for col in QUAT_COLS {
        if let Some(values) = table.column(col) {
            for (i, value) in values.iter().enumerate() {
                if let Some(v) = value {
                    rms[i] += v * v;
                }
            }
        }
    }
    for r in &mut rms {
        *r = r.sqrt();
    }

    for col in table
        .columns
        .iter_mut()
        .filter(|col| QUAT_COLS.contains(&col.name.as_str()))
    {
        for (i, value) in col.values.iter_mut().enumerate() {
            if let Some(v) = value {
                *v /= rms[i];
            }
        }
    }
}

/// Derive `total_accel` (Euclidean norm of the acceleration components) and
/// `total_accel_rolling` (centered time-window mean of `total_accel`).
///
/// Rows missing any acceleration component get `None` for both, and windows
/// are tolerant of edges: a row near the start or end averages whatever part
/// of the window exists.
fn calculate_total_accel(table: &mut DataTable, rolling_window: f64) {
    let n = table.n_rows();

    let mut total: Vec<Option<f64>> = vec![None; n];
    for (i, slot) in total.iter_mut().enumerate() {
        let mut sum = 0.0;
        let mut complete = true;
        for col in ACCEL_COLS {
            match table.column(col).and_then(|values| values[i]) {
                Some(v) => sum += v * v,
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete {
            *slot = Some(sum.sqrt());
        }
    }

    let half_width = rolling_window / 2.0;
    let mut rolling: Vec<Option<f64>> = vec![None; n];
    let mut lo = 0;
    let mut hi = 0;
    for i in 0..n {
        if total[i].is_none() {
            continue;
        }
        let t = table.time[i];
        while lo < n && table.time[lo] < t - half_width {
            lo += 1;
        }
        while hi + 1 < n && table.time[hi + 1] <= t + half_width {
            hi += 1;
        }

        let mut sum = 0.0;
        let mut count = 0;
        for value in total[lo..=hi].iter().flatten() {
            sum += *value;
            count += 1;
        }
        if count > 0 {
            rolling[i] = Some(sum / f64::from(count));
        }
    }

    table.set_column("total_accel", total);
    table.set_column("total_accel_rolling", rolling);
}

/// Load data from the provided raw XBM log file.
///
/// After the body is parsed against the header's column names, the following
/// transformations and derivations run in order:
///   * IMU-GPS time values double as UTC epoch seconds and are copied to a
///     `utc_timestamp` column
///   * rows are sorted by time (device time is occasionally non-monotonic)
///   * temperature is converted from milli-degree C to C
///   * HAM-IMU counts are divided by their per-sensor sensitivities, and
///     quaternions are converted from 16-bit counts and RMS-normalized
///   * IMU-GPS acceleration and gyro values are converted from milli-units
///   * `total_accel` and `total_accel_rolling` are derived
pub fn load_log(log_filepath: &Path, opts: &LoadOptions) -> Result<(DataTable, HeaderInfo)> {
    let mut header_info = parse_header(
        &extract_header(log_filepath)?,
        opts.raise_on_missing_sensor,
    )?;

    let contents = fs::read_to_string(log_filepath).map_err(|source| XbmError::Read {
        path: log_filepath.to_path_buf(),
        source,
    })?;
    let mut full_data = DataTable::from_csv_body(
        contents.lines().skip(header_info.n_header_lines),
        &header_info.header_spec,
    )?;

    if header_info.logger_type == LoggerType::ImuGps {
        let timestamps = full_data.time.iter().map(|&t| Some(t)).collect();
        full_data.set_column("utc_timestamp", timestamps);
    }

    full_data.sort_by_time();

    // Temperature is always recorded as milli-degree Celsius
    full_data.map_column("temperature", |v| v / 1000.0);

    match header_info.logger_type {
        LoggerType::HamImuAlt => {
            if let Some(override_spec) = &opts.sensitivity_override {
                header_info.sensors = Some(override_spec.clone());
            }
            let sensors = header_info.sensors.as_ref().ok_or(XbmError::MissingSensorSpec)?;
            sensors.validate()?;

            apply_sensitivity(&mut full_data, sensors, false);
            convert_quaternions(&mut full_data);
        }
        LoggerType::ImuGps => {
            if opts.sensitivity_override.is_some() {
                tracing::warn!(
                    "sensitivity override is not applicable to non-HAM-IMU loggers, ignoring"
                );
            }

            // IMU-GPS devices record acceleration in milli-gees & gyro in milli-dps
            for col in ACCEL_COLS.into_iter().chain(GYRO_COLS) {
                full_data.map_column(col, |v| v / 1000.0);
            }
        }
    }

    calculate_total_accel(&mut full_data, opts.rolling_window);

    Ok((full_data, header_info))
}

/// On-disk shape of the combined file's metadata line.
#[derive(Serialize, Deserialize)]
struct LogMetadata {
    drop_date: Option<NaiveDate>,
    drop_location: Option<String>,
    drop_id: Option<String>,
    total_rigged_weight: Option<f64>,
    analysis_dt: f64,
    ground_pressure: f64,
    is_merged: bool,
    is_trimmed: bool,
    header_info: HeaderInfo,
}

fn epoch_to_datetime(epoch_s: f64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros((epoch_s * 1e6).round() as i64)
        .ok_or_else(|| XbmError::Parse(format!("analysis timestamp out of range: {epoch_s}")))
}

fn datetime_to_epoch(dt: DateTime<Utc>) -> f64 {
    dt.timestamp_micros() as f64 / 1e6
}

/// A processed XBM log: split data tables plus analysis metadata.
///
/// Built from one or more raw log files, or rebuilt from a previously written
/// combined CSV.
#[derive(Clone, Debug, PartialEq)]
pub struct XbmLog {
    pub header_info: HeaderInfo,
    pub mpu: DataTable,
    pub press_temp: DataTable,
    pub gps: Option<DataTable>,
    pub drop_date: Option<NaiveDate>,
    pub drop_location: Option<String>,
    pub drop_id: Option<String>,
    pub total_rigged_weight: Option<f64>,
    pub analysis_dt: DateTime<Utc>,
    ground_pressure: f64,
    is_merged: bool,
    is_trimmed: bool,
}

impl XbmLog {
    /// Split the loaded table into sub-tables and derive pressure altitude.
    pub fn new(header_info: HeaderInfo, mut log_data: DataTable) -> Result<Self> {
        let press_temp = log_data.split_columns(&PRESS_TEMP_COLS);
        let gps = match header_info.logger_type {
            LoggerType::ImuGps => Some(log_data.split_columns(&GPS_COLS)),
            LoggerType::HamImuAlt => None,
        };

        let mut log = Self {
            header_info,
            mpu: log_data,
            press_temp,
            gps,
            drop_date: None,
            drop_location: None,
            drop_id: None,
            total_rigged_weight: None,
            analysis_dt: Utc::now(),
            ground_pressure: GROUND_PRESSURE_PA,
            is_merged: false,
            is_trimmed: false,
        };
        log.calculate_pressure_altitude()?;

        Ok(log)
    }

    /// Build a log instance from a single raw log file.
    pub fn from_raw_log_file(log_filepath: &Path, opts: &LoadOptions) -> Result<Self> {
        let mut log = Self::from_multi_raw_log(&[log_filepath], opts)?;
        log.is_merged = false;

        Ok(log)
    }

    /// Build a log instance by concatenating the provided raw log files.
    ///
    /// The files are assumed to come from the same logging session, sharing
    /// header information and time base; this is not validated. Header
    /// information is taken from the first file.
    pub fn from_multi_raw_log<P: AsRef<Path>>(log_filepaths: &[P], opts: &LoadOptions) -> Result<Self> {
        let (first, rest) = log_filepaths
            .split_first()
            .ok_or_else(|| XbmError::Parse("no log files provided to merge".to_string()))?;

        let (mut full_data, header_info) = load_log(first.as_ref(), opts)?;
        for path in rest {
            let (next, _) = load_log(path.as_ref(), opts)?;
            full_data.append(next)?;
        }

        if opts.normalize_time {
            full_data.normalize_time();
        }

        let mut log = Self::new(header_info, full_data)?;
        log.is_merged = true;
        if opts.normalize_gps {
            log.normalize_gps();
        }

        Ok(log)
    }

    /// Rebuild a log instance from a previously written combined CSV file.
    pub fn from_processed_csv(log_filepath: &Path, opts: &LoadOptions) -> Result<Self> {
        let contents = fs::read_to_string(log_filepath).map_err(|source| XbmError::Read {
            path: log_filepath.to_path_buf(),
            source,
        })?;

        Self::from_processed_str(&contents, opts)
    }

    /// Rebuild a log instance from combined-CSV contents.
    ///
    /// A sensitivity override here reverts the serialized conversion before
    /// applying the new constants (HAM-IMU only; IMU-GPS data never held raw
    /// counts, so the override is ignored with a warning). The derived
    /// acceleration columns are always recalculated.
    pub fn from_processed_str(contents: &str, opts: &LoadOptions) -> Result<Self> {
        let (metadata_line, body) = contents.split_once('\n').ok_or_else(|| {
            XbmError::Parse("processed log is missing a data table".to_string())
        })?;
        let metadata_json = metadata_line.strip_prefix(DEFAULT_HEADER_PREFIX).ok_or_else(|| {
            XbmError::Parse(format!(
                "processed log must start with a '{DEFAULT_HEADER_PREFIX}'-prefixed metadata line"
            ))
        })?;
        let metadata: LogMetadata = serde_json::from_str(metadata_json.trim())?;

        let mut header_info = metadata.header_info;
        let mut full_data = DataTable::from_csv_str(body)?;

        if let Some(override_spec) = &opts.sensitivity_override {
            if header_info.logger_type == LoggerType::HamImuAlt {
                // Revert the serialized conversion, then apply the override
                let existing = header_info.sensors.as_ref().ok_or(XbmError::MissingSensorSpec)?;
                apply_sensitivity(&mut full_data, existing, true);

                override_spec.validate()?;
                apply_sensitivity(&mut full_data, override_spec, false);
                header_info.sensors = Some(override_spec.clone());
            } else {
                tracing::warn!(
                    "sensitivity override is not applicable to non-HAM-IMU loggers, ignoring"
                );
            }
        }

        // Either the sensitivities or the window width may have changed
        calculate_total_accel(&mut full_data, opts.rolling_window);

        let analysis_dt = epoch_to_datetime(metadata.analysis_dt)?;
        let mut log = Self::new(header_info, full_data)?;
        log.drop_date = metadata.drop_date;
        log.drop_location = metadata.drop_location;
        log.drop_id = metadata.drop_id;
        log.total_rigged_weight = metadata.total_rigged_weight;
        log.analysis_dt = analysis_dt;
        log.is_merged = metadata.is_merged;
        log.is_trimmed = metadata.is_trimmed;
        log.set_ground_pressure(metadata.ground_pressure)?;

        Ok(log)
    }

    pub fn logger_id(&self) -> &str {
        &self.header_info.serial
    }

    pub fn ground_pressure(&self) -> f64 {
        self.ground_pressure
    }

    pub fn is_merged(&self) -> bool {
        self.is_merged
    }

    pub fn is_trimmed(&self) -> bool {
        self.is_trimmed
    }

    /// Change the ground-level pressure and recalculate both pressure
    /// altitude columns.
    pub fn set_ground_pressure(&mut self, pressure_pa: f64) -> Result<()> {
        self.ground_pressure = pressure_pa;
        self.calculate_pressure_altitude()
    }

    fn calculate_pressure_altitude(&mut self) -> Result<()> {
        let pressure = self
            .press_temp
            .column("pressure")
            .ok_or(XbmError::ColumnNotFound {
                column: "pressure".to_string(),
                table: "press_temp",
            })?;

        let ground_pressure = self.ground_pressure;
        let alt_m: Vec<Option<f64>> = pressure
            .iter()
            .map(|p| p.map(|p| 44_330.0 * (1.0 - (p / ground_pressure).powf(1.0 / 5.225))))
            .collect();
        let alt_ft = alt_m.iter().map(|m| m.map(|m| m * 3.2808)).collect();

        self.press_temp.set_column("press_alt_m", alt_m);
        self.press_temp.set_column("press_alt_ft", alt_ft);

        Ok(())
    }

    /// Shift GPS latitude/longitude to deltas from the first fix. Warns and
    /// skips on non-GPS logs.
    pub fn normalize_gps(&mut self) {
        let Some(gps) = &mut self.gps else {
            tracing::warn!("GPS normalization is not applicable to non-GPS loggers, skipping");
            return;
        };

        for col in ["latitude", "longitude"] {
            let first_fix = gps
                .column(col)
                .and_then(|values| values.iter().flatten().next().copied());
            if let Some(first_fix) = first_fix {
                gps.map_column(col, |v| v - first_fix);
            }
        }
    }

    /// Row indices nearest to `elapsed_time` in the mpu, pressure/temperature,
    /// and (if present) GPS tables.
    pub fn get_idx(&self, elapsed_time: f64) -> Result<(usize, usize, Option<usize>)> {
        let nearest = |table: &DataTable, name: &'static str| {
            table.nearest_idx(elapsed_time).ok_or_else(|| {
                XbmError::Parse(format!("cannot locate a time index in the empty {name} table"))
            })
        };

        let mpu_idx = nearest(&self.mpu, "mpu")?;
        let press_temp_idx = nearest(&self.press_temp, "press_temp")?;
        let gps_idx = match &self.gps {
            Some(gps) => Some(nearest(gps, "gps")?),
            None => None,
        };

        Ok((mpu_idx, press_temp_idx, gps_idx))
    }

    /// Trim each sub-table to the rows nearest the provided start & end
    /// times, inclusive.
    ///
    /// The `normalize_time` flag shifts each trimmed table to start at 0
    /// seconds, for cases where the device started at an abnormally large
    /// elapsed time.
    pub fn trim_log(&mut self, elapsed_start: f64, elapsed_end: f64, normalize_time: bool) {
        let trim = |table: &mut DataTable| {
            if let (Some(start), Some(end)) = (
                table.nearest_idx(elapsed_start),
                table.nearest_idx(elapsed_end),
            ) {
                table.slice_rows(start, end);
                if normalize_time {
                    table.normalize_time();
                }
            }
        };

        trim(&mut self.mpu);
        trim(&mut self.press_temp);
        if let Some(gps) = &mut self.gps {
            trim(gps);
        }

        self.is_trimmed = true;
    }

    /// Outer-join the sub-tables back into a single table on time.
    pub fn full_table(&self) -> DataTable {
        let mut tables = vec![&self.mpu, &self.press_temp];
        if let Some(gps) = &self.gps {
            tables.push(gps);
        }

        DataTable::outer_join(&tables)
    }

    fn metadata(&self) -> LogMetadata {
        LogMetadata {
            drop_date: self.drop_date,
            drop_location: self.drop_location.clone(),
            drop_id: self.drop_id.clone(),
            total_rigged_weight: self.total_rigged_weight,
            analysis_dt: datetime_to_epoch(self.analysis_dt),
            ground_pressure: self.ground_pressure,
            is_merged: self.is_merged,
            is_trimmed: self.is_trimmed,
            header_info: self.header_info.clone(),
        }
    }

    /// Serialize into the combined CSV format: a single comment-prefixed JSON
    /// metadata line, then the outer-joined data table.
    pub fn to_writer<W: io::Write>(&self, out: &mut W) -> Result<()> {
        if let Some(sensors) = &self.header_info.sensors {
            sensors.validate()?;
        }

        let metadata = serde_json::to_string(&self.metadata())?;
        writeln!(out, "{DEFAULT_HEADER_PREFIX}{metadata}")?;
        self.full_table().write_csv(out)?;

        Ok(())
    }

    /// Serialize into a combined-CSV string.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.to_writer(&mut buf)?;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Serialize to the provided filepath. Any existing file is overwritten.
    pub fn to_csv(&self, out_filepath: &Path) -> Result<()> {
        let file = File::create(out_filepath)?;
        let mut writer = BufWriter::new(file);
        self.to_writer(&mut writer)?;

        Ok(())
    }
}
