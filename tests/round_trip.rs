//! End-to-end raw file -> XbmLog -> combined CSV -> XbmLog round trips.

use std::fs;
use std::path::PathBuf;

use chrono::DateTime;
use tempfile::TempDir;
use xbmlog::{LoadOptions, LoggerType, XbmLog};

mod common;

fn write_log(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn pin_analysis_dt(log: &mut XbmLog) {
    log.analysis_dt = DateTime::from_timestamp_micros(1_705_937_161_423_644).unwrap();
}

#[test]
fn test_ham_imu_round_trip_through_file() {
    let dir = TempDir::new().unwrap();
    let raw = write_log(&dir, "log.CSV", common::SAMPLE_LOG_FILE);

    let mut log = XbmLog::from_raw_log_file(&raw, &LoadOptions::default()).unwrap();
    pin_analysis_dt(&mut log);
    log.drop_location = Some("Davis".to_string());
    log.drop_id = Some("drop-1".to_string());

    let processed = dir.path().join("log_processed.CSV");
    log.to_csv(&processed).unwrap();

    let restored = XbmLog::from_processed_csv(&processed, &LoadOptions::default()).unwrap();
    assert_eq!(restored, log);
}

#[test]
fn test_gps_round_trip_through_file() {
    let dir = TempDir::new().unwrap();
    let raw = write_log(&dir, "log.CSV", common::SAMPLE_GPS_LOG);

    let mut log = XbmLog::from_raw_log_file(&raw, &LoadOptions::default()).unwrap();
    pin_analysis_dt(&mut log);
    assert_eq!(log.header_info.logger_type, LoggerType::ImuGps);
    assert!(log.gps.is_some());

    let processed = dir.path().join("log_processed.CSV");
    log.to_csv(&processed).unwrap();

    let restored = XbmLog::from_processed_csv(&processed, &LoadOptions::default()).unwrap();
    assert_eq!(restored, log);

    let gps = restored.gps.as_ref().unwrap();
    assert_eq!(gps.column("utc_timestamp").unwrap()[0], Some(9_433_200.0));
}

#[test]
fn test_legacy_firmware_round_trip() {
    let dir = TempDir::new().unwrap();
    let raw = write_log(&dir, "log.CSV", common::SAMPLE_LEGACY_LOG);

    let mut log = XbmLog::from_raw_log_file(&raw, &LoadOptions::default()).unwrap();
    pin_analysis_dt(&mut log);

    let sensors = log.header_info.sensors.as_ref().unwrap();
    assert_eq!(sensors.accel.sensitivity, 2048);
    assert_eq!(sensors.accel.full_scale, -1);
    assert_eq!(
        log.mpu.column("accel_x").unwrap()[0],
        Some(1121.0 / 2048.0)
    );

    let rendered = log.to_csv_string().unwrap();
    let restored = XbmLog::from_processed_str(&rendered, &LoadOptions::default()).unwrap();
    assert_eq!(restored, log);
}

#[test]
fn test_merged_and_trimmed_round_trip() {
    let dir = TempDir::new().unwrap();
    let raw_1 = write_log(&dir, "log_1.CSV", common::SAMPLE_LOG_FILE);
    let raw_2 = write_log(&dir, "log_2.CSV", common::SAMPLE_LOG_FILE_2);

    let opts = LoadOptions {
        normalize_time: true,
        ..Default::default()
    };
    let mut log = XbmLog::from_multi_raw_log(&[raw_1, raw_2], &opts).unwrap();
    pin_analysis_dt(&mut log);
    assert!(log.is_merged());
    assert_eq!(log.mpu.n_rows(), 2);

    log.trim_log(0.0, 0.005, true);
    assert!(log.is_trimmed());
    assert_eq!(log.mpu.n_rows(), 1);
    assert_eq!(log.mpu.time[0], 0.0);

    let rendered = log.to_csv_string().unwrap();
    let restored = XbmLog::from_processed_str(&rendered, &LoadOptions::default()).unwrap();
    assert_eq!(restored, log);
    assert!(restored.is_merged());
    assert!(restored.is_trimmed());
}

#[test]
fn test_processed_file_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let raw = write_log(&dir, "log.CSV", common::SAMPLE_LOG_FILE);

    let mut log = XbmLog::from_raw_log_file(&raw, &LoadOptions::default()).unwrap();
    pin_analysis_dt(&mut log);

    let first = log.to_csv_string().unwrap();
    let second = XbmLog::from_processed_str(&first, &LoadOptions::default())
        .unwrap()
        .to_csv_string()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_fault_file_rejected() {
    let dir = TempDir::new().unwrap();
    let raw = write_log(
        &dir,
        "log.CSV",
        ";Title, http://www.gcdataconcepts.com, HAM-IMU+alt, MPU9250 BMP280\nMPU Fault\n",
    );

    let err = XbmLog::from_raw_log_file(&raw, &LoadOptions::default()).unwrap_err();
    assert!(err.to_string().contains("sensor fault"));
}
