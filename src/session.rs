//! Grouping of raw log files into logging sessions.
//!
//! When a log file hits the device's size threshold, logging continues in a
//! new file with no end-of-file comment. A clean shutdown (power switch or
//! low battery) instead ends the file with a commentary line such as
//! `; 12.34 stopping logging: shutdown: switched off`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, XbmError};

/// Substring present in the device's end-of-file commentary when it shut
/// down cleanly, for any shutdown reason.
pub const SHUTDOWN_MARKER: &str = "shutdown";

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Inspect the provided log files & bin them into logging sessions.
///
/// Files are accumulated into a session until one ends with the device's
/// shutdown commentary; the shutdown file closes its session. Files after the
/// last shutdown form a final, dangling session. A file with no content at
/// all is a parse error.
///
/// If `ensure_sorted` is `true`, the provided paths are sorted by file stem
/// first; otherwise they are taken in the order given.
pub fn bin_logging_sessions(
    log_paths: &[PathBuf],
    ensure_sorted: bool,
) -> Result<Vec<Vec<PathBuf>>> {
    let mut log_paths: Vec<PathBuf> = log_paths.to_vec();
    if ensure_sorted {
        log_paths.sort_by_key(|path| file_stem(path));
    }

    let mut sessions = Vec::new();
    let mut session = Vec::new();
    for path in log_paths {
        // Log files are small enough to slurp; only the last line matters here
        let contents = fs::read_to_string(&path).map_err(|source| XbmError::Read {
            path: path.clone(),
            source,
        })?;
        let last_line = contents
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| {
                XbmError::Parse(format!("no log data found in file: {}", path.display()))
            })?
            .to_string();

        session.push(path);

        if last_line.contains(SHUTDOWN_MARKER) {
            sessions.push(std::mem::take(&mut session));
        }
    }

    // Keep any dangling session
    if !session.is_empty() {
        sessions.push(session);
    }

    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const LOG_BODY: &str = "0.01,1121,-15,24\n";
    const LOG_BODY_POWER_OFF: &str =
        "0.01,1121,-15,24\n; 12.34 stopping logging: shutdown: switched off\n";
    const LOG_BODY_LOW_BATTERY: &str =
        "0.01,1121,-15,24\n; 12.34 stopping logging: shutdown: low battery: 3490 mv\n";

    fn write_logs(dir: &TempDir, files: &[(&str, &str)]) -> Vec<PathBuf> {
        files
            .iter()
            .map(|(name, contents)| {
                let path = dir.path().join(name);
                fs::write(&path, contents).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_bin_two_sessions() {
        let dir = TempDir::new().unwrap();
        let paths = write_logs(
            &dir,
            &[
                ("log_1.CSV", LOG_BODY),
                ("log_2.CSV", LOG_BODY_POWER_OFF),
                ("log_3.CSV", LOG_BODY_LOW_BATTERY),
            ],
        );

        let sessions = bin_logging_sessions(&paths, true).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0], paths[..2].to_vec());
        assert_eq!(sessions[1], paths[2..].to_vec());
    }

    #[test]
    fn test_bin_dangling_session_kept() {
        let dir = TempDir::new().unwrap();
        let paths = write_logs(
            &dir,
            &[("log_1.CSV", LOG_BODY_POWER_OFF), ("log_2.CSV", LOG_BODY)],
        );

        let sessions = bin_logging_sessions(&paths, true).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[1], vec![paths[1].clone()]);
    }

    #[test]
    fn test_bin_sorts_by_stem() {
        let dir = TempDir::new().unwrap();
        let paths = write_logs(
            &dir,
            &[("log_2.CSV", LOG_BODY_POWER_OFF), ("log_1.CSV", LOG_BODY)],
        );

        let sessions = bin_logging_sessions(&paths, true).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0], vec![paths[1].clone(), paths[0].clone()]);
    }

    #[test]
    fn test_bin_empty_file_raises() {
        let dir = TempDir::new().unwrap();
        let paths = write_logs(&dir, &[("log_1.CSV", "")]);

        let err = bin_logging_sessions(&paths, true).unwrap_err();
        assert!(err.to_string().contains("no log data found"));
    }
}
