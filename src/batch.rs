//! Batch combination of raw logger directories into processed CSV files.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::log::{LoadOptions, XbmLog, SKIP_STRINGS};
use crate::sensor::SensorSpec;
use crate::session::bin_logging_sessions;

/// Knobs for a batch-combine run.
///
/// `pattern` is a simple filename wildcard (`*` and `?`), matched
/// case-insensitively so `*.CSV` also picks up `.csv` files. Files whose stem
/// contains any of `skip_strs` are excluded, which keeps previous pipeline
/// outputs from being re-combined.
#[derive(Clone, Debug)]
pub struct BatchOptions {
    pub pattern: String,
    pub dry_run: bool,
    pub skip_strs: Vec<String>,
    pub sensitivity_override: Option<SensorSpec>,
    pub bin_sessions: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            pattern: "*.CSV".to_string(),
            dry_run: false,
            skip_strs: SKIP_STRINGS.iter().map(|s| s.to_string()).collect(),
            sensitivity_override: None,
            bin_sessions: true,
        }
    }
}

/// Case-insensitive filename wildcard match; `*` spans any run of characters
/// and `?` matches a single character.
fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern = pattern.as_bytes();
    let name = name.as_bytes();

    let mut pi = 0;
    let mut ni = 0;
    let mut star: Option<usize> = None;
    let mut mark = 0;
    while ni < name.len() {
        if pi < pattern.len() && pattern[pi] == b'*' {
            star = Some(pi);
            mark = ni;
            pi += 1;
        } else if pi < pattern.len()
            && (pattern[pi] == b'?' || pattern[pi].eq_ignore_ascii_case(&name[ni]))
        {
            pi += 1;
            ni += 1;
        } else if let Some(star_pos) = star {
            // Backtrack: let the last `*` consume one more character
            pi = star_pos + 1;
            mark += 1;
            ni = mark;
        } else {
            return false;
        }
    }

    pattern[pi..].iter().all(|&c| c == b'*')
}

fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_dir() && file_name_matches(&path, pattern) {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

fn file_name_matches(path: &Path, pattern: &str) -> bool {
    path.file_name()
        .map(|name| wildcard_match(pattern, &name.to_string_lossy()))
        .unwrap_or(false)
}

fn walk_log_dirs(dir: &Path, pattern: &str, log_dirs: &mut BTreeSet<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_log_dirs(&path, pattern, log_dirs)?;
        } else if file_name_matches(&path, pattern) {
            log_dirs.insert(dir.to_path_buf());
        }
    }

    Ok(())
}

/// Recursively find the directories under `top_dir` that directly contain at
/// least one file matching `pattern`.
pub fn collect_log_dirs(top_dir: &Path, pattern: &str) -> Result<BTreeSet<PathBuf>> {
    let mut log_dirs = BTreeSet::new();
    walk_log_dirs(top_dir, pattern, &mut log_dirs)?;

    Ok(log_dirs)
}

fn combine_and_write(
    session_files: &[PathBuf],
    out_filepath: &Path,
    load_opts: &LoadOptions,
) -> Result<()> {
    let log = XbmLog::from_multi_raw_log(session_files, load_opts)?;
    log.to_csv(out_filepath)
}

/// Batch combine raw XBM log files for each logger directory under `top_dir`
/// and dump a serialized [`XbmLog`] per session (or per directory when
/// session binning is off).
///
/// Any pre-existing combined file in a logger directory is overwritten.
/// Per-directory and per-session failures are logged and skipped so one bad
/// logger cannot abort the batch.
pub fn batch_combine(top_dir: &Path, opts: &BatchOptions) -> Result<()> {
    let log_dirs = collect_log_dirs(top_dir, &opts.pattern)?;
    tracing::info!("found {} logger director(ies) to combine", log_dirs.len());

    let load_opts = LoadOptions {
        sensitivity_override: opts.sensitivity_override.clone(),
        normalize_time: true,
        // With an override in hand, headers without sensor lines are fine
        raise_on_missing_sensor: opts.sensitivity_override.is_none(),
        ..Default::default()
    };

    for log_dir in &log_dirs {
        let files_to_combine: Vec<PathBuf> = matching_files(log_dir, &opts.pattern)?
            .into_iter()
            .filter(|path| {
                let stem = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                !opts.skip_strs.iter().any(|skip| stem.contains(skip))
            })
            .collect();

        let dir_name = log_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if opts.bin_sessions {
            let sessions = match bin_logging_sessions(&files_to_combine, true) {
                Ok(sessions) => sessions,
                Err(e) => {
                    tracing::warn!("{e}, skipping directory '{}'", log_dir.display());
                    continue;
                }
            };

            if opts.dry_run {
                tracing::info!(
                    "found {} log session(s) to combine in '{}'",
                    sessions.len(),
                    log_dir.display()
                );
                continue;
            }

            for (i, session_files) in sessions.iter().enumerate() {
                let out_filepath = log_dir.join(format!("{dir_name}_session_{i}_processed.CSV"));
                tracing::info!(
                    "combining {} log(s) from '{}', session {i}",
                    session_files.len(),
                    log_dir.display()
                );

                if let Err(e) = combine_and_write(session_files, &out_filepath, &load_opts) {
                    tracing::warn!("{e}, skipping session");
                }
            }
        } else {
            if opts.dry_run {
                tracing::info!(
                    "would combine {} log(s) from '{}'",
                    files_to_combine.len(),
                    log_dir.display()
                );
                continue;
            }

            let out_filepath = log_dir.join(format!("{dir_name}_processed.CSV"));
            tracing::info!(
                "combining {} log(s) from '{}'",
                files_to_combine.len(),
                log_dir.display()
            );

            if let Err(e) = combine_and_write(&files_to_combine, &out_filepath, &load_opts) {
                tracing::warn!("{e}, skipping directory");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*.CSV", "log_1.CSV"));
        assert!(wildcard_match("*.CSV", "log_1.csv"));
        assert!(wildcard_match("log_?.CSV", "log_1.CSV"));
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("log*processed*", "log_session_0_processed.CSV"));

        assert!(!wildcard_match("*.CSV", "log_1.CSV.bak"));
        assert!(!wildcard_match("log_?.CSV", "log_12.CSV"));
        assert!(!wildcard_match("", "log_1.CSV"));
    }

    #[test]
    fn test_collect_log_dirs() {
        let top = TempDir::new().unwrap();
        let dir_a = top.path().join("logger_a");
        let dir_b = top.path().join("nested").join("logger_b");
        let dir_empty = top.path().join("no_logs");
        fs::create_dir_all(&dir_a).unwrap();
        fs::create_dir_all(&dir_b).unwrap();
        fs::create_dir_all(&dir_empty).unwrap();

        fs::write(dir_a.join("log_1.CSV"), "x").unwrap();
        fs::write(dir_b.join("log_1.csv"), "x").unwrap();
        fs::write(dir_empty.join("notes.txt"), "x").unwrap();

        let log_dirs = collect_log_dirs(top.path(), "*.CSV").unwrap();
        assert_eq!(log_dirs, BTreeSet::from([dir_a, dir_b]));
    }

    #[test]
    fn test_matching_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("log_2.CSV"), "x").unwrap();
        fs::write(dir.path().join("log_1.CSV"), "x").unwrap();
        fs::write(dir.path().join("readme.md"), "x").unwrap();

        let files = matching_files(dir.path(), "*.CSV").unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["log_1.CSV", "log_2.CSV"]);
    }
}
