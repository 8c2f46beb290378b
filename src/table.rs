//! Column-major numeric table keyed by elapsed time.
//!
//! A [`DataTable`] holds a `time` column plus named data columns of
//! `Option<f64>`. Nulls model the device's mixed sampling rates: after an
//! outer join, columns sampled slower than the join's time base hold `None`
//! on the rows they did not report.

use std::io;

use crate::error::{Result, XbmError};
use crate::header::DEFAULT_HEADER_PREFIX;

/// A single named data column.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Tabular log data, column-major, keyed by elapsed-time seconds.
///
/// All columns have exactly `time.len()` values. The time column is kept
/// sorted ascending by the load pipeline; the join and trim operations rely
/// on that ordering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataTable {
    pub time: Vec<f64>,
    pub columns: Vec<Column>,
}

impl DataTable {
    /// Parse data rows against the provided column names.
    ///
    /// Comment lines (device commentary such as shutdown markers) and blank
    /// lines are skipped. A row's time cell must parse; any other cell that
    /// is empty or unparseable becomes `None`. Cells beyond the named columns
    /// are ignored.
    pub fn from_csv_body<'a>(
        lines: impl IntoIterator<Item = &'a str>,
        column_names: &[String],
    ) -> Result<Self> {
        let time_idx =
            column_names
                .iter()
                .position(|name| name == "time")
                .ok_or(XbmError::ColumnNotFound {
                    column: "time".to_string(),
                    table: "log body",
                })?;

        let mut table = Self {
            time: Vec::new(),
            columns: column_names
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != time_idx)
                .map(|(_, name)| Column {
                    name: name.clone(),
                    values: Vec::new(),
                })
                .collect(),
        };

        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with(DEFAULT_HEADER_PREFIX) {
                continue;
            }

            let cells: Vec<&str> = line.split(',').map(str::trim).collect();
            let raw_time = cells.get(time_idx).copied().unwrap_or_default();
            let time = raw_time.parse::<f64>().map_err(|_| {
                XbmError::Parse(format!("unparseable time value '{raw_time}' in row '{line}'"))
            })?;
            table.time.push(time);

            let mut slot = 0;
            for i in 0..column_names.len() {
                if i == time_idx {
                    continue;
                }
                let value = cells.get(i).and_then(|cell| cell.parse::<f64>().ok());
                table.columns[slot].values.push(value);
                slot += 1;
            }
        }

        Ok(table)
    }

    /// Parse a self-describing CSV body whose first non-comment line is the
    /// column header row.
    pub fn from_csv_str(contents: &str) -> Result<Self> {
        let mut lines = contents.lines();
        let header_row = lines
            .by_ref()
            .find(|line| {
                let trimmed = line.trim();
                !trimmed.is_empty() && !trimmed.starts_with(DEFAULT_HEADER_PREFIX)
            })
            .ok_or_else(|| XbmError::Parse("no column header row found".to_string()))?;

        let column_names: Vec<String> =
            header_row.split(',').map(|name| name.trim().to_string()).collect();

        Self::from_csv_body(lines, &column_names)
    }

    pub fn n_rows(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|col| col.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|col| col.name.as_str())
    }

    /// Borrow a column's values by name.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|col| col.name == name)
            .map(|col| col.values.as_slice())
    }

    /// Replace a column's values, or append the column if it does not exist.
    /// The value vector must be one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.time.len());
        match self.columns.iter_mut().find(|col| col.name == name) {
            Some(col) => col.values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
    }

    /// Apply `f` to every present value of the named column. Returns whether
    /// the column exists.
    pub fn map_column(&mut self, name: &str, f: impl Fn(f64) -> f64) -> bool {
        match self.columns.iter_mut().find(|col| col.name == name) {
            Some(col) => {
                for value in col.values.iter_mut().flatten() {
                    *value = f(*value);
                }
                true
            }
            None => false,
        }
    }

    /// Sort rows ascending by time, carrying all columns through the same
    /// permutation. Device time is occasionally non-monotonic across a
    /// buffer flush, so this runs on every load.
    pub fn sort_by_time(&mut self) {
        if self.time.windows(2).all(|pair| pair[0] <= pair[1]) {
            return;
        }

        let mut order: Vec<usize> = (0..self.time.len()).collect();
        order.sort_by(|&a, &b| self.time[a].total_cmp(&self.time[b]));

        self.time = order.iter().map(|&i| self.time[i]).collect();
        for col in &mut self.columns {
            col.values = order.iter().map(|&i| col.values[i]).collect();
        }
    }

    /// Shift the time column so it starts at zero. Loggers that have been
    /// powered for a while start at an abnormally large elapsed time.
    pub fn normalize_time(&mut self) {
        if let Some(&first) = self.time.first() {
            for t in &mut self.time {
                *t -= first;
            }
        }
    }

    /// Concatenate another table's rows below this one's. Column layouts
    /// must match exactly; merged files come from a single logging session
    /// and share a header.
    pub fn append(&mut self, other: DataTable) -> Result<()> {
        let ours: Vec<&str> = self.column_names().collect();
        let theirs: Vec<&str> = other.column_names().collect();
        if ours != theirs {
            return Err(XbmError::Parse(format!(
                "cannot append tables with mismatched columns: [{}] vs [{}]",
                ours.join(", "),
                theirs.join(", ")
            )));
        }

        self.time.extend(other.time);
        for (dst, src) in self.columns.iter_mut().zip(other.columns) {
            dst.values.extend(src.values);
        }

        Ok(())
    }

    /// Index of the row whose time is nearest to `query` (first row wins a
    /// tie). `None` when the table has no rows.
    pub fn nearest_idx(&self, query: f64) -> Option<usize> {
        let mut best = None;
        let mut best_delta = f64::INFINITY;
        for (i, &t) in self.time.iter().enumerate() {
            let delta = (t - query).abs();
            if delta < best_delta {
                best_delta = delta;
                best = Some(i);
            }
        }
        best
    }

    /// Keep only rows `start..=end`. `end` is clamped to the last row.
    pub fn slice_rows(&mut self, start: usize, end: usize) {
        let n = self.time.len();
        if n == 0 || start >= n || end < start {
            self.time.clear();
            for col in &mut self.columns {
                col.values.clear();
            }
            return;
        }

        let end = end.min(n - 1);
        self.time.truncate(end + 1);
        self.time.drain(..start);
        for col in &mut self.columns {
            col.values.truncate(end + 1);
            col.values.drain(..start);
        }
    }

    /// Split the named columns off into their own table, dropping them here.
    ///
    /// The returned table is dense: only rows where every split column holds
    /// a value are kept (with their times). The remainder keeps all rows.
    pub fn split_columns(&mut self, group: &[&str]) -> DataTable {
        let mut split = Vec::new();
        let mut remaining = Vec::new();
        for col in self.columns.drain(..) {
            if group.contains(&col.name.as_str()) {
                split.push(col);
            } else {
                remaining.push(col);
            }
        }
        self.columns = remaining;

        let mut out = DataTable {
            time: Vec::new(),
            columns: split
                .iter()
                .map(|col| Column {
                    name: col.name.clone(),
                    values: Vec::new(),
                })
                .collect(),
        };
        for row in 0..self.time.len() {
            if split.iter().all(|col| col.values[row].is_some()) {
                out.time.push(self.time[row]);
                for (slot, col) in split.iter().enumerate() {
                    out.columns[slot].values.push(col.values[row]);
                }
            }
        }

        out
    }

    /// Full outer join on time across the provided tables.
    ///
    /// The joined time column is the sorted union of the inputs' times;
    /// columns appear in input order and hold `None` on rows their source
    /// table has no entry for. Input tables must be sorted by time.
    pub fn outer_join(tables: &[&DataTable]) -> DataTable {
        let mut times: Vec<f64> = tables
            .iter()
            .flat_map(|table| table.time.iter().copied())
            .collect();
        times.sort_by(f64::total_cmp);
        times.dedup();

        let mut out = DataTable {
            time: times,
            columns: Vec::new(),
        };
        for table in tables {
            for col in &table.columns {
                let values = out
                    .time
                    .iter()
                    .map(|t| {
                        table
                            .time
                            .binary_search_by(|probe| probe.total_cmp(t))
                            .ok()
                            .and_then(|i| col.values[i])
                    })
                    .collect();
                out.columns.push(Column {
                    name: col.name.clone(),
                    values,
                });
            }
        }

        out
    }

    /// Write the table as CSV: a column header row, then one row per time
    /// entry with `None` cells left empty. `f64` display round-trips exactly,
    /// so a written table reparses to the same values.
    pub fn write_csv<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(b"time")?;
        for col in &self.columns {
            write!(out, ",{}", col.name)?;
        }
        writeln!(out)?;

        for row in 0..self.time.len() {
            write!(out, "{}", self.time[row])?;
            for col in &self.columns {
                match col.values[row] {
                    Some(value) => write!(out, ",{value}")?,
                    None => out.write_all(b",")?,
                }
            }
            writeln!(out)?;
        }

        Ok(())
    }
}
