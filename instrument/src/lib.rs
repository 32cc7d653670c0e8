//! Event tables for simulation runs.
//!
//! A `tracing` subscriber that turns every info-level event into a row of a
//! table named after the event's target. Columns appear the first time a
//! field is seen; rows that lack a field get a zero value for it.
//!
//! # Usage
//!
//! ```ignore
//! // In simulation code:
//! tracing::info!(target: "trade", agent = name, success = true);
//!
//! // In a test:
//! let (_, tables) = instrument::record(|| engine.run_for(30.0, 0.1));
//! let trades = &tables["trade"];
//! assert!(trades.bools("success").unwrap().iter().any(|s| *s));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

// ============================================================================
// Columns and tables
// ============================================================================

/// One column. The type is fixed by the first value recorded under its name;
/// later values of another type are stored as their string form in a
/// separate `name:str` column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

/// A single recorded value.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Str(String),
}

impl Column {
    fn empty_like(cell: &Cell, rows: usize) -> Self {
        match cell {
            Cell::U64(_) => Column::U64(vec![0; rows]),
            Cell::I64(_) => Column::I64(vec![0; rows]),
            Cell::F64(_) => Column::F64(vec![0.0; rows]),
            Cell::Bool(_) => Column::Bool(vec![false; rows]),
            Cell::Str(_) => Column::Str(vec![String::new(); rows]),
        }
    }

    /// Push `cell` if it fits this column's type. Hands it back otherwise.
    fn push(&mut self, cell: Cell) -> Result<(), Cell> {
        match (self, cell) {
            (Column::U64(v), Cell::U64(x)) => v.push(x),
            (Column::I64(v), Cell::I64(x)) => v.push(x),
            (Column::F64(v), Cell::F64(x)) => v.push(x),
            (Column::Bool(v), Cell::Bool(x)) => v.push(x),
            (Column::Str(v), Cell::Str(x)) => v.push(x),
            (_, cell) => return Err(cell),
        }
        Ok(())
    }

    fn pad_to(&mut self, rows: usize) {
        match self {
            Column::U64(v) => v.resize(rows, 0),
            Column::I64(v) => v.resize(rows, 0),
            Column::F64(v) => v.resize(rows, 0.0),
            Column::Bool(v) => v.resize(rows, false),
            Column::Str(v) => v.resize(rows, String::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::U64(v) => v.len(),
            Column::I64(v) => v.len(),
            Column::F64(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rows recorded under one tracing target.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: HashMap<String, Column>,
    pub rows: usize,
}

impl Table {
    fn push_row(&mut self, cells: Vec<(String, Cell)>) {
        let row = self.rows;
        for (name, cell) in cells {
            let column = self
                .columns
                .entry(name.clone())
                .or_insert_with(|| Column::empty_like(&cell, row));
            if let Err(cell) = column.push(cell) {
                let text = match cell {
                    Cell::U64(x) => x.to_string(),
                    Cell::I64(x) => x.to_string(),
                    Cell::F64(x) => x.to_string(),
                    Cell::Bool(x) => x.to_string(),
                    Cell::Str(x) => x,
                };
                let fallback = self
                    .columns
                    .entry(format!("{name}:str"))
                    .or_insert_with(|| Column::Str(vec![String::new(); row]));
                fallback.pad_to(row);
                let _ = fallback.push(Cell::Str(text));
            }
        }
        self.rows += 1;
        for column in self.columns.values_mut() {
            column.pad_to(self.rows);
        }
    }

    pub fn u64s(&self, name: &str) -> Option<&[u64]> {
        match self.columns.get(name)? {
            Column::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn f64s(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name)? {
            Column::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn bools(&self, name: &str) -> Option<&[bool]> {
        match self.columns.get(name)? {
            Column::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn strs(&self, name: &str) -> Option<&[String]> {
        match self.columns.get(name)? {
            Column::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Indices of rows whose string column `name` equals `value`.
    pub fn rows_where(&self, name: &str, value: &str) -> Vec<usize> {
        self.strs(name)
            .map(|col| {
                col.iter()
                    .enumerate()
                    .filter(|(_, v)| v.as_str() == value)
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut names: Vec<&String> = self.columns.keys().collect();
        names.sort();
        let columns = names
            .into_iter()
            .map(|name| match &self.columns[name] {
                Column::U64(v) => polars::prelude::Column::new(name.into(), v),
                Column::I64(v) => polars::prelude::Column::new(name.into(), v),
                Column::F64(v) => polars::prelude::Column::new(name.into(), v),
                Column::Bool(v) => polars::prelude::Column::new(name.into(), v),
                Column::Str(v) => polars::prelude::Column::new(name.into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

/// All tables of a run, keyed by tracing target.
pub type Tables = HashMap<String, Table>;

thread_local! {
    static TABLES: RefCell<Tables> = RefCell::default();
}

// ============================================================================
// Subscriber
// ============================================================================

#[derive(Default)]
struct RowVisitor {
    cells: Vec<(String, Cell)>,
}

impl RowVisitor {
    fn cell(&mut self, field: &Field, cell: Cell) {
        self.cells.push((field.name().to_string(), cell));
    }
}

impl Visit for RowVisitor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.cell(field, Cell::U64(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.cell(field, Cell::I64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.cell(field, Cell::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.cell(field, Cell::Bool(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.cell(field, Cell::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.cell(field, Cell::Str(format!("{value:?}")));
    }
}

/// Collects info-level events into the calling thread's tables. Spans are
/// ignored.
pub struct TableSubscriber;

impl Subscriber for TableSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut visitor = RowVisitor::default();
        event.record(&mut visitor);
        let target = event.metadata().target().to_string();
        TABLES.with(|t| {
            t.borrow_mut()
                .entry(target)
                .or_default()
                .push_row(visitor.cells)
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install the subscriber process-wide. Later calls are no-ops.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(TableSubscriber);
}

/// Take everything recorded on this thread so far.
pub fn drain() -> Tables {
    TABLES.with(|t| std::mem::take(&mut *t.borrow_mut()))
}

pub fn clear() {
    TABLES.with(|t| t.borrow_mut().clear());
}

/// Run `f` with the subscriber active on this thread only and return what
/// it recorded. Tables from before the call are discarded.
pub fn record<R>(f: impl FnOnce() -> R) -> (R, Tables) {
    clear();
    let out = tracing::subscriber::with_default(TableSubscriber, f);
    (out, drain())
}

// ============================================================================
// Parquet export
// ============================================================================

pub fn to_dataframes(tables: &Tables) -> HashMap<String, DataFrame> {
    tables
        .iter()
        .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
        .collect()
}

/// Write each table as `{dir}/{target}.parquet`.
pub fn save_parquet(tables: &Tables, dir: &Path) -> PolarsResult<()> {
    std::fs::create_dir_all(dir)?;
    for (name, mut df) in to_dataframes(tables) {
        let file = std::fs::File::create(dir.join(format!("{name}.parquet")))?;
        ParquetWriter::new(file).finish(&mut df)?;
    }
    Ok(())
}

/// Records for its whole lifetime and writes parquet files into
/// `{parent}/{unix_seconds}_{name}/` when dropped.
pub struct RunRecorder {
    run_dir: PathBuf,
    tables: Option<Tables>,
}

impl RunRecorder {
    pub fn new(parent: impl Into<PathBuf>, name: &str) -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let safe: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .take(60)
            .collect();
        clear();
        install_subscriber();
        Self {
            run_dir: parent.into().join(format!("{secs}_{safe}")),
            tables: None,
        }
    }

    /// Drain on first call; later calls return the same tables.
    pub fn tables(&mut self) -> &Tables {
        self.tables.get_or_insert_with(drain)
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl Drop for RunRecorder {
    fn drop(&mut self) {
        let tables = self.tables.take().unwrap_or_else(drain);
        if tables.is_empty() {
            return;
        }
        let written = save_parquet(&tables, &self.run_dir)
            .and_then(|()| Ok(std::fs::write(self.run_dir.join("_ready"), b"")?));
        if let Err(e) = written {
            eprintln!("RunRecorder: failed to write {}: {e}", self.run_dir.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_become_rows() {
        let (_, tables) = record(|| {
            tracing::info!(target: "trade", agent = "red", success = true, count = 3u64);
            tracing::info!(target: "trade", agent = "blue", success = false);
            tracing::debug!(target: "trade", agent = "ignored");
        });

        let trades = &tables["trade"];
        assert_eq!(trades.rows, 2);
        assert_eq!(trades.strs("agent").unwrap(), ["red", "blue"]);
        assert_eq!(trades.bools("success").unwrap(), [true, false]);
        // Missing field padded with zero
        assert_eq!(trades.u64s("count").unwrap(), [3, 0]);
        assert_eq!(trades.rows_where("agent", "blue"), vec![1]);
    }

    #[test]
    fn late_columns_are_front_padded() {
        let (_, tables) = record(|| {
            tracing::info!(target: "production", time = 1.0f64);
            tracing::info!(target: "production", time = 2.0f64, factory = "fac1");
        });
        let production = &tables["production"];
        assert_eq!(production.strs("factory").unwrap(), ["", "fac1"]);
        assert_eq!(production.f64s("time").unwrap(), [1.0, 2.0]);
    }

    #[test]
    fn type_clash_spills_to_string_column() {
        let (_, tables) = record(|| {
            tracing::info!(target: "mixed", value = 1u64);
            tracing::info!(target: "mixed", value = "one");
        });
        let mixed = &tables["mixed"];
        assert_eq!(mixed.u64s("value").unwrap(), [1, 0]);
        assert_eq!(mixed.strs("value:str").unwrap(), ["", "one"]);
    }

    #[test]
    fn tables_convert_and_save() {
        let (_, tables) = record(|| {
            tracing::info!(target: "route_refresh", routes = 6u64, open = 2u64);
            tracing::info!(target: "route_refresh", routes = 6u64, open = 3u64);
        });
        let df = tables["route_refresh"].to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 2);

        let dir = tempfile::tempdir().unwrap();
        save_parquet(&tables, dir.path()).unwrap();
        assert!(dir.path().join("route_refresh.parquet").exists());
    }

    #[test]
    fn run_recorder_writes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = {
            let recorder = RunRecorder::new(dir.path(), "smoke run");
            tracing::info!(target: "goal", agent = "red", goal = "fac1");
            recorder.run_dir().to_path_buf()
        };
        let dir_name = run_dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(dir_name.ends_with("_smoke_run"), "{dir_name}");
        assert!(run_dir.join("goal.parquet").exists());
        assert!(run_dir.join("_ready").exists());
    }
}
