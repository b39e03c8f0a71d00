//! Colony telemetry: records structured `tracing` events into column tables.
//!
//! The simulation emits one event per resolved sol (target `sol`) plus
//! events for suffocation, colony loss, player actions and market
//! fallbacks. This crate installs a subscriber that appends each event as a
//! row in a table named after its target. Columns appear the first time a
//! field is seen and earlier rows are back-filled with defaults.
//!
//! # Usage
//!
//! ```ignore
//! instrument::install_subscriber();
//! instrument::clear();
//! // ... advance the colony ...
//! let recorder = instrument::drain();
//! let sols = recorder.sol_table().expect("no sols recorded");
//! let (lo, hi) = sols.f64_range("energy").unwrap();
//! ```

use std::cell::RefCell;
use std::collections::HashMap;

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

/// Target of the per-sol event.
pub const SOL_TARGET: &str = "sol";

/// A column of typed values.
#[derive(Debug, Clone)]
pub enum TypedColumn {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl TypedColumn {
    pub fn len(&self) -> usize {
        match self {
            TypedColumn::U64(v) => v.len(),
            TypedColumn::I64(v) => v.len(),
            TypedColumn::F64(v) => v.len(),
            TypedColumn::Bool(v) => v.len(),
            TypedColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pad_to(&mut self, rows: usize) {
        let padding = rows.saturating_sub(self.len());
        match self {
            TypedColumn::U64(v) => v.extend(std::iter::repeat_n(0, padding)),
            TypedColumn::I64(v) => v.extend(std::iter::repeat_n(0, padding)),
            TypedColumn::F64(v) => v.extend(std::iter::repeat_n(0.0, padding)),
            TypedColumn::Bool(v) => v.extend(std::iter::repeat_n(false, padding)),
            TypedColumn::Str(v) => v.extend(std::iter::repeat_n(String::new(), padding)),
        }
    }
}

/// One event target's rows, stored column by column.
#[derive(Debug, Clone, Default)]
pub struct DynamicTable {
    pub columns: HashMap<String, TypedColumn>,
    pub row_count: usize,
}

impl DynamicTable {
    fn pad_columns(&mut self) {
        let rows = self.row_count;
        for col in self.columns.values_mut() {
            col.pad_to(rows);
        }
    }

    pub fn f64_column(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name)? {
            TypedColumn::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn u64_column(&self, name: &str) -> Option<&[u64]> {
        match self.columns.get(name)? {
            TypedColumn::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn bool_column(&self, name: &str) -> Option<&[bool]> {
        match self.columns.get(name)? {
            TypedColumn::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Smallest and largest value of a float column.
    pub fn f64_range(&self, name: &str) -> Option<(f64, f64)> {
        let values = self.f64_column(name)?;
        let first = *values.first()?;
        Some(
            values
                .iter()
                .fold((first, first), |(lo, hi), v| (lo.min(*v), hi.max(*v))),
        )
    }

    /// Convert this table to a polars DataFrame.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|(name, col)| match col {
                TypedColumn::U64(v) => Column::new(name.into(), v),
                TypedColumn::I64(v) => Column::new(name.into(), v),
                TypedColumn::F64(v) => Column::new(name.into(), v),
                TypedColumn::Bool(v) => Column::new(name.into(), v),
                TypedColumn::Str(v) => Column::new(name.into(), v),
            })
            .collect();

        DataFrame::new(columns)
    }
}

/// Tables keyed by tracing target.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub tables: HashMap<String, DynamicTable>,
}

impl Recorder {
    pub fn table(&self, target: &str) -> Option<&DynamicTable> {
        self.tables.get(target)
    }

    /// One row per resolved sol.
    pub fn sol_table(&self) -> Option<&DynamicTable> {
        self.table(SOL_TARGET)
    }

    pub fn rows(&self, target: &str) -> usize {
        self.table(target).map_or(0, |t| t.row_count)
    }

    /// Convert all tables to polars DataFrames.
    pub fn to_dataframes(&self) -> HashMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

thread_local! {
    static RECORDER: RefCell<Recorder> = RefCell::default();
}

/// Pushes each event field onto the matching column.
struct ColumnVisitor<'a> {
    table: &'a mut DynamicTable,
}

impl ColumnVisitor<'_> {
    /// Column for `field`, created and back-filled for earlier rows if new.
    fn column(&mut self, field: &Field, empty: fn(usize) -> TypedColumn) -> &mut TypedColumn {
        let rows = self.table.row_count;
        self.table
            .columns
            .entry(field.name().to_string())
            .or_insert_with(|| empty(rows))
    }
}

impl Visit for ColumnVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if let TypedColumn::U64(v) = self.column(field, |n| TypedColumn::U64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let TypedColumn::I64(v) = self.column(field, |n| TypedColumn::I64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let TypedColumn::F64(v) = self.column(field, |n| TypedColumn::F64(vec![0.0; n])) {
            v.push(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if let TypedColumn::Bool(v) = self.column(field, |n| TypedColumn::Bool(vec![false; n])) {
            v.push(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let TypedColumn::Str(v) =
            self.column(field, |n| TypedColumn::Str(vec![String::new(); n]))
        {
            v.push(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{:?}", value));
    }
}

/// Subscriber that records info-and-above events into the thread-local
/// recorder. Spans are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetrySubscriber;

impl Subscriber for TelemetrySubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target().to_string();

        RECORDER.with(|r| {
            let mut recorder = r.borrow_mut();
            let table = recorder.tables.entry(target).or_default();

            table.pad_columns();
            event.record(&mut ColumnVisitor { table: &mut *table });
            table.row_count += 1;
            // Columns this event did not mention get a default.
            table.pad_columns();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install the TelemetrySubscriber as the global default.
/// Safe to call from every test; only the first call takes effect.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(TelemetrySubscriber);
}

/// Take everything recorded on this thread so far.
pub fn drain() -> Recorder {
    RECORDER.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

/// Clear all recorded data without returning it.
pub fn clear() {
    RECORDER.with(|r| *r.borrow_mut() = Recorder::default());
}
