//! papercode-warehouse: warehouse contract and table materialization
//!
//! Defines the narrow surface the ingestion pipeline consumes from the
//! storage/query engine (table probe, create, destination queries, row
//! inserts, drops) plus the [`Materializer`] that decides between full
//! population and incremental delta loads. [`DuckWarehouse`] is the embedded
//! DuckDB implementation.

mod duck;
mod materializer;

pub use duck::DuckWarehouse;
pub use materializer::{MaterializeOutcome, Materializer};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

/// Fully-qualified destination table: `dataset.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId {
    dataset: String,
    table: String,
}

impl TableId {
    pub fn new(dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

/// Column types the warehouse schema carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Bool,
    Timestamp,
    Date,
}

/// One typed, nullable-or-required schema field.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
}

impl Field {
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
        }
    }

    pub fn nullable(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
        }
    }
}

/// A cell value moving through `insert_rows` / `fetch_rows`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Str(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
}

impl Value {
    /// String content, if this is a string cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// One warehouse row.
pub type Row = Vec<Value>;

/// Write disposition for a destination query.
///
/// `Truncate` replaces the table contents with the query result (windowed
/// re-computation); `Append` inserts on top of what is there (used where the
/// source query already anti-joins away present rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Truncate,
    Append,
}

/// Result of probing the warehouse catalog for a table.
///
/// Existence of the table IS the lifecycle state: `Absent` drives a full
/// historical load, `Found` an incremental delta. Probe failures surface as
/// `Err`, so callers branch on a value rather than a caught exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLookup {
    Found,
    Absent,
}

/// The storage/query engine surface consumed by the pipeline.
pub trait Warehouse {
    /// Probe the catalog for `id`.
    fn lookup_table(&self, id: &TableId) -> Result<TableLookup>;

    /// Create `id` with the given schema. Fails if the table exists.
    fn create_table(&self, id: &TableId, schema: &[Field]) -> Result<()>;

    /// Execute `sql` writing its result set into `destination`.
    fn run_query(&self, sql: &str, destination: &TableId, mode: WriteMode) -> Result<()>;

    /// Execute a read query and return all result rows.
    fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>>;

    /// Append rows into an existing table.
    fn insert_rows(&self, id: &TableId, rows: &[Row]) -> Result<()>;

    /// Drop `id` if it exists (idempotent, so re-run cleanup steps pass).
    fn delete_table(&self, id: &TableId) -> Result<()>;
}
