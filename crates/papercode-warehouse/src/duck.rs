//! Embedded DuckDB implementation of the [`Warehouse`] contract.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate};
use duckdb::types::{TimeUnit, Value as DuckValue};
use duckdb::{Connection, params, params_from_iter};

use crate::{Field, FieldType, Row, TableId, TableLookup, Value, Warehouse, WriteMode};

pub struct DuckWarehouse {
    conn: Connection,
}

impl DuckWarehouse {
    /// Open (or create) a file-backed warehouse.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open warehouse at {}", path.display()))?;
        Ok(Self { conn })
    }

    /// Open a transient in-memory warehouse.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory warehouse")?;
        Ok(Self { conn })
    }

    /// Create a dataset (schema) if it does not exist yet.
    pub fn ensure_dataset(&self, name: &str) -> Result<()> {
        self.conn
            .execute_batch(&format!("CREATE SCHEMA IF NOT EXISTS {name}"))
            .with_context(|| format!("failed to create dataset {name}"))
    }
}

fn ddl_type(ty: FieldType) -> &'static str {
    match ty {
        FieldType::String => "VARCHAR",
        FieldType::Bool => "BOOLEAN",
        FieldType::Timestamp => "TIMESTAMP",
        FieldType::Date => "DATE",
    }
}

fn to_duck(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Str(s) => DuckValue::Text(s.clone()),
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Timestamp(ts) => {
            DuckValue::Timestamp(TimeUnit::Microsecond, ts.timestamp_micros())
        }
        Value::Date(d) => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch");
            DuckValue::Date32((*d - epoch).num_days() as i32)
        }
    }
}

fn from_duck(value: DuckValue) -> Result<Value> {
    Ok(match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::Text(s) | DuckValue::Enum(s) => Value::Str(s),
        DuckValue::Date32(days) => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch");
            Value::Date(epoch + chrono::Duration::days(days as i64))
        }
        DuckValue::Timestamp(unit, raw) => {
            let micros = match unit {
                TimeUnit::Second => raw * 1_000_000,
                TimeUnit::Millisecond => raw * 1_000,
                TimeUnit::Microsecond => raw,
                TimeUnit::Nanosecond => raw / 1_000,
            };
            let ts = DateTime::from_timestamp_micros(micros)
                .with_context(|| format!("timestamp out of range: {micros}us"))?;
            Value::Timestamp(ts)
        }
        other => bail!("unsupported warehouse column value: {other:?}"),
    })
}

impl Warehouse for DuckWarehouse {
    fn lookup_table(&self, id: &TableId) -> Result<TableLookup> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT count(*) FROM information_schema.tables \
                 WHERE table_schema = ? AND table_name = ?",
                params![id.dataset(), id.table()],
                |row| row.get(0),
            )
            .with_context(|| format!("catalog probe for {id} failed"))?;
        Ok(if count > 0 {
            TableLookup::Found
        } else {
            TableLookup::Absent
        })
    }

    fn create_table(&self, id: &TableId, schema: &[Field]) -> Result<()> {
        let cols: Vec<String> = schema
            .iter()
            .map(|f| {
                let null = if f.required { " NOT NULL" } else { "" };
                // Quote names: schemas carry columns like "type" and "date"
                format!("\"{}\" {}{null}", f.name, ddl_type(f.ty))
            })
            .collect();
        self.conn
            .execute_batch(&format!("CREATE TABLE {id} ({})", cols.join(", ")))
            .with_context(|| format!("failed to create table {id}"))
    }

    fn run_query(&self, sql: &str, destination: &TableId, mode: WriteMode) -> Result<()> {
        let batch = match mode {
            // Windowed re-computation: replace contents atomically
            WriteMode::Truncate => format!(
                "BEGIN TRANSACTION; DELETE FROM {destination}; \
                 INSERT INTO {destination} {sql}; COMMIT;"
            ),
            WriteMode::Append => format!("INSERT INTO {destination} {sql}"),
        };
        self.conn
            .execute_batch(&batch)
            .with_context(|| format!("destination query into {destination} failed"))
    }

    fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql).context("failed to prepare query")?;
        let mut rows = stmt.query([]).context("query failed")?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let n = row.as_ref().column_count();
            let mut converted = Row::with_capacity(n);
            for i in 0..n {
                converted.push(from_duck(row.get::<_, DuckValue>(i)?)?);
            }
            out.push(converted);
        }
        Ok(out)
    }

    fn insert_rows(&self, id: &TableId, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let placeholders = vec!["?"; rows[0].len()].join(", ");
        let mut stmt = self
            .conn
            .prepare(&format!("INSERT INTO {id} VALUES ({placeholders})"))
            .with_context(|| format!("failed to prepare insert into {id}"))?;
        for row in rows {
            stmt.execute(params_from_iter(row.iter().map(to_duck)))
                .with_context(|| format!("insert into {id} failed"))?;
        }
        Ok(())
    }

    fn delete_table(&self, id: &TableId) -> Result<()> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {id}"))
            .with_context(|| format!("failed to drop {id}"))
    }
}
