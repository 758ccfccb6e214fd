//! Cross-region copy of the activity table.
//!
//! The copy is triggered and then given a fixed settle wait. There is no
//! polling of actual completion status, a known approximation carried over
//! from the managed transfer service this models (see DESIGN.md).

use std::time::Duration;

use anyhow::Result;
use papercode_warehouse::{Materializer, TableId, Warehouse, WriteMode};

use crate::sql;
use crate::tables::repo_activity_schema;

pub struct RegionTransfer {
    pub source: TableId,
    pub destination: TableId,
    pub settle: Duration,
}

impl RegionTransfer {
    /// Trigger the copy, then wait out the settle period.
    pub fn run(&self, warehouse: &dyn Warehouse) -> Result<()> {
        log::info!("transferring {} -> {}", self.source, self.destination);
        let copy_sql = sql::region_copy(&self.source);
        Materializer::new(warehouse).materialize(
            &self.destination,
            &repo_activity_schema(),
            &copy_sql,
            &copy_sql,
            WriteMode::Truncate,
        )?;

        if !self.settle.is_zero() {
            log::info!("waiting {:?} for transfer to settle", self.settle);
            std::thread::sleep(self.settle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papercode_warehouse::{DuckWarehouse, Field, FieldType, Value};

    #[test]
    fn copies_rows_across_datasets() {
        let wh = DuckWarehouse::open_in_memory().unwrap();
        wh.ensure_dataset("gha").unwrap();
        wh.ensure_dataset("papers_and_code").unwrap();

        let source = TableId::new("gha", "repo_activity");
        wh.create_table(
            &source,
            &[
                Field::required("name", FieldType::String),
                Field::required("created_at", FieldType::Timestamp),
            ],
        )
        .unwrap();
        wh.insert_rows(
            &source,
            &[vec![
                Value::from("acme/widget"),
                Value::Timestamp("2023-06-14T08:00:00Z".parse().unwrap()),
            ]],
        )
        .unwrap();

        let transfer = RegionTransfer {
            source,
            destination: TableId::new("papers_and_code", "repo_activity"),
            settle: Duration::ZERO,
        };
        transfer.run(&wh).unwrap();

        let rows = wh
            .fetch_rows("SELECT name FROM papers_and_code.repo_activity")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Value::from("acme/widget"));
    }

    #[test]
    fn rerun_replaces_rather_than_duplicates() {
        let wh = DuckWarehouse::open_in_memory().unwrap();
        wh.ensure_dataset("gha").unwrap();
        wh.ensure_dataset("papers_and_code").unwrap();

        let source = TableId::new("gha", "repo_activity");
        wh.create_table(
            &source,
            &[
                Field::required("name", FieldType::String),
                Field::required("created_at", FieldType::Timestamp),
            ],
        )
        .unwrap();
        wh.insert_rows(
            &source,
            &[vec![
                Value::from("acme/widget"),
                Value::Timestamp("2023-06-14T08:00:00Z".parse().unwrap()),
            ]],
        )
        .unwrap();

        let transfer = RegionTransfer {
            source,
            destination: TableId::new("papers_and_code", "repo_activity"),
            settle: Duration::ZERO,
        };
        transfer.run(&wh).unwrap();
        transfer.run(&wh).unwrap();

        let rows = wh
            .fetch_rows("SELECT name FROM papers_and_code.repo_activity")
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
