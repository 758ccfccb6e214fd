//! Bootstrap-or-delta table materialization.

use anyhow::{Context, Result};

use crate::{Field, TableId, TableLookup, Warehouse, WriteMode};

/// Which load path a `materialize` call executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// Table was absent: created it and ran the full historical load.
    Populated,
    /// Table was present: ran only the incremental delta load.
    Delta,
}

/// Decides, per destination table, between a full historical load and an
/// incremental delta, keyed off catalog existence.
///
/// Table creation races are not handled: the scheduled pipeline run is the
/// only writer.
pub struct Materializer<'a> {
    warehouse: &'a dyn Warehouse,
}

impl<'a> Materializer<'a> {
    pub fn new(warehouse: &'a dyn Warehouse) -> Self {
        Self { warehouse }
    }

    /// Probe `table_id`; absent → create with `schema` and run `populate_sql`
    /// (full range, truncate-on-fresh-table), present → run `delta_sql` with
    /// `delta_mode`. An existing table is not an error; it selects the
    /// delta path.
    pub fn materialize(
        &self,
        table_id: &TableId,
        schema: &[Field],
        populate_sql: &str,
        delta_sql: &str,
        delta_mode: WriteMode,
    ) -> Result<MaterializeOutcome> {
        match self
            .warehouse
            .lookup_table(table_id)
            .with_context(|| format!("failed to probe {table_id}"))?
        {
            TableLookup::Absent => {
                log::info!("{table_id}: absent, creating and running full load");
                self.warehouse
                    .create_table(table_id, schema)
                    .with_context(|| format!("failed to create {table_id}"))?;
                self.warehouse
                    .run_query(populate_sql, table_id, WriteMode::Truncate)
                    .with_context(|| format!("full load into {table_id} failed"))?;
                Ok(MaterializeOutcome::Populated)
            }
            TableLookup::Found => {
                log::info!("{table_id}: exists, running delta load");
                self.warehouse
                    .run_query(delta_sql, table_id, delta_mode)
                    .with_context(|| format!("delta load into {table_id} failed"))?;
                Ok(MaterializeOutcome::Delta)
            }
        }
    }
}
