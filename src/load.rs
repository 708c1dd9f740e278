//! Sequential bulk-load of the derived tables into the destination warehouse.
//!
//! Each table load is an independent operation; a failure aborts the run but
//! does not roll back tables already loaded.

use serde_json::Value;
use tracing::info;

use crate::config::SinkConfig;
use crate::error::EtlError;
use crate::model::DerivedTables;
use crate::warehouse::{Warehouse, WarehouseRow};

pub async fn load_tables(
    warehouse: &dyn Warehouse,
    sink: &SinkConfig,
    tables: &DerivedTables,
) -> Result<(), EtlError> {
    warehouse.ensure_dataset().await?;

    load_one(warehouse, sink, &sink.tables.movies_detailed, &tables.movies_detailed).await?;
    load_one(warehouse, sink, &sink.tables.yearly_aggregates, &tables.yearly_aggregates).await?;
    load_one(
        warehouse,
        sink,
        &sink.tables.year_genre_aggregates,
        &tables.year_genre_aggregates,
    )
    .await?;
    load_one(
        warehouse,
        sink,
        &sink.tables.runtime_distribution,
        &tables.runtime_distribution,
    )
    .await?;

    Ok(())
}

async fn load_one<T: WarehouseRow>(
    warehouse: &dyn Warehouse,
    sink: &SinkConfig,
    table_id: &str,
    rows: &[T],
) -> Result<(), EtlError> {
    let payload: Vec<Value> = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<_, _>>()
        .map_err(|e| EtlError::load(table_id, e))?;

    info!(
        table = %table_id,
        rows = payload.len(),
        mode = ?sink.write_mode,
        "loading table"
    );
    warehouse
        .load_table(table_id, T::COLUMNS, &payload, sink.write_mode)
        .await?;
    info!(table = %table_id, "table loaded");
    Ok(())
}
