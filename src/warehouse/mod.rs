//! Destination warehouse abstraction.
//!
//! A [`Warehouse`] addresses a single project/dataset pair fixed at
//! construction; the loader only decides which tables go where.

pub mod bigquery;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::WriteMode;
use crate::error::EtlError;

#[derive(Debug, Clone, Copy)]
pub enum ColumnKind {
    String,
    Integer,
    Float,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// A row type that knows its destination column layout.
pub trait WarehouseRow: Serialize {
    const COLUMNS: &'static [ColumnSpec];
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Creates the destination dataset if it does not already exist.
    async fn ensure_dataset(&self) -> Result<(), EtlError>;

    /// Bulk-loads `rows` into `table_id`, replacing or appending per `mode`.
    async fn load_table(
        &self,
        table_id: &str,
        columns: &[ColumnSpec],
        rows: &[serde_json::Value],
        mode: WriteMode,
    ) -> Result<(), EtlError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::{ColumnSpec, Warehouse};
    use crate::config::WriteMode;
    use crate::error::EtlError;

    /// Warehouse double that applies write modes to an in-memory table store.
    #[derive(Default)]
    pub(crate) struct InMemoryWarehouse {
        pub(crate) dataset_created: AtomicBool,
        pub(crate) tables: Mutex<HashMap<String, Vec<serde_json::Value>>>,
    }

    impl InMemoryWarehouse {
        pub(crate) fn row_count(&self, table_id: &str) -> usize {
            self.tables
                .lock()
                .unwrap()
                .get(table_id)
                .map_or(0, Vec::len)
        }
    }

    #[async_trait]
    impl Warehouse for InMemoryWarehouse {
        async fn ensure_dataset(&self) -> Result<(), EtlError> {
            self.dataset_created.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn load_table(
            &self,
            table_id: &str,
            _columns: &[ColumnSpec],
            rows: &[serde_json::Value],
            mode: WriteMode,
        ) -> Result<(), EtlError> {
            let mut tables = self.tables.lock().unwrap();
            let destination = tables.entry(table_id.to_string()).or_default();
            if mode == WriteMode::Replace {
                destination.clear();
            }
            destination.extend_from_slice(rows);
            Ok(())
        }
    }
}
