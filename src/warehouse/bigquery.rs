//! BigQuery-backed [`Warehouse`] implementation.

use async_trait::async_trait;
use gcp_bigquery_client::Client;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::dataset::Dataset;
use gcp_bigquery_client::model::table::Table;
use gcp_bigquery_client::model::table_data_insert_all_request::TableDataInsertAllRequest;
use gcp_bigquery_client::model::table_field_schema::TableFieldSchema;
use gcp_bigquery_client::model::table_schema::TableSchema;
use gcp_bigquery_client::yup_oauth2::ServiceAccountKey;
use tracing::{debug, info};

use super::{ColumnKind, ColumnSpec, Warehouse};
use crate::config::{SinkConfig, WriteMode};
use crate::error::EtlError;

/// Rows per streaming-insert request.
const INSERT_CHUNK: usize = 500;

pub struct BigQueryWarehouse {
    client: Client,
    project_id: String,
    dataset_id: String,
}

impl BigQueryWarehouse {
    /// Authenticates with the service-account bundle from `sink`.
    pub async fn connect(sink: &SinkConfig) -> Result<Self, EtlError> {
        let creds = &sink.credentials;
        let key = ServiceAccountKey {
            key_type: Some("service_account".to_string()),
            project_id: Some(sink.project_id.clone()),
            private_key_id: creds.private_key_id.clone(),
            private_key: creds.private_key.clone(),
            client_email: creds.client_email.clone(),
            client_id: creds.client_id.clone(),
            auth_uri: creds.auth_uri.clone(),
            token_uri: creds.token_uri.clone(),
            auth_provider_x509_cert_url: creds.auth_provider_x509_cert_url.clone(),
            client_x509_cert_url: creds.client_x509_cert_url.clone(),
        };

        let client = Client::from_service_account_key(key, false)
            .await
            .map_err(|e| EtlError::Config(format!("failed to build BigQuery client: {e}")))?;

        Ok(Self {
            client,
            project_id: sink.project_id.clone(),
            dataset_id: sink.dataset_id.clone(),
        })
    }

    fn table_schema(columns: &[ColumnSpec]) -> TableSchema {
        TableSchema::new(
            columns
                .iter()
                .map(|column| match column.kind {
                    ColumnKind::String => TableFieldSchema::string(column.name),
                    ColumnKind::Integer => TableFieldSchema::integer(column.name),
                    ColumnKind::Float => TableFieldSchema::float(column.name),
                })
                .collect(),
        )
    }

    async fn create_table(
        &self,
        table_id: &str,
        columns: &[ColumnSpec],
    ) -> Result<(), BQError> {
        self.client
            .table()
            .create(Table::new(
                &self.project_id,
                &self.dataset_id,
                table_id,
                Self::table_schema(columns),
            ))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn ensure_dataset(&self) -> Result<(), EtlError> {
        let exists = self
            .client
            .dataset()
            .exists(&self.project_id, &self.dataset_id)
            .await
            .map_err(|e| EtlError::load(&self.dataset_id, e))?;

        if exists {
            debug!(dataset = %self.dataset_id, "dataset already present");
            return Ok(());
        }

        self.client
            .dataset()
            .create(Dataset::new(&self.project_id, &self.dataset_id))
            .await
            .map_err(|e| EtlError::load(&self.dataset_id, e))?;
        info!(dataset = %self.dataset_id, "dataset created");
        Ok(())
    }

    async fn load_table(
        &self,
        table_id: &str,
        columns: &[ColumnSpec],
        rows: &[serde_json::Value],
        mode: WriteMode,
    ) -> Result<(), EtlError> {
        let load_err = |e: BQError| EtlError::load(table_id, e);

        let exists = self
            .client
            .table()
            .exists(&self.project_id, &self.dataset_id, table_id)
            .await
            .map_err(load_err)?;

        match mode {
            WriteMode::Replace => {
                if exists {
                    self.client
                        .table()
                        .delete(&self.project_id, &self.dataset_id, table_id)
                        .await
                        .map_err(load_err)?;
                }
                self.create_table(table_id, columns).await.map_err(load_err)?;
            }
            WriteMode::Append => {
                if !exists {
                    self.create_table(table_id, columns).await.map_err(load_err)?;
                }
            }
        }

        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut request = TableDataInsertAllRequest::new();
            for row in chunk {
                request.add_row(None, row).map_err(load_err)?;
            }

            let response = self
                .client
                .tabledata()
                .insert_all(&self.project_id, &self.dataset_id, table_id, request)
                .await
                .map_err(load_err)?;

            if let Some(errors) = response.insert_errors {
                if !errors.is_empty() {
                    return Err(EtlError::load(
                        table_id,
                        format!("{} rows rejected by streaming insert", errors.len()),
                    ));
                }
            }
        }

        debug!(table = %table_id, rows = rows.len(), "table load complete");
        Ok(())
    }
}
