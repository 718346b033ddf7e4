//! BigQuerySink - streaming inserts via tabledata.insertAll

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    retry_transient, ContractError, EnrichedRow, RetryPolicy, RowSink, WarehouseConfig,
};
use gcp_auth::TokenProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SERVICE: &str = "bigquery";
const BIGQUERY_SCOPES: &[&str] = &["https://www.googleapis.com/auth/bigquery.insertdata"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InsertAllRequest<'a> {
    skip_invalid_rows: bool,
    ignore_unknown_values: bool,
    rows: Vec<InsertRow<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertRow<'a> {
    insert_id: String,
    json: &'a EnrichedRow,
}

impl<'a> InsertAllRequest<'a> {
    /// Wrap one row with a fresh idempotency token
    pub(crate) fn single(row: &'a EnrichedRow) -> Self {
        Self {
            skip_invalid_rows: false,
            ignore_unknown_values: false,
            rows: vec![InsertRow {
                insert_id: Uuid::new_v4().to_string(),
                json: row,
            }],
        }
    }

    pub(crate) fn insert_id(&self) -> &str {
        self.rows.first().map(|r| r.insert_id.as_str()).unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<RowInsertErrors>,
}

#[derive(Debug, Deserialize)]
struct RowInsertErrors {
    #[serde(default)]
    index: u64,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

/// Sink that streams rows into a BigQuery table
///
/// Every `write` generates one `insertId`; transport retries re-send the same
/// request, so the warehouse can deduplicate them. A new `write` of the same
/// row gets a new token and lands as a new record.
pub struct BigQuerySink {
    name: String,
    url: String,
    table: String,
    client: reqwest::Client,
    token_provider: Option<Arc<dyn TokenProvider>>,
    retry: RetryPolicy,
}

impl BigQuerySink {
    pub fn new(
        name: impl Into<String>,
        config: &WarehouseConfig,
        retry: RetryPolicy,
        token_provider: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self, ContractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                ContractError::transport(SERVICE, format!("failed to create HTTP client: {e}"))
            })?;

        let url = format!(
            "{}/bigquery/v2/projects/{}/datasets/{}/tables/{}/insertAll",
            config.endpoint.trim_end_matches('/'),
            config.project_id,
            config.dataset_id,
            config.table_id
        );

        Ok(Self {
            name: name.into(),
            url,
            table: format!(
                "{}.{}.{}",
                config.project_id, config.dataset_id, config.table_id
            ),
            client,
            token_provider,
            retry,
        })
    }

    /// `project.dataset.table`
    pub fn table(&self) -> &str {
        &self.table
    }

    async fn send(&self, body: &InsertAllRequest<'_>) -> Result<(), ContractError> {
        let mut request = self.client.post(&self.url).json(body);
        if let Some(provider) = &self.token_provider {
            let token = provider
                .token(BIGQUERY_SCOPES)
                .await
                .map_err(|e| ContractError::transient(SERVICE, format!("access token: {e}")))?;
            request = request.bearer_auth(token.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ContractError::transient(SERVICE, e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ContractError::transient(SERVICE, format!("reading response: {e}")))?;

        if !status.is_success() {
            return Err(ContractError::from_status(SERVICE, status.as_u16(), text));
        }
        check_insert_errors(&self.name, &text)
    }
}

/// Row-level rejections come back with HTTP 200
fn check_insert_errors(sink_name: &str, text: &str) -> Result<(), ContractError> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let response: InsertAllResponse = serde_json::from_str(text).map_err(|e| {
        ContractError::sink_write(sink_name, format!("invalid insertAll response: {e}"))
    })?;

    match response.insert_errors.first() {
        None => Ok(()),
        Some(row) => {
            let detail = row
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.reason, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            Err(ContractError::sink_write(
                sink_name,
                format!("row {} rejected: {detail}", row.index),
            ))
        }
    }
}

impl RowSink for BigQuerySink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "bigquery_insert",
        skip(self, row),
        fields(sink = %self.name, vehicle_id = %row.vehicle_id)
    )]
    async fn write(&mut self, row: &EnrichedRow) -> Result<(), ContractError> {
        let body = InsertAllRequest::single(row);
        debug!(insert_id = body.insert_id(), "Streaming row");
        retry_transient(&self.retry, "bigquery.insertAll", || self.send(&body)).await
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        // Streaming inserts are not buffered
        Ok(())
    }

    #[instrument(name = "bigquery_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, table = %self.table, "BigQuerySink closed");
        Ok(())
    }
}
