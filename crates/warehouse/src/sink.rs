//! WarehouseSink - config-driven sink selection

use std::sync::Arc;

use contracts::{
    ContractError, EnrichedRow, RetryPolicy, RowSink, SinkConfig, SinkKind, WarehouseConfig,
};
use gcp_auth::TokenProvider;
use tracing::info;

use crate::error::WarehouseError;
use crate::sinks::{BigQuerySink, FileSink, LogSink, MemorySink};

/// Any of the concrete sinks, chosen at startup
pub enum WarehouseSink {
    BigQuery(BigQuerySink),
    Log(LogSink),
    File(FileSink),
    Memory(MemorySink),
}

impl WarehouseSink {
    /// Build the sink named by `sink.kind`
    ///
    /// `token_provider` is only used by the BigQuery sink.
    pub fn from_config(
        sink: &SinkConfig,
        warehouse: &WarehouseConfig,
        retry: RetryPolicy,
        token_provider: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self, WarehouseError> {
        let built = match sink.kind {
            SinkKind::BigQuery => {
                let bq = BigQuerySink::new("bigquery", warehouse, retry, token_provider)
                    .map_err(|e| WarehouseError::sink_creation("bigquery", e.to_string()))?;
                Self::BigQuery(bq)
            }
            SinkKind::Log => Self::Log(LogSink::new("log")),
            SinkKind::File => {
                let path = sink
                    .path
                    .as_ref()
                    .ok_or_else(|| WarehouseError::sink_creation("file", "missing 'path'"))?;
                let file = FileSink::new("file", path)
                    .map_err(|e| WarehouseError::sink_creation("file", e.to_string()))?;
                Self::File(file)
            }
        };
        info!(sink = built.name(), "Sink created");
        Ok(built)
    }
}

impl RowSink for WarehouseSink {
    fn name(&self) -> &str {
        match self {
            Self::BigQuery(s) => s.name(),
            Self::Log(s) => s.name(),
            Self::File(s) => s.name(),
            Self::Memory(s) => s.name(),
        }
    }

    async fn write(&mut self, row: &EnrichedRow) -> Result<(), ContractError> {
        match self {
            Self::BigQuery(s) => s.write(row).await,
            Self::Log(s) => s.write(row).await,
            Self::File(s) => s.write(row).await,
            Self::Memory(s) => s.write(row).await,
        }
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        match self {
            Self::BigQuery(s) => s.flush().await,
            Self::Log(s) => s.flush().await,
            Self::File(s) => s.flush().await,
            Self::Memory(s) => s.flush().await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::BigQuery(s) => s.close().await,
            Self::Log(s) => s.close().await,
            Self::File(s) => s.close().await,
            Self::Memory(s) => s.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouse() -> WarehouseConfig {
        WarehouseConfig {
            project_id: "p".into(),
            dataset_id: "d".into(),
            table_id: "t".into(),
            endpoint: "https://bigquery.googleapis.com".into(),
            request_timeout_secs: 30,
        }
    }

    #[test]
    fn test_builds_each_kind() {
        let dir = tempfile::tempdir().unwrap();

        let bq = WarehouseSink::from_config(
            &SinkConfig::default(),
            &warehouse(),
            RetryPolicy::default(),
            None,
        )
        .unwrap();
        assert!(matches!(bq, WarehouseSink::BigQuery(_)));

        let log = WarehouseSink::from_config(
            &SinkConfig {
                kind: SinkKind::Log,
                path: None,
            },
            &warehouse(),
            RetryPolicy::default(),
            None,
        )
        .unwrap();
        assert_eq!(log.name(), "log");

        let file = WarehouseSink::from_config(
            &SinkConfig {
                kind: SinkKind::File,
                path: Some(dir.path().join("rows.jsonl")),
            },
            &warehouse(),
            RetryPolicy::default(),
            None,
        )
        .unwrap();
        assert_eq!(file.name(), "file");
    }

    #[test]
    fn test_file_sink_without_path() {
        let result = WarehouseSink::from_config(
            &SinkConfig {
                kind: SinkKind::File,
                path: None,
            },
            &warehouse(),
            RetryPolicy::default(),
            None,
        );
        assert!(matches!(result, Err(WarehouseError::SinkCreation { .. })));
    }

    #[test]
    fn test_unopenable_file_path_is_a_creation_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = WarehouseSink::from_config(
            &SinkConfig {
                kind: SinkKind::File,
                path: Some(dir.path().to_path_buf()),
            },
            &warehouse(),
            RetryPolicy::default(),
            None,
        );
        assert!(matches!(
            result,
            Err(WarehouseError::SinkCreation { ref name, .. }) if name == "file"
        ));
    }
}
