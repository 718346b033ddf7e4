//! LogSink - logs row summaries via tracing

use contracts::{ContractError, EnrichedRow, RowSink};
use tracing::{info, instrument};

/// Sink that logs rows instead of persisting them (dry runs)
pub struct LogSink {
    name: String,
    rows: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: 0,
        }
    }

    /// Rows seen so far
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl RowSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, row),
        fields(sink = %self.name, vehicle_id = %row.vehicle_id)
    )]
    async fn write(&mut self, row: &EnrichedRow) -> Result<(), ContractError> {
        self.rows += 1;
        info!(
            sink = %self.name,
            utc_time = row.utc_time.as_deref().unwrap_or("-"),
            address = %row.address,
            zipcode = %row.zipcode,
            elevation = ?row.elevation,
            offset = row.offset,
            "Row"
        );
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, rows = self.rows, "LogSink closed");
        Ok(())
    }
}
