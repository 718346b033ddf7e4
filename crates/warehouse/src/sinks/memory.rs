//! MemorySink - records rows in memory

use std::sync::{Arc, Mutex, MutexGuard};

use contracts::{ContractError, EnrichedRow, RowSink};

#[derive(Debug, Default)]
struct Recorded {
    rows: Vec<EnrichedRow>,
    attempts: usize,
}

/// Sink that keeps every row; clones share the same record
///
/// `fail_at` makes the n-th write attempt (0-based) fail permanently.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    name: String,
    recorded: Arc<Mutex<Recorded>>,
    fail_at: Option<usize>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn failing_at(mut self, attempt: usize) -> Self {
        self.fail_at = Some(attempt);
        self
    }

    pub fn rows(&self) -> Vec<EnrichedRow> {
        self.lock().rows.clone()
    }

    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RowSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, row: &EnrichedRow) -> Result<(), ContractError> {
        let mut recorded = self.lock();
        let attempt = recorded.attempts;
        recorded.attempts += 1;
        if self.fail_at == Some(attempt) {
            return Err(ContractError::sink_write(&self.name, "injected write failure"));
        }
        recorded.rows.push(row.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
