//! RowSink trait - warehouse output interface
//!
//! Defines the abstract interface for Sinks.

use crate::{ContractError, EnrichedRow};

/// Row output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(RowSink: Send)]
pub trait LocalRowSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one enriched row
    ///
    /// # Errors
    /// Returns write error once the transport gave up (should include context)
    async fn write(&mut self, row: &EnrichedRow) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
