//! # Warehouse
//!
//! Row persistence.
//!
//! Responsibilities:
//! - Stream `EnrichedRow`s into BigQuery with a per-write idempotency token
//! - Log / JSON-lines / in-memory sinks for dry runs and tests
//! - Per-sink write counters

pub mod error;
pub mod metered;
pub mod metrics;
pub mod sink;
pub mod sinks;

pub use contracts::{EnrichedRow, RowSink};
pub use error::WarehouseError;
pub use metered::MeteredSink;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sink::WarehouseSink;
pub use sinks::{BigQuerySink, FileSink, LogSink, MemorySink};
