//! Sink implementations
//!
//! BigQuerySink, LogSink, FileSink, and MemorySink.

mod bigquery;
mod file;
mod log;
mod memory;

pub use self::bigquery::BigQuerySink;
pub use self::file::FileSink;
pub use self::log::LogSink;
pub use self::memory::MemorySink;
