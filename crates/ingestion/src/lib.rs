//! # Ingestion
//!
//! Queue-facing side of the consumer.
//!
//! Responsibilities:
//! - Pull batches from a Pub/Sub subscription and acknowledge them (`PubSubSource`)
//! - Decode raw payloads into `TelemetryMessage` (`decode`)
//! - Scripted source for tests (`MockMessageSource`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::MessageSource;
//! use ingestion::{decode, PubSubSource};
//!
//! let mut source = PubSubSource::new(&blueprint.queue, blueprint.retry, Some(auth))?;
//! for msg in source.pull(100).await? {
//!     let telemetry = decode(&msg)?;
//! }
//! ```

mod decode;
mod mock;
mod pubsub;

pub use decode::{decode, parse_timestamp, TIMESTAMP_FORMAT};
pub use mock::{MockMessageSource, MockSourceHandle};
pub use pubsub::PubSubSource;
