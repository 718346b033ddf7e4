//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Observation instants travel as the original UTC string (`timestamp` attribute)
//!   and as a parsed `DateTime<Utc>` used for the timezone lookup
//! - All durations in configuration are whole seconds or milliseconds

mod blueprint;
mod enrichment;
mod error;
mod geo;
mod message;
mod retry;
mod row;
mod sink;
mod source;

pub use blueprint::*;
pub use enrichment::*;
pub use error::*;
pub use geo::{GeoProvider, LocalGeoProvider};
pub use message::*;
pub use retry::{retry_transient, RetryPolicy};
pub use row::EnrichedRow;
pub use sink::{LocalRowSink, RowSink};
pub use source::{LocalMessageSource, MessageSource};
