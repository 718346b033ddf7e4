//! # Consumer
//!
//! The consumption pipeline: pull, decode, enrich under quota, build row,
//! write, acknowledge.
//!
//! ```ignore
//! use consumer::ControlLoop;
//! use enrichment::Enricher;
//! use tokio_util::sync::CancellationToken;
//!
//! let mut control = ControlLoop::new(source, Enricher::new(maps), sink, &blueprint.consumer);
//! let stats = control.run(CancellationToken::new()).await?;
//! ```

mod control_loop;
mod error;
mod row_builder;
mod stats;

pub use control_loop::{ControlLoop, LoopState, MessageOutcome};
pub use error::ConsumerError;
pub use row_builder::RowBuilder;
pub use stats::LoopStats;
