//! Fatal loop errors

use contracts::ContractError;
use thiserror::Error;

/// Errors that end the control loop
///
/// Provider failures and malformed messages never show up here.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Pull failed after transport retries
    #[error("pull failed: {source}")]
    Pull { source: ContractError },

    /// Acknowledge failed after transport retries
    #[error("acknowledge of {handles} handle(s) failed: {source}")]
    Acknowledge {
        handles: usize,
        source: ContractError,
    },

    /// Sink write failed after transport retries
    #[error("write for vehicle '{vehicle_id}' failed: {source}")]
    Write {
        vehicle_id: String,
        source: ContractError,
    },
}

impl ConsumerError {
    pub fn pull(source: ContractError) -> Self {
        Self::Pull { source }
    }

    pub fn acknowledge(handles: usize, source: ContractError) -> Self {
        Self::Acknowledge { handles, source }
    }

    pub fn write(vehicle_id: impl Into<String>, source: ContractError) -> Self {
        Self::Write {
            vehicle_id: vehicle_id.into(),
            source,
        }
    }
}
