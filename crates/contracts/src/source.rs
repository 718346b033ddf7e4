//! MessageSource trait - queue input interface

use crate::{AckId, ContractError, ReceivedMessage};

/// Queue consumer interface
///
/// Implementations surface transport failures instead of swallowing them;
/// any retry belongs to the transport client, not to the caller.
#[trait_variant::make(MessageSource: Send)]
pub trait LocalMessageSource {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Pull up to `max_messages` messages
    ///
    /// Allowed to block server-side until messages arrive; an empty vector
    /// means the queue had nothing ready.
    async fn pull(&mut self, max_messages: usize) -> Result<Vec<ReceivedMessage>, ContractError>;

    /// Acknowledge a batch of handles in one call
    async fn acknowledge(&mut self, ack_ids: &[AckId]) -> Result<(), ContractError>;
}
