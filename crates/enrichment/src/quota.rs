//! QuotaGuard - enrichment call budget
//!
//! A counter bounded by `limit`. It only goes down through `wait_for_reset`
//! (or `reset`), never on its own.

use std::time::Duration;

use tracing::info;

/// Enrichment budget shared across pull cycles
///
/// Owned by the control loop; single-writer, so no interior mutability.
#[derive(Debug, Clone)]
pub struct QuotaGuard {
    used: u32,
    limit: u32,
    cooldown: Duration,
    resets: u64,
}

impl QuotaGuard {
    pub fn new(limit: u32, cooldown: Duration) -> Self {
        Self {
            used: 0,
            limit,
            cooldown,
            resets: 0,
        }
    }

    /// Take one unit of budget
    ///
    /// Returns `false` without touching the counter once the limit is reached.
    pub fn try_consume(&mut self) -> bool {
        if self.used < self.limit {
            self.used += 1;
            true
        } else {
            false
        }
    }

    /// No budget left until the next reset
    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Number of completed cooldowns
    pub fn resets(&self) -> u64 {
        self.resets
    }

    /// Pause for the cooldown, then zero the counter
    pub async fn wait_for_reset(&mut self) {
        info!(
            used = self.used,
            limit = self.limit,
            cooldown_secs = self.cooldown.as_secs_f64(),
            "Quota exhausted, cooling down"
        );
        tokio::time::sleep(self.cooldown).await;
        self.reset();
    }

    /// Zero the counter immediately
    pub fn reset(&mut self) {
        self.used = 0;
        self.resets += 1;
        info!("Quota counter reset");
    }
}
