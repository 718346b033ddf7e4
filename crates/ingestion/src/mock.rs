//! Mock message source
//!
//! Replays scripted pull batches without a live queue, records every
//! acknowledge call, and can inject pull/ack failures.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{AckId, ContractError, MessageSource, ReceivedMessage};
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Default)]
struct MockState {
    batches: VecDeque<Vec<ReceivedMessage>>,
    pull_calls: usize,
    ack_calls: Vec<Vec<AckId>>,
    fail_pulls: usize,
    fail_acks: usize,
}

/// Scripted message source for tests and dry runs
pub struct MockMessageSource {
    name: String,
    state: Arc<Mutex<MockState>>,
    drained_tx: watch::Sender<bool>,
    idle_delay: Duration,
}

/// Inspection handle, usable after the source moved into a loop
#[derive(Clone)]
pub struct MockSourceHandle {
    state: Arc<Mutex<MockState>>,
    drained_rx: watch::Receiver<bool>,
}

impl MockMessageSource {
    /// One pull returns one scripted batch; once drained, pulls come back empty
    pub fn new(batches: Vec<Vec<ReceivedMessage>>) -> Self {
        let (drained_tx, _) = watch::channel(false);
        Self {
            name: "mock".to_string(),
            state: Arc::new(Mutex::new(MockState {
                batches: batches.into(),
                ..Default::default()
            })),
            drained_tx,
            idle_delay: Duration::from_millis(5),
        }
    }

    /// Fail the next `n` pulls with a transient transport error
    pub fn with_pull_failures(self, n: usize) -> Self {
        self.lock().fail_pulls = n;
        self
    }

    /// Fail the next `n` acknowledge calls with a permanent error
    pub fn with_ack_failures(self, n: usize) -> Self {
        self.lock().fail_acks = n;
        self
    }

    /// Delay applied to empty pulls, standing in for the server long-poll
    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    pub fn handle(&self) -> MockSourceHandle {
        MockSourceHandle {
            state: Arc::clone(&self.state),
            drained_rx: self.drained_tx.subscribe(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<MockState>) -> std::sync::MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockSourceHandle {
    /// Number of pull calls so far
    pub fn pull_calls(&self) -> usize {
        lock_state(&self.state).pull_calls
    }

    /// Every acknowledge call, in order
    pub fn ack_calls(&self) -> Vec<Vec<AckId>> {
        lock_state(&self.state).ack_calls.clone()
    }

    /// All acknowledged handles, flattened
    pub fn acknowledged(&self) -> Vec<AckId> {
        lock_state(&self.state).ack_calls.concat()
    }

    /// Scripted batches not yet pulled
    pub fn remaining_batches(&self) -> usize {
        lock_state(&self.state).batches.len()
    }

    /// Resolve once a pull found the script empty
    ///
    /// The consumer is sequential, so by then every scripted batch has been
    /// fully processed.
    pub async fn drained(&mut self) {
        let _ = self.drained_rx.wait_for(|drained| *drained).await;
    }
}

impl MessageSource for MockMessageSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn pull(&mut self, max_messages: usize) -> Result<Vec<ReceivedMessage>, ContractError> {
        let next = {
            let mut state = self.lock();
            state.pull_calls += 1;
            if state.fail_pulls > 0 {
                state.fail_pulls -= 1;
                return Err(ContractError::transient("mock", "injected pull failure"));
            }
            state.batches.pop_front()
        };

        match next {
            Some(mut batch) => {
                batch.truncate(max_messages);
                debug!(count = batch.len(), "Mock pull");
                Ok(batch)
            }
            None => {
                self.drained_tx.send_replace(true);
                tokio::time::sleep(self.idle_delay).await;
                Ok(Vec::new())
            }
        }
    }

    async fn acknowledge(&mut self, ack_ids: &[AckId]) -> Result<(), ContractError> {
        let mut state = self.lock();
        if state.fail_acks > 0 {
            state.fail_acks -= 1;
            return Err(ContractError::from_status("mock", 400, "injected ack failure"));
        }
        state.ack_calls.push(ack_ids.to_vec());
        Ok(())
    }
}
