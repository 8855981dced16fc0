//! Message batcher
//!
//! A multi-frame dump arrives as a burst of independent messages with no
//! end-of-transmission marker. The batcher infers completion from a quiet
//! period: the first message starts a timer, every further message resets
//! it, and when it fires the accumulated batch is delivered downstream as
//! one atomic, ordered delivery.
//!
//! Dropping the batcher while a batch is accumulating discards the pending
//! messages; downstream re-requests to cover the gap.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

/// One flushed delivery: the raw messages of a burst, in arrival order
pub type Batch = Vec<Vec<u8>>;

/// Debounced accumulator grouping message bursts into batches
pub struct MessageBatcher {
    tx: mpsc::Sender<Vec<u8>>,
}

impl MessageBatcher {
    /// Spawn the batcher task; flushed batches are sent to `sink`
    pub fn spawn(quiet_period: Duration, sink: mpsc::Sender<Batch>) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(run(quiet_period, rx, sink));
        Self { tx }
    }

    /// Append one incoming message to the pending batch
    pub async fn push(&self, message: Vec<u8>) {
        if self.tx.send(message).await.is_err() {
            debug!("batcher task gone, message dropped");
        }
    }

    /// Non-async variant for transport callbacks running on foreign threads
    pub fn try_push(&self, message: Vec<u8>) {
        if let Err(e) = self.tx.try_send(message) {
            warn!("batcher queue rejected message: {}", e);
        }
    }
}

async fn run(quiet_period: Duration, mut rx: mpsc::Receiver<Vec<u8>>, sink: mpsc::Sender<Batch>) {
    let mut pending: Batch = Vec::new();

    loop {
        if pending.is_empty() {
            // Idle: nothing buffered, no timer running
            match rx.recv().await {
                Some(message) => pending.push(message),
                None => break,
            }
        } else {
            // Accumulating: the deadline restarts from the latest arrival
            let deadline = Instant::now() + quiet_period;
            tokio::select! {
                message = rx.recv() => match message {
                    Some(message) => pending.push(message),
                    // torn down mid-accumulation: the pending batch is lost
                    None => break,
                },
                _ = sleep_until(deadline) => {
                    let batch = std::mem::take(&mut pending);
                    debug!(messages = batch.len(), "flushing batch");
                    if sink.send(batch).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}
