//! Device session
//!
//! One `DeviceSession` owns the decode pipeline for one device: inbound
//! messages are validated, batched under the profile's quiet period, decoded,
//! and merged into the session's snapshot, strictly in arrival order. File
//! buffers take the same validate/decode/merge path without the batcher.
//!
//! The session is the single writer of its snapshot; consumers read
//! point-in-time clones.

use crate::addressing::PresetIndex;
use crate::batcher::{Batch, MessageBatcher};
use crate::config::DeviceProfile;
use crate::decode::decode;
use crate::error::ProtocolError;
use crate::midi::MessageKind;
use crate::request::{request_all_presets, request_preset, request_preset_object};
use crate::store::PresetSnapshot;
use crate::sysex::{is_protocol_frame, split_stream};
use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Outbound side of the device link
///
/// Only transmission lives here; request construction is pure and selection
/// of the endpoint is the caller's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Endpoint name for logs
    fn name(&self) -> &str;

    /// Send one ready-to-send frame
    async fn send(&self, frame: &[u8]) -> Result<()>;
}

/// Owns the snapshot and the decode pipeline for one device
pub struct DeviceSession {
    profile: DeviceProfile,
    snapshot: Arc<RwLock<PresetSnapshot>>,
    batcher: MessageBatcher,
    batches: watch::Receiver<u64>,
    transport: RwLock<Option<Arc<dyn Transport>>>,
}

impl DeviceSession {
    /// Create a session and spawn its pipeline tasks
    pub fn new(profile: DeviceProfile) -> Self {
        let snapshot = Arc::new(RwLock::new(PresetSnapshot::new()));
        let (batch_tx, batch_rx) = mpsc::channel::<Batch>(16);
        let (seen_tx, seen_rx) = watch::channel(0u64);

        let batcher = MessageBatcher::spawn(
            Duration::from_millis(profile.quiet_period_ms),
            batch_tx,
        );
        tokio::spawn(run_pipeline(
            profile.clone(),
            snapshot.clone(),
            batch_rx,
            seen_tx,
        ));

        Self {
            profile,
            snapshot,
            batcher,
            batches: seen_rx,
            transport: RwLock::new(None),
        }
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Attach the outbound endpoint
    pub fn set_transport(&self, transport: Arc<dyn Transport>) {
        info!("output: {}", transport.name());
        *self.transport.write() = Some(transport);
    }

    /// Feed one inbound transport message
    ///
    /// Callable from a MIDI callback thread. Non-protocol traffic is dropped
    /// here, before batching; that is tolerance, not an error.
    pub fn ingest_message(&self, data: &[u8]) {
        if !is_protocol_frame(&self.profile, data) {
            debug!("ignoring {} message", MessageKind::of(data));
            return;
        }
        self.batcher.try_push(data.to_vec());
    }

    /// Feed a whole byte buffer (e.g. a .syx file) through the decode path
    ///
    /// Rejected before any decoding if larger than the profile's ceiling.
    /// Returns the number of frames merged.
    pub fn ingest_buffer(&self, data: &[u8]) -> Result<usize, ProtocolError> {
        if data.len() > self.profile.max_input_size {
            return Err(ProtocolError::InputTooLarge {
                size: data.len(),
                limit: self.profile.max_input_size,
            });
        }
        let mut snapshot = self.snapshot.write();
        let mut merged = 0;
        for frame in split_stream(data) {
            if !is_protocol_frame(&self.profile, frame) {
                debug!("skipping foreign sysex in buffer");
                continue;
            }
            if apply_frame(&self.profile, &mut snapshot, frame) {
                merged += 1;
            }
        }
        Ok(merged)
    }

    /// Request one preset and wait for the resulting dump
    pub async fn read_preset(&self, index: PresetIndex) -> Result<()> {
        let frame = request_preset(&self.profile, index)?;
        self.send(&frame).await?;
        self.wait_for_dump().await?;
        Ok(())
    }

    /// Request a single object within a preset and wait for the dump
    pub async fn read_preset_object(&self, index: PresetIndex, object_id: u8) -> Result<()> {
        let frame = request_preset_object(&self.profile, index, object_id)?;
        self.send(&frame).await?;
        self.wait_for_dump().await?;
        Ok(())
    }

    /// Request every preset and wait for the dump
    pub async fn read_all_presets(&self) -> Result<()> {
        let frame = request_all_presets(&self.profile);
        self.send(&frame).await?;
        self.wait_for_dump().await?;
        Ok(())
    }

    /// Wait until the next batch has been merged
    ///
    /// The protocol has no acknowledgment; this watchdog is the only
    /// liveness safeguard. Expiry means "no response", not a protocol error.
    pub async fn wait_for_dump(&self) -> Result<(), ProtocolError> {
        let timeout = Duration::from_millis(self.profile.response_timeout_ms);
        let mut batches = self.batches.clone();
        let _ = batches.borrow_and_update();
        match tokio::time::timeout(timeout, batches.changed()).await {
            Ok(Ok(())) => Ok(()),
            // pipeline gone or watchdog expired: either way nothing arrived
            _ => Err(ProtocolError::NoResponse(timeout)),
        }
    }

    /// Point-in-time copy of the accumulated snapshot
    pub fn snapshot(&self) -> PresetSnapshot {
        self.snapshot.read().clone()
    }

    /// Drop all accumulated state for a fresh read
    pub fn clear(&self) {
        self.snapshot.write().clear();
    }

    /// Snapshot's structured data as pretty JSON
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&*self.snapshot.read())
            .context("Failed to serialize snapshot")
    }

    async fn send(&self, frame: &[u8]) -> Result<()> {
        let transport = self
            .transport
            .read()
            .clone()
            .context("no output transport attached")?;
        transport
            .send(frame)
            .await
            .with_context(|| format!("send via {} failed", transport.name()))
    }
}

/// Applies batches in arrival order; the single writer of the snapshot
async fn run_pipeline(
    profile: DeviceProfile,
    snapshot: Arc<RwLock<PresetSnapshot>>,
    mut batches: mpsc::Receiver<Batch>,
    seen: watch::Sender<u64>,
) {
    let mut count = 0u64;
    while let Some(batch) = batches.recv().await {
        {
            let mut snapshot = snapshot.write();
            let mut merged = 0;
            for frame in &batch {
                if apply_frame(&profile, &mut snapshot, frame) {
                    merged += 1;
                }
            }
            debug!(frames = batch.len(), merged, "batch applied");
        }
        count += 1;
        if seen.send(count).is_err() {
            break;
        }
    }
}

/// Decode one validated frame and fold it in; true if it was merged
///
/// A frame that fails to decode is fully dropped: no structured fields and
/// no raw bytes from it survive.
fn apply_frame(profile: &DeviceProfile, snapshot: &mut PresetSnapshot, frame: &[u8]) -> bool {
    match decode(profile, frame) {
        Ok(partial) => {
            snapshot.append_raw(frame);
            snapshot.merge(&partial);
            true
        }
        Err(e) => {
            if e.is_frame_local() {
                warn!("dropping frame: {}", e);
            } else {
                error!("unexpected decode failure: {}", e);
            }
            false
        }
    }
}

/// Timestamped filename for a .syx export, e.g. `pacer-all-20260806-142501.syx`
pub fn timestamped_syx_name(stem: &str) -> String {
    let now = chrono::Local::now();
    format!("{}-{}.syx", stem, now.format("%Y%m%d-%H%M%S"))
}
