//! Batch loading.
//!
//! Materializes aligned arrays into row records one sub-batch at a time and
//! hands each batch to the sink. A batch is moved into the sink call, so at
//! most one batch of rows is alive at any moment and the channel's arrays are
//! released when [`load_channel`] returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tracing::{debug, info, instrument};

use super::ReadingSink;
use super::aligner::AlignedChannel;
use crate::error::{IngestError, StoreError};
use crate::models::NewTransientReading;

/// Writes every row of `channel` to `sink` in sub-batches of `batch_size`.
///
/// Returns the number of rows the sink reported as written. A channel with no
/// aligned rows never reaches the sink. Sink failures are returned unchanged
/// in meaning and end processing of the current file.
#[instrument(
    skip_all,
    fields(channel = %channel.name, cap_id = channel.cap_id, rows = channel.alignment.len())
)]
pub async fn load_channel(
    sink: &dyn ReadingSink,
    channel: AlignedChannel,
    batch_size: usize,
) -> Result<u64, IngestError> {
    let AlignedChannel {
        name,
        cap_id,
        alignment,
    } = channel;
    let total = alignment.len();

    if total == 0 {
        info!(channel = %name, "No aligned rows; nothing to write");
        return Ok(0);
    }

    let batch_size = batch_size.max(1);
    let started = Instant::now();
    let mut written = 0u64;

    info!(channel = %name, rows = total, batch_size, "Writing rows to database");

    for start in (0..total).step_by(batch_size) {
        let end = (start + batch_size).min(total);
        let batch: Vec<NewTransientReading> = (start..end)
            .map(|t| NewTransientReading {
                cap_id,
                serial_date: alignment.timestamps[t],
                v_load: alignment.load.row(t).to_vec(),
                v_out: alignment.output.row(t).to_vec(),
            })
            .collect();

        let count = sink
            .append(batch)
            .await
            .map_err(|source| IngestError::Write {
                channel: name.clone(),
                source,
            })?;
        written += count;
        debug!(channel = %name, start, end, count, "Batch written");
    }

    counter!("ingest_rows_written_total").increment(written);
    histogram!("ingest_channel_write_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
    info!(channel = %name, cap_id, written, "Channel saved");

    Ok(written)
}

/// Sink that counts rows and drops them. Backs `--dry-run`.
#[derive(Debug, Default)]
pub struct DiscardSink {
    rows: AtomicU64,
    batches: AtomicU64,
}

impl DiscardSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> u64 {
        self.rows.load(Ordering::Relaxed)
    }

    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReadingSink for DiscardSink {
    async fn append(&self, rows: Vec<NewTransientReading>) -> Result<u64, StoreError> {
        let count = rows.len() as u64;
        self.rows.fetch_add(count, Ordering::Relaxed);
        self.batches.fetch_add(1, Ordering::Relaxed);
        Ok(count)
    }
}
