//! # Ingestion Alignment Engine
//!
//! Moves transient voltage measurements out of hierarchical source files and
//! into `prognostics.transient_readings`. Per file the pipeline is strictly
//! sequential:
//!
//! 1. [`navigator`] confirms the group exists, copies the master time axis and
//!    lists the channel blocks present.
//! 2. [`aligner`] walks channel indices `1..=CHANNEL_COUNT`, resolves each
//!    channel against the catalog, normalizes orientation and truncates the
//!    series to a common length.
//! 3. [`loader`] turns the aligned arrays into rows and appends them in bounded
//!    sub-batches.
//!
//! [`importer`] drives the pipeline over a list of files. The catalog and the
//! reading store are reached only through the [`CatalogLookup`] and
//! [`ReadingSink`] ports, so the engine runs against any backend.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::NewTransientReading;

pub mod aligner;
pub mod importer;
pub mod loader;
pub mod navigator;
pub mod orientation;
pub mod report;
pub mod serial_date;

pub use aligner::{AlignedChannel, ChannelOutcome, SkipReason};
pub use importer::{FileErrorPolicy, ImportJob, ImportOptions, Importer};
pub use loader::DiscardSink;
pub use navigator::{GroupScan, NavigateError};
pub use orientation::Orientation;
pub use report::{ChannelReport, FileReport, FileStatus, ImportReport};

/// Number of capacitor slots on the test rig. Channel blocks are named
/// `{group}C1` through `{group}C8`; indices outside that range never exist.
pub const CHANNEL_COUNT: u8 = 8;

/// Sample points per waveform captured at each timestamp.
pub const DEFAULT_POINTS_PER_SAMPLE: usize = 400;

/// Rows per insert statement unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 250;

/// Group-relative path holding the time axis and the channel blocks.
pub const TRANSIENT_DATA: &str = "Transient_Data";

/// Dataset name of the master timestamp vector inside [`TRANSIENT_DATA`].
pub const SERIAL_DATE: &str = "Serial_Date";

/// Dataset name of the load voltage array inside a channel block.
pub const LOAD_VOLTAGE: &str = "VL";

/// Dataset name of the output voltage array inside a channel block.
pub const OUTPUT_VOLTAGE: &str = "VO";

/// Resolves channel names to catalog identifiers.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Returns the capacitor id registered for `name`, if any.
    async fn find_cap_id(&self, name: &str) -> Result<Option<i32>, StoreError>;
}

/// Append-only destination for ingested readings.
#[async_trait]
pub trait ReadingSink: Send + Sync {
    /// Persists `rows` and returns the number of rows written. The batch is
    /// consumed so its memory is released as soon as the write returns.
    async fn append(&self, rows: Vec<NewTransientReading>) -> Result<u64, StoreError>;
}

/// Builds the channel block name for `index` within `group`.
pub fn channel_name(group: &str, index: u8) -> String {
    format!("{group}C{index}")
}
