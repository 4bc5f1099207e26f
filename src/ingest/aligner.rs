//! Entity resolution and alignment.
//!
//! For each channel index the resolver checks the channel block is present,
//! gates it on catalog membership, copies its two waveform arrays, normalizes
//! their orientation and truncates timestamps and waveforms to a common length.
//! Surplus samples on either side are dropped; nothing is padded or
//! interpolated.

use std::fmt;

use ndarray::{Array2, ArrayD, Ix2, s};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::navigator::GroupScan;
use super::orientation::Orientation;
use super::{CatalogLookup, LOAD_VOLTAGE, OUTPUT_VOLTAGE, channel_name};
use crate::error::IngestError;
use crate::source::HierarchicalSource;

/// Why a channel produced no rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The channel block is not in the source. Expected for unused slots.
    NotInSource,
    /// The channel exists but has no catalog entry.
    NotInCatalog,
    /// The waveform arrays cannot be paired into rows.
    ShapeMismatch { detail: String },
}

impl SkipReason {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::NotInSource => "not_in_source",
            SkipReason::NotInCatalog => "not_in_catalog",
            SkipReason::ShapeMismatch { .. } => "shape_mismatch",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotInSource => write!(f, "not in file"),
            SkipReason::NotInCatalog => write!(f, "catalog entry missing"),
            SkipReason::ShapeMismatch { detail } => write!(f, "shape mismatch: {detail}"),
        }
    }
}

/// Time-major series truncated to a common length.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub orientation: Orientation,
    pub timestamps: Vec<f64>,
    /// `[n, points]`
    pub load: Array2<f64>,
    /// `[n, points]`
    pub output: Array2<f64>,
}

impl Alignment {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// A channel ready for loading.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedChannel {
    pub name: String,
    pub cap_id: i32,
    pub alignment: Alignment,
}

/// Result of resolving one channel index.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelOutcome {
    Aligned(AlignedChannel),
    Skipped {
        name: String,
        cap_id: Option<i32>,
        reason: SkipReason,
    },
}

/// Normalizes and truncates one channel's arrays against the master time axis.
///
/// The orientation is decided from `load` alone and applied to both arrays.
/// The row count is `min(timestamps.len(), time_steps(load))`; `output` must
/// cover at least that many time steps and both arrays must carry `points`
/// values per time step.
pub fn align(
    timestamps: &[f64],
    load: ArrayD<f64>,
    output: ArrayD<f64>,
    points: usize,
) -> Result<Alignment, SkipReason> {
    let load = into_2d(load, "load")?;
    let output = into_2d(output, "output")?;

    let orientation = Orientation::classify(load.dim(), points);
    let load = orientation.normalize(load);
    let output = orientation.normalize(output);

    if load.ncols() != points {
        return Err(SkipReason::ShapeMismatch {
            detail: format!(
                "load voltage has {} points per sample after {orientation:?} normalization, expected {points}",
                load.ncols()
            ),
        });
    }

    let n = timestamps.len().min(load.nrows());

    if output.ncols() != points || output.nrows() < n {
        return Err(SkipReason::ShapeMismatch {
            detail: format!(
                "output voltage shape {:?} cannot be paired with {n} rows of {points} points",
                output.dim()
            ),
        });
    }

    Ok(Alignment {
        orientation,
        timestamps: timestamps[..n].to_vec(),
        load: load.slice(s![..n, ..]).to_owned(),
        output: output.slice(s![..n, ..]).to_owned(),
    })
}

fn into_2d(array: ArrayD<f64>, label: &str) -> Result<Array2<f64>, SkipReason> {
    let ndim = array.ndim();
    array
        .into_dimensionality::<Ix2>()
        .map_err(|_| SkipReason::ShapeMismatch {
            detail: format!("{label} voltage is {ndim}-D, expected 2-D"),
        })
}

/// Resolves channel `index` of the scanned group.
///
/// Catalog and read failures are returned as errors and end processing of the
/// file; every other condition is a [`ChannelOutcome`].
#[instrument(skip_all, fields(group = %scan.group, index = index))]
pub async fn resolve_channel(
    source: &dyn HierarchicalSource,
    scan: &GroupScan,
    index: u8,
    catalog: &dyn CatalogLookup,
    points: usize,
) -> Result<ChannelOutcome, IngestError> {
    let name = channel_name(&scan.group, index);

    if !scan.has_channel(&name) {
        info!(channel = %name, "Skipping channel: not in file");
        return Ok(ChannelOutcome::Skipped {
            name,
            cap_id: None,
            reason: SkipReason::NotInSource,
        });
    }

    let cap_id = catalog
        .find_cap_id(&name)
        .await
        .map_err(|source| IngestError::Catalog {
            channel: name.clone(),
            source,
        })?;

    let Some(cap_id) = cap_id else {
        warn!(channel = %name, "Skipping channel: catalog entry missing");
        return Ok(ChannelOutcome::Skipped {
            name,
            cap_id: None,
            reason: SkipReason::NotInCatalog,
        });
    };

    info!(channel = %name, cap_id, "Processing channel");

    let load = read(source, &scan.channel_dataset_path(&name, LOAD_VOLTAGE))?;
    let output = read(source, &scan.channel_dataset_path(&name, OUTPUT_VOLTAGE))?;

    match align(&scan.timestamps, load, output, points) {
        Ok(alignment) => {
            if alignment.orientation == Orientation::Ambiguous {
                warn!(
                    channel = %name,
                    points,
                    "Square waveform array; orientation cannot be inferred, treating as time-major"
                );
            }
            Ok(ChannelOutcome::Aligned(AlignedChannel {
                name,
                cap_id,
                alignment,
            }))
        }
        Err(reason) => {
            warn!(channel = %name, cap_id, %reason, "Skipping channel: arrays cannot be aligned");
            Ok(ChannelOutcome::Skipped {
                name,
                cap_id: Some(cap_id),
                reason,
            })
        }
    }
}

fn read(source: &dyn HierarchicalSource, path: &str) -> Result<ArrayD<f64>, IngestError> {
    source
        .read_array(path)
        .map_err(|source| IngestError::Read {
            path: path.to_string(),
            source,
        })
}
