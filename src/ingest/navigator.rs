//! Hierarchy navigation.
//!
//! Confirms the requested group exists at the top level of a source, copies the
//! master time axis out of it and lists the channel blocks it contains.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{info, warn};

use super::{SERIAL_DATE, TRANSIENT_DATA, serial_date};
use crate::source::{HierarchicalSource, SourceError, join_path};

/// Why a group could not be scanned.
#[derive(Debug, Error)]
pub enum NavigateError {
    /// The group is not a top-level entry. Recoverable: the file is skipped.
    #[error("group '{group}' not found; available: {available:?}")]
    GroupNotFound {
        group: String,
        available: Vec<String>,
    },
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: SourceError,
    },
}

/// What the navigator found inside one group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupScan {
    pub group: String,
    /// Master time axis, flattened and owned.
    pub timestamps: Vec<f64>,
    /// Every entry name under the group's transient-data path.
    pub channel_names: BTreeSet<String>,
}

impl GroupScan {
    pub fn num_readings(&self) -> usize {
        self.timestamps.len()
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channel_names.contains(name)
    }

    /// Path of a dataset inside the named channel block.
    pub fn channel_dataset_path(&self, channel: &str, dataset: &str) -> String {
        join_path(&[&self.group, TRANSIENT_DATA, channel, dataset])
    }
}

/// Scans `group` in `source`. The group name must match a top-level entry
/// exactly; matching is case-sensitive.
pub fn scan_group(
    source: &dyn HierarchicalSource,
    group: &str,
) -> Result<GroupScan, NavigateError> {
    let available = source
        .member_names("")
        .map_err(|source| NavigateError::Read {
            path: "/".to_string(),
            source,
        })?;
    info!(groups = ?available, "Internal groups found");

    if !available.iter().any(|name| name == group) {
        warn!(group, available = ?available, "Group not found in source");
        return Err(NavigateError::GroupNotFound {
            group: group.to_string(),
            available,
        });
    }

    let base_path = join_path(&[group, TRANSIENT_DATA]);
    let stamps_path = join_path(&[&base_path, SERIAL_DATE]);
    let timestamps: Vec<f64> = source
        .read_array(&stamps_path)
        .map_err(|source| NavigateError::Read {
            path: stamps_path.clone(),
            source,
        })?
        .iter()
        .copied()
        .collect();

    let channel_names: BTreeSet<String> = source
        .member_names(&base_path)
        .map_err(|source| NavigateError::Read {
            path: base_path.clone(),
            source,
        })?
        .into_iter()
        .collect();

    match (timestamps.first(), timestamps.last()) {
        (Some(first), Some(last)) => info!(
            group,
            num_readings = timestamps.len(),
            first = %serial_date::describe(*first),
            last = %serial_date::describe(*last),
            "Found unique timestamps"
        ),
        _ => warn!(group, "Master time axis is empty"),
    }

    Ok(GroupScan {
        group: group.to_string(),
        timestamps,
        channel_names,
    })
}

/// Lists `(group, channel blocks)` for every top-level group of a source.
/// Groups without a transient-data path are listed with no channels.
pub fn list_groups(
    source: &dyn HierarchicalSource,
) -> Result<Vec<(String, Vec<String>)>, SourceError> {
    let mut groups = Vec::new();
    for group in source.member_names("")? {
        let base_path = join_path(&[&group, TRANSIENT_DATA]);
        let channels = if source.contains(&base_path) {
            source
                .member_names(&base_path)?
                .into_iter()
                .filter(|name| name != SERIAL_DATE)
                .collect()
        } else {
            Vec::new()
        };
        groups.push((group, channels));
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use ndarray::{Array1, Array2};

    fn fixture() -> MemorySource {
        let stamps = Array2::from_shape_vec((3, 1), vec![735_000.0, 735_000.5, 735_001.0])
            .unwrap()
            .into_dyn();
        let wave = Array2::<f64>::zeros((3, 4)).into_dyn();
        MemorySource::new()
            .with_dataset("ES12/Transient_Data/Serial_Date", stamps)
            .unwrap()
            .with_dataset("ES12/Transient_Data/ES12C1/VL", wave.clone())
            .unwrap()
            .with_dataset("ES12/Transient_Data/ES12C1/VO", wave)
            .unwrap()
    }

    #[test]
    fn scan_flattens_timestamps_and_lists_channels() {
        let scan = scan_group(&fixture(), "ES12").unwrap();

        assert_eq!(scan.timestamps, vec![735_000.0, 735_000.5, 735_001.0]);
        assert_eq!(scan.num_readings(), 3);
        assert!(scan.has_channel("ES12C1"));
        assert!(!scan.has_channel("ES12C2"));
        assert_eq!(
            scan.channel_dataset_path("ES12C1", "VL"),
            "ES12/Transient_Data/ES12C1/VL"
        );
    }

    #[test]
    fn group_match_is_case_sensitive() {
        let err = scan_group(&fixture(), "es12").unwrap_err();

        match err {
            NavigateError::GroupNotFound { group, available } => {
                assert_eq!(group, "es12");
                assert_eq!(available, vec!["ES12".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_time_axis_is_a_read_error() {
        let source = MemorySource::new()
            .with_dataset(
                "ES12/Transient_Data/ES12C1/VL",
                Array1::<f64>::zeros(2).into_dyn(),
            )
            .unwrap();

        assert!(matches!(
            scan_group(&source, "ES12"),
            Err(NavigateError::Read { .. })
        ));
    }

    #[test]
    fn list_groups_reports_channels_per_group() {
        let mut source = fixture();
        source.insert_group("Metadata").unwrap();

        let groups = list_groups(&source).unwrap();

        assert_eq!(
            groups,
            vec![
                ("ES12".to_string(), vec!["ES12C1".to_string()]),
                ("Metadata".to_string(), Vec::new()),
            ]
        );
    }
}
