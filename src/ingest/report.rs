//! Import report.
//!
//! A serializable record of what happened to every file and channel in a run.
//! Printed as the completion marker at the end of an import.

use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use super::aligner::SkipReason;
use super::orientation::Orientation;

/// Outcome of one channel index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelReport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap_id: Option<i32>,
    pub rows_written: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

impl ChannelReport {
    pub fn written(name: String, cap_id: i32, orientation: Orientation, rows_written: u64) -> Self {
        Self {
            name,
            cap_id: Some(cap_id),
            rows_written,
            orientation: Some(orientation),
            skipped: None,
        }
    }

    pub fn skipped(name: String, cap_id: Option<i32>, reason: SkipReason) -> Self {
        Self {
            name,
            cap_id,
            rows_written: 0,
            orientation: None,
            skipped: Some(reason),
        }
    }
}

/// How processing of one file ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Completed,
    /// The requested group is absent; nothing was read.
    Skipped { reason: String, available: Vec<String> },
    /// A fatal error stopped the file part-way; channels already written stay written.
    Failed { kind: String, error: String },
}

/// Outcome of one `(path, group)` job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub group: String,
    #[serde(flatten)]
    pub status: FileStatus,
    pub num_readings: usize,
    pub channels: Vec<ChannelReport>,
}

impl FileReport {
    pub fn new(path: PathBuf, group: String) -> Self {
        Self {
            path,
            group,
            status: FileStatus::Completed,
            num_readings: 0,
            channels: Vec::new(),
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.channels.iter().map(|channel| channel.rows_written).sum()
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelReport> {
        self.channels.iter().find(|channel| channel.name == name)
    }
}

/// Everything a run did, in job order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub run_id: Uuid,
    pub files: Vec<FileReport>,
}

impl ImportReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            files: Vec::new(),
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.files.iter().map(FileReport::rows_written).sum()
    }

    pub fn files_failed(&self) -> usize {
        self.files
            .iter()
            .filter(|file| matches!(file.status, FileStatus::Failed { .. }))
            .count()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
