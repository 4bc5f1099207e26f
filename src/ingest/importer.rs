//! Batch import driver.
//!
//! Runs navigator, resolver and loader over an ordered list of
//! `(path, group)` jobs. One file at a time, one channel at a time; the source
//! handle lives only inside the per-file scope and is dropped on every exit
//! path.

use std::path::PathBuf;
use std::str::FromStr;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::aligner::{self, ChannelOutcome};
use super::loader;
use super::navigator::{self, NavigateError};
use super::report::{ChannelReport, FileReport, FileStatus, ImportReport};
use super::{
    CHANNEL_COUNT, CatalogLookup, DEFAULT_BATCH_SIZE, DEFAULT_POINTS_PER_SAMPLE, ReadingSink,
};
use crate::error::IngestError;
use crate::source::SourceOpener;

/// One file to import and the group to read from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportJob {
    pub path: PathBuf,
    pub group: String,
}

impl ImportJob {
    pub fn new(path: impl Into<PathBuf>, group: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            group: group.into(),
        }
    }
}

/// Parses `GROUP=PATH`.
impl FromStr for ImportJob {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once('=') {
            Some((group, path)) if !group.trim().is_empty() && !path.trim().is_empty() => {
                Ok(ImportJob::new(path.trim(), group.trim()))
            }
            _ => Err(format!("expected GROUP=PATH, got '{value}'")),
        }
    }
}

/// What to do when a file fails with a fatal error (sink, catalog or read
/// failure). Missing groups are always skipped regardless of policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorPolicy {
    /// Record the failure and move on to the next file.
    #[default]
    Continue,
    /// Stop the batch and return the error.
    Abort,
}

impl FromStr for FileErrorPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(FileErrorPolicy::Continue),
            "abort" => Ok(FileErrorPolicy::Abort),
            other => Err(format!("expected 'continue' or 'abort', got '{other}'")),
        }
    }
}

/// Tunables for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    pub batch_size: usize,
    pub points_per_sample: usize,
    pub on_file_error: FileErrorPolicy,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            points_per_sample: DEFAULT_POINTS_PER_SAMPLE,
            on_file_error: FileErrorPolicy::default(),
        }
    }
}

/// Runs imports against explicitly supplied collaborators.
pub struct Importer<'a> {
    opener: &'a dyn SourceOpener,
    catalog: &'a dyn CatalogLookup,
    sink: &'a dyn ReadingSink,
    options: ImportOptions,
}

impl<'a> Importer<'a> {
    pub fn new(
        opener: &'a dyn SourceOpener,
        catalog: &'a dyn CatalogLookup,
        sink: &'a dyn ReadingSink,
        options: ImportOptions,
    ) -> Self {
        Self {
            opener,
            catalog,
            sink,
            options,
        }
    }

    /// Imports every job in order.
    ///
    /// Skips are recorded in the report. Fatal per-file errors are recorded and
    /// the batch continues under [`FileErrorPolicy::Continue`]; under
    /// [`FileErrorPolicy::Abort`] the first one is returned as
    /// [`IngestError::FileAborted`], carrying the report so far, and later
    /// files are not attempted.
    pub async fn run_batch_import(&self, jobs: &[ImportJob]) -> Result<ImportReport, IngestError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("import_run", %run_id, files = jobs.len());

        async {
            let mut report = ImportReport::new(run_id);
            info!(
                batch_size = self.options.batch_size,
                points_per_sample = self.options.points_per_sample,
                on_file_error = ?self.options.on_file_error,
                "Starting import run"
            );

            for job in jobs {
                let mut file_report = FileReport::new(job.path.clone(), job.group.clone());
                let result = self
                    .import_file(job, &mut file_report)
                    .instrument(info_span!(
                        "import_file",
                        path = %job.path.display(),
                        group = %job.group
                    ))
                    .await;

                if let Err(err) = result {
                    counter!("ingest_files_failed_total").increment(1);
                    error!(
                        path = %job.path.display(),
                        group = %job.group,
                        kind = err.kind(),
                        error = %err,
                        "File import failed"
                    );
                    file_report.status = FileStatus::Failed {
                        kind: err.kind().to_string(),
                        error: err.to_string(),
                    };

                    report.files.push(file_report);

                    if self.options.on_file_error == FileErrorPolicy::Abort {
                        warn!(
                            files_done = report.files.len(),
                            rows_written = report.rows_written(),
                            "Import run aborted"
                        );
                        return Err(IngestError::FileAborted {
                            path: job.path.clone(),
                            group: job.group.clone(),
                            source: Box::new(err),
                            report: Box::new(report),
                        });
                    }
                    continue;
                }

                report.files.push(file_report);
            }

            info!(
                files = report.files.len(),
                files_failed = report.files_failed(),
                rows_written = report.rows_written(),
                "Import run complete"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Processes one file, filling `file_report` as channels complete so that
    /// partial progress survives a mid-file failure.
    async fn import_file(
        &self,
        job: &ImportJob,
        file_report: &mut FileReport,
    ) -> Result<(), IngestError> {
        info!("Starting batch");

        let source = self
            .opener
            .open(&job.path)
            .map_err(|source| IngestError::Open {
                path: job.path.clone(),
                source,
            })?;

        let scan = match navigator::scan_group(source.as_ref(), &job.group) {
            Ok(scan) => scan,
            Err(NavigateError::GroupNotFound { group, available }) => {
                warn!(group = %group, available = ?available, "Skipping file: group not found");
                file_report.status = FileStatus::Skipped {
                    reason: format!("group '{group}' not found"),
                    available,
                };
                return Ok(());
            }
            Err(NavigateError::Read { path, source }) => {
                return Err(IngestError::Read { path, source });
            }
        };
        file_report.num_readings = scan.num_readings();

        for index in 1..=CHANNEL_COUNT {
            let outcome = aligner::resolve_channel(
                source.as_ref(),
                &scan,
                index,
                self.catalog,
                self.options.points_per_sample,
            )
            .await?;

            let channel_report = match outcome {
                ChannelOutcome::Aligned(channel) => {
                    let name = channel.name.clone();
                    let cap_id = channel.cap_id;
                    let orientation = channel.alignment.orientation;
                    let written =
                        loader::load_channel(self.sink, channel, self.options.batch_size).await?;
                    ChannelReport::written(name, cap_id, orientation, written)
                }
                ChannelOutcome::Skipped {
                    name,
                    cap_id,
                    reason,
                } => {
                    counter!("ingest_channels_skipped_total", "reason" => reason.label())
                        .increment(1);
                    ChannelReport::skipped(name, cap_id, reason)
                }
            };
            file_report.channels.push(channel_report);
        }

        info!(rows_written = file_report.rows_written(), "Finished batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_job_arguments() {
        let job: ImportJob = "ES12=data/ES12_v2.mat".parse().unwrap();
        assert_eq!(job, ImportJob::new("data/ES12_v2.mat", "ES12"));

        assert!("ES12".parse::<ImportJob>().is_err());
        assert!("=data/ES12_v2.mat".parse::<ImportJob>().is_err());
        assert!("ES12=".parse::<ImportJob>().is_err());
    }

    #[test]
    fn parses_file_error_policy() {
        assert_eq!(
            "continue".parse::<FileErrorPolicy>(),
            Ok(FileErrorPolicy::Continue)
        );
        assert_eq!(" ABORT ".parse::<FileErrorPolicy>(), Ok(FileErrorPolicy::Abort));
        assert!("retry".parse::<FileErrorPolicy>().is_err());
        assert_eq!(FileErrorPolicy::default(), FileErrorPolicy::Continue);
    }

    #[test]
    fn default_options_match_documented_values() {
        let options = ImportOptions::default();
        assert_eq!(options.batch_size, 250);
        assert_eq!(options.points_per_sample, 400);
        assert_eq!(options.on_file_error, FileErrorPolicy::Continue);
    }
}
