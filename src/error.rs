//! # Error Handling
//!
//! Error taxonomy for the ingestion pipeline. Recoverable conditions (missing
//! group, missing channel, missing catalog entry, bad shapes) are not errors:
//! they surface as skip outcomes in the import report. Everything here is fatal
//! to the file being processed.

use std::path::PathBuf;

use thiserror::Error;

use crate::ingest::ImportReport;
use crate::source::SourceError;

/// Failures of the relational store behind the catalog and reading ports.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that abort processing of the current file.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: SourceError,
    },
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: SourceError,
    },
    #[error("catalog lookup for '{channel}' failed: {source}")]
    Catalog {
        channel: String,
        #[source]
        source: StoreError,
    },
    #[error("writing readings for '{channel}' failed: {source}")]
    Write {
        channel: String,
        #[source]
        source: StoreError,
    },
    /// A file failed under the abort policy. `report` covers every file up to
    /// and including the failing one, so rows already committed are accounted for.
    #[error("import of {path} (group {group}) aborted the batch: {source}")]
    FileAborted {
        path: PathBuf,
        group: String,
        #[source]
        source: Box<IngestError>,
        report: Box<ImportReport>,
    },
}

impl IngestError {
    /// Short machine-friendly label used for metrics and the import report.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Open { .. } => "open",
            IngestError::Read { .. } => "read",
            IngestError::Catalog { .. } => "catalog",
            IngestError::Write { .. } => "write",
            IngestError::FileAborted { source, .. } => source.kind(),
        }
    }

    /// The report of the run this error ended, if it carries one.
    pub fn partial_report(&self) -> Option<&ImportReport> {
        match self {
            IngestError::FileAborted { report, .. } => Some(report),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_errors_report_the_inner_kind() {
        let inner = IngestError::Write {
            channel: "ES12C1".to_string(),
            source: StoreError::Unavailable("connection reset".to_string()),
        };
        let aborted = IngestError::FileAborted {
            path: PathBuf::from("ES12.mat"),
            group: "ES12".to_string(),
            source: Box::new(inner),
            report: Box::new(ImportReport::new(uuid::Uuid::nil())),
        };

        assert_eq!(aborted.kind(), "write");
        assert!(aborted.to_string().contains("ES12.mat"));
        assert!(aborted.partial_report().is_some());
    }

    #[test]
    fn open_errors_name_the_path_once() {
        let err = IngestError::Open {
            path: PathBuf::from("missing.mat"),
            source: SourceError::Open {
                path: PathBuf::from("missing.mat"),
                message: "No such file or directory".to_string(),
            },
        };

        let message = err.to_string();
        assert_eq!(message.matches("missing.mat").count(), 1, "{message}");
        assert!(message.contains("No such file or directory"));
        assert!(err.partial_report().is_none());
    }
}
