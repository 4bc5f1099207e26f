//! # Hierarchical Sources
//!
//! Read-only access to nested scientific data containers. A source is a tree of
//! named groups whose leaves are numeric datasets; paths are `/`-separated and
//! relative to the root (`""` or `"/"` addresses the root itself).
//!
//! Two backends ship with the crate: [`MemorySource`], an in-memory tree that
//! can also be loaded from a JSON document, and `Hdf5Source` (cargo feature
//! `hdf5`) for MATLAB v7.3 `.mat` files.

use std::path::{Path, PathBuf};

use ndarray::ArrayD;
use thiserror::Error;

#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod memory;

#[cfg(feature = "hdf5")]
pub use self::hdf5::Hdf5Source;
pub use memory::{MemorySource, Node};

/// Errors raised while opening or reading a hierarchical source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The path is carried for callers; the caller's context already names it.
    #[error("cannot open source: {message}")]
    Open { path: PathBuf, message: String },
    #[error("no entry at '{path}'")]
    MissingPath { path: String },
    #[error("entry '{path}' is a group, not a dataset")]
    NotADataset { path: String },
    #[error("entry '{path}' is a dataset, not a group")]
    NotAGroup { path: String },
    #[error("dataset '{path}' is malformed: {message}")]
    Malformed { path: String, message: String },
    #[error("unsupported source format: {message}")]
    UnsupportedFormat { path: PathBuf, message: String },
    #[cfg(feature = "hdf5")]
    #[error("hdf5 error: {0}")]
    Hdf5(#[from] ::hdf5::Error),
}

/// Read access to one open hierarchical container.
///
/// Every array handed out is an owned copy; nothing returned borrows the
/// backend's storage, so the source can be dropped while the data lives on.
pub trait HierarchicalSource {
    /// Names of the direct children of the group at `path`, in sorted order.
    fn member_names(&self, path: &str) -> Result<Vec<String>, SourceError>;

    /// Whether any entry (group or dataset) exists at `path`.
    fn contains(&self, path: &str) -> bool;

    /// Reads the dataset at `path` as a dynamically-shaped `f64` array.
    fn read_array(&self, path: &str) -> Result<ArrayD<f64>, SourceError>;
}

/// Opens sources from filesystem paths.
pub trait SourceOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn HierarchicalSource>, SourceError>;
}

/// Picks a backend from the file extension: `.json` loads a [`MemorySource`]
/// document, anything else is treated as HDF5.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSourceOpener;

impl SourceOpener for FileSourceOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn HierarchicalSource>, SourceError> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            return Ok(Box::new(MemorySource::from_json_file(path)?));
        }

        open_hdf5(path)
    }
}

#[cfg(feature = "hdf5")]
fn open_hdf5(path: &Path) -> Result<Box<dyn HierarchicalSource>, SourceError> {
    Ok(Box::new(Hdf5Source::open(path)?))
}

#[cfg(not(feature = "hdf5"))]
fn open_hdf5(path: &Path) -> Result<Box<dyn HierarchicalSource>, SourceError> {
    Err(SourceError::UnsupportedFormat {
        path: path.to_path_buf(),
        message: "built without the `hdf5` feature; rebuild with --features hdf5".to_string(),
    })
}

/// Splits a `/`-separated path into its non-empty segments.
pub(crate) fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Joins path segments with `/`.
pub fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| path_segments(part))
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_path_drops_empty_segments() {
        assert_eq!(join_path(&["ES12", "Transient_Data"]), "ES12/Transient_Data");
        assert_eq!(join_path(&["/ES12/", "", "/VL"]), "ES12/VL");
        assert_eq!(join_path(&[]), "");
    }

    #[cfg(not(feature = "hdf5"))]
    #[test]
    fn non_json_paths_need_the_hdf5_feature() {
        let result = FileSourceOpener.open(Path::new("data/ES12_v2.mat"));
        assert!(matches!(
            result,
            Err(SourceError::UnsupportedFormat { .. })
        ));
    }
}
