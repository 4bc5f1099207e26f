//! HDF5 backend (MATLAB v7.3 `.mat` files).

use std::path::Path;

use ::hdf5::{File, Group};
use ndarray::ArrayD;

use super::{HierarchicalSource, SourceError, join_path};

/// An open HDF5 file. The handle closes when this value is dropped.
pub struct Hdf5Source {
    file: File,
}

impl Hdf5Source {
    /// Opens `path` read-only.
    ///
    /// # Errors
    /// Returns an error if the file is missing or not a valid HDF5 container.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|err| SourceError::Open {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Self { file })
    }

    fn group_at(&self, path: &str) -> Result<Group, SourceError> {
        let normalized = join_path(&[path]);
        if normalized.is_empty() {
            return Ok(self.file.group("/")?);
        }
        if !self.contains(&normalized) {
            return Err(SourceError::MissingPath { path: normalized });
        }
        self.file
            .group(&normalized)
            .map_err(|_| SourceError::NotAGroup { path: normalized })
    }
}

impl HierarchicalSource for Hdf5Source {
    fn member_names(&self, path: &str) -> Result<Vec<String>, SourceError> {
        let mut names = self.group_at(path)?.member_names()?;
        names.sort();
        Ok(names)
    }

    fn contains(&self, path: &str) -> bool {
        let normalized = join_path(&[path]);
        if normalized.is_empty() {
            return true;
        }
        // Walk each prefix; link_exists on a path with a missing parent is an HDF5 error.
        let mut prefix = String::new();
        for segment in normalized.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            if !self.file.link_exists(&prefix) {
                return false;
            }
        }
        true
    }

    fn read_array(&self, path: &str) -> Result<ArrayD<f64>, SourceError> {
        let normalized = join_path(&[path]);
        if !self.contains(&normalized) {
            return Err(SourceError::MissingPath { path: normalized });
        }
        let dataset = self
            .file
            .dataset(&normalized)
            .map_err(|_| SourceError::NotADataset {
                path: normalized.clone(),
            })?;
        Ok(dataset.read_dyn::<f64>()?)
    }
}
