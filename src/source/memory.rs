//! In-memory hierarchical source.
//!
//! Holds a whole tree in memory. Used for fixtures and dry runs, and loadable
//! from a JSON document shaped like:
//!
//! ```json
//! {
//!   "ES12": {
//!     "Transient_Data": {
//!       "Serial_Date": { "shape": [2, 1], "data": [735000.5, 735000.6] },
//!       "ES12C1": {
//!         "VL": { "shape": [2, 400], "data": [ ... ] },
//!         "VO": { "shape": [2, 400], "data": [ ... ] }
//!       }
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use super::{HierarchicalSource, SourceError, path_segments};

/// A numeric dataset stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetNode {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

/// One entry of the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Dataset(DatasetNode),
    Group(BTreeMap<String, Node>),
}

/// Hierarchical source backed by an owned in-memory tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemorySource {
    root: BTreeMap<String, Node>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a tree from a JSON document on disk.
    pub fn from_json_file(path: &Path) -> Result<Self, SourceError> {
        let raw = fs::read_to_string(path).map_err(|err| SourceError::Open {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|err| SourceError::Open {
            path: path.to_path_buf(),
            message: format!("invalid JSON source document: {err}"),
        })
    }

    /// Creates an empty group at `path`, along with any missing parents.
    pub fn insert_group(&mut self, path: &str) -> Result<(), SourceError> {
        self.group_entry(path).map(|_| ())
    }

    /// Stores `array` at `path`, creating parent groups as needed.
    pub fn insert_dataset(&mut self, path: &str, array: &ArrayD<f64>) -> Result<(), SourceError> {
        let segments: Vec<&str> = path_segments(path).collect();
        let Some((name, parents)) = segments.split_last() else {
            return Err(SourceError::MissingPath {
                path: path.to_string(),
            });
        };

        let parent = self.group_entry(&parents.join("/"))?;
        parent.insert(
            (*name).to_string(),
            Node::Dataset(DatasetNode {
                shape: array.shape().to_vec(),
                data: array.iter().copied().collect(),
            }),
        );
        Ok(())
    }

    /// Builder-style variant of [`MemorySource::insert_dataset`].
    pub fn with_dataset(mut self, path: &str, array: ArrayD<f64>) -> Result<Self, SourceError> {
        self.insert_dataset(path, &array)?;
        Ok(self)
    }

    fn group_entry(&mut self, path: &str) -> Result<&mut BTreeMap<String, Node>, SourceError> {
        let mut current = &mut self.root;
        let mut walked = Vec::new();
        for segment in path_segments(path) {
            walked.push(segment);
            let node = current
                .entry(segment.to_string())
                .or_insert_with(|| Node::Group(BTreeMap::new()));
            current = match node {
                Node::Group(children) => children,
                Node::Dataset(_) => {
                    return Err(SourceError::NotAGroup {
                        path: walked.join("/"),
                    });
                }
            };
        }
        Ok(current)
    }

    fn lookup(&self, path: &str) -> Option<Lookup<'_>> {
        let mut current = Lookup::Group(&self.root);
        for segment in path_segments(path) {
            let Lookup::Group(children) = current else {
                return None;
            };
            current = match children.get(segment)? {
                Node::Group(inner) => Lookup::Group(inner),
                Node::Dataset(dataset) => Lookup::Dataset(dataset),
            };
        }
        Some(current)
    }
}

enum Lookup<'a> {
    Group(&'a BTreeMap<String, Node>),
    Dataset(&'a DatasetNode),
}

impl HierarchicalSource for MemorySource {
    fn member_names(&self, path: &str) -> Result<Vec<String>, SourceError> {
        match self.lookup(path) {
            Some(Lookup::Group(children)) => Ok(children.keys().cloned().collect()),
            Some(Lookup::Dataset(_)) => Err(SourceError::NotAGroup {
                path: path.to_string(),
            }),
            None => Err(SourceError::MissingPath {
                path: path.to_string(),
            }),
        }
    }

    fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    fn read_array(&self, path: &str) -> Result<ArrayD<f64>, SourceError> {
        match self.lookup(path) {
            Some(Lookup::Dataset(dataset)) => {
                ArrayD::from_shape_vec(IxDyn(&dataset.shape), dataset.data.clone()).map_err(
                    |err| SourceError::Malformed {
                        path: path.to_string(),
                        message: err.to_string(),
                    },
                )
            }
            Some(Lookup::Group(_)) => Err(SourceError::NotADataset {
                path: path.to_string(),
            }),
            None => Err(SourceError::MissingPath {
                path: path.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn datasets_create_parent_groups() {
        let array = Array2::<f64>::zeros((2, 3)).into_dyn();
        let source = MemorySource::new()
            .with_dataset("ES12/Transient_Data/ES12C1/VL", array)
            .unwrap();

        assert!(source.contains("ES12/Transient_Data/ES12C1"));
        assert_eq!(source.member_names("").unwrap(), vec!["ES12".to_string()]);
        assert_eq!(
            source.member_names("ES12/Transient_Data").unwrap(),
            vec!["ES12C1".to_string()]
        );
        assert_eq!(
            source
                .read_array("ES12/Transient_Data/ES12C1/VL")
                .unwrap()
                .shape(),
            &[2, 3]
        );
    }

    #[test]
    fn reading_a_group_as_dataset_fails() {
        let mut source = MemorySource::new();
        source.insert_group("ES12/Transient_Data").unwrap();

        assert!(matches!(
            source.read_array("ES12"),
            Err(SourceError::NotADataset { .. })
        ));
        assert!(matches!(
            source.read_array("ES14"),
            Err(SourceError::MissingPath { .. })
        ));
    }

    #[test]
    fn dataset_cannot_be_used_as_parent() {
        let array = Array2::<f64>::zeros((1, 1)).into_dyn();
        let mut source = MemorySource::new().with_dataset("a/b", array.clone()).unwrap();

        assert!(matches!(
            source.insert_dataset("a/b/c", &array),
            Err(SourceError::NotAGroup { .. })
        ));
    }

    #[test]
    fn parses_json_documents() {
        let doc = r#"{
            "ES12": {
                "Transient_Data": {
                    "Serial_Date": { "shape": [1, 3], "data": [1.0, 2.0, 3.0] }
                }
            }
        }"#;
        let source: MemorySource = serde_json::from_str(doc).unwrap();
        let stamps = source.read_array("ES12/Transient_Data/Serial_Date").unwrap();

        assert_eq!(stamps.shape(), &[1, 3]);
        assert_eq!(stamps.iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn malformed_shapes_are_reported_on_read() {
        let doc = r#"{ "d": { "shape": [2, 2], "data": [1.0] } }"#;
        let source: MemorySource = serde_json::from_str(doc).unwrap();

        assert!(matches!(
            source.read_array("d"),
            Err(SourceError::Malformed { .. })
        ));
    }
}
