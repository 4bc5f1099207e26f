//! Test utilities shared by the integration tests.
//!
//! Fixture sources are built in memory with the same layout the MATLAB files
//! use (`{group}/Transient_Data/{Serial_Date, {group}C{n}/{VL,VO}}`), plus
//! in-process catalog and sink doubles.

#![allow(dead_code)]

use async_trait::async_trait;
use ndarray::{Array2, ArrayD};
use pcre_ingest::{
    error::StoreError,
    ingest::{CatalogLookup, ReadingSink},
    models::NewTransientReading,
    source::{HierarchicalSource, MemorySource, SourceError, SourceOpener},
};
use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::subscriber::DefaultGuard;

pub const POINTS: usize = 400;

/// Timestamps `735_000 + i/24` for `n` readings, stored as a `[n, 1]` column
/// the way MATLAB writes vectors.
pub fn serial_dates(n: usize) -> ArrayD<f64> {
    Array2::from_shape_fn((n, 1), |(i, _)| 735_000.0 + i as f64 / 24.0).into_dyn()
}

/// Time-major waveform `[rows, points]`. Every value encodes its position and
/// the sign distinguishes load from output.
pub fn waveform(rows: usize, points: usize, sign: f64) -> Array2<f64> {
    Array2::from_shape_fn((rows, points), |(t, p)| sign * (t * 1000 + p) as f64)
}

/// Builds one group of a fixture source.
pub struct GroupBuilder {
    group: String,
    source: MemorySource,
}

impl GroupBuilder {
    pub fn new(group: &str, readings: usize) -> Self {
        let source = MemorySource::new()
            .with_dataset(
                &format!("{group}/Transient_Data/Serial_Date"),
                serial_dates(readings),
            )
            .unwrap();
        Self {
            group: group.to_string(),
            source,
        }
    }

    /// Adds channel `index` stored time-major as `[rows, POINTS]`.
    pub fn time_major(self, index: u8, rows: usize) -> Self {
        self.channel(
            index,
            waveform(rows, POINTS, 1.0),
            waveform(rows, POINTS, -1.0),
        )
    }

    /// Adds channel `index` stored points-major as `[POINTS, rows]`.
    pub fn points_major(self, index: u8, rows: usize) -> Self {
        self.channel(
            index,
            waveform(rows, POINTS, 1.0).reversed_axes(),
            waveform(rows, POINTS, -1.0).reversed_axes(),
        )
    }

    pub fn channel(mut self, index: u8, load: Array2<f64>, output: Array2<f64>) -> Self {
        let base = format!("{0}/Transient_Data/{0}C{1}", self.group, index);
        self.source = self
            .source
            .with_dataset(&format!("{base}/VL"), load.into_dyn())
            .unwrap()
            .with_dataset(&format!("{base}/VO"), output.into_dyn())
            .unwrap();
        self
    }

    pub fn build(self) -> MemorySource {
        self.source
    }
}

/// 1000 readings in group ES12 with channels C1 and C2 stored `[1000, 400]`
/// and no C3.
pub fn es12_source() -> MemorySource {
    GroupBuilder::new("ES12", 1000)
        .time_major(1, 1000)
        .time_major(2, 1000)
        .build()
}

/// Opens sources from a fixed path → source table.
#[derive(Default)]
pub struct FixtureOpener {
    sources: HashMap<PathBuf, MemorySource>,
}

impl FixtureOpener {
    pub fn with(mut self, path: &str, source: MemorySource) -> Self {
        self.sources.insert(PathBuf::from(path), source);
        self
    }
}

impl SourceOpener for FixtureOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn HierarchicalSource>, SourceError> {
        self.sources
            .get(path)
            .cloned()
            .map(|source| Box::new(source) as Box<dyn HierarchicalSource>)
            .ok_or_else(|| SourceError::Open {
                path: path.to_path_buf(),
                message: "no such fixture".to_string(),
            })
    }
}

/// Catalog backed by a fixed name → id table.
#[derive(Default)]
pub struct StaticCatalog {
    entries: HashMap<String, i32>,
    lookups: Mutex<Vec<String>>,
}

impl StaticCatalog {
    pub fn with(mut self, name: &str, cap_id: i32) -> Self {
        self.entries.insert(name.to_string(), cap_id);
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogLookup for StaticCatalog {
    async fn find_cap_id(&self, name: &str) -> Result<Option<i32>, StoreError> {
        self.lookups.lock().unwrap().push(name.to_string());
        Ok(self.entries.get(name).copied())
    }
}

/// Catalog whose every lookup fails.
pub struct FailingCatalog;

#[async_trait]
impl CatalogLookup for FailingCatalog {
    async fn find_cap_id(&self, _name: &str) -> Result<Option<i32>, StoreError> {
        Err(StoreError::Unavailable("catalog offline".to_string()))
    }
}

/// Sink that keeps every batch it receives.
#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<Vec<NewTransientReading>>>,
    /// Fail every append for this cap id.
    fail_cap_id: Option<i32>,
}

impl RecordingSink {
    pub fn failing_for(cap_id: i32) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail_cap_id: Some(cap_id),
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn rows(&self) -> Vec<NewTransientReading> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    pub fn rows_for(&self, cap_id: i32) -> Vec<NewTransientReading> {
        self.rows()
            .into_iter()
            .filter(|row| row.cap_id == cap_id)
            .collect()
    }
}

#[async_trait]
impl ReadingSink for RecordingSink {
    async fn append(&self, rows: Vec<NewTransientReading>) -> Result<u64, StoreError> {
        if let Some(cap_id) = self.fail_cap_id
            && rows.iter().any(|row| row.cap_id == cap_id)
        {
            return Err(StoreError::Unavailable("insert rejected".to_string()));
        }
        let count = rows.len() as u64;
        self.batches.lock().unwrap().push(rows);
        Ok(count)
    }
}

/// In-memory log buffer fed by a thread-local `fmt` subscriber.
///
/// `#[tokio::test]` runs on the current thread, so every event of the test
/// body lands here while the returned guard is alive.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Lines containing every one of `needles`.
    pub fn matching(&self, needles: &[&str]) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| needles.iter().all(|needle| line.contains(needle)))
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
