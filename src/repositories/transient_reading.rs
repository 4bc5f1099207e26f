//! Transient reading repository
//!
//! Append-only writes to `prognostics.transient_readings`. Each call issues a
//! single multi-row `INSERT`; callers bound the batch size.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;
use tracing::debug;

use crate::error::StoreError;
use crate::ingest::ReadingSink;
use crate::models::transient_reading::{ActiveModel, Entity as TransientReading};
use crate::models::NewTransientReading;

/// Repository for transient reading inserts
#[derive(Debug, Clone)]
pub struct TransientReadingRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl TransientReadingRepository {
    /// Creates a new TransientReadingRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts `readings` in one statement
    ///
    /// # Returns
    ///
    /// Returns the number of rows inserted; an empty batch is a no-op
    pub async fn insert_batch(&self, readings: Vec<NewTransientReading>) -> Result<u64, StoreError> {
        if readings.is_empty() {
            return Ok(0);
        }

        let count = readings.len();
        let models = readings.into_iter().map(ActiveModel::from);
        let inserted = TransientReading::insert_many(models)
            .exec_without_returning(&*self.db)
            .await?;

        debug!(requested = count, inserted, "Inserted transient readings");
        Ok(inserted)
    }
}

#[async_trait]
impl ReadingSink for TransientReadingRepository {
    async fn append(&self, rows: Vec<NewTransientReading>) -> Result<u64, StoreError> {
        self.insert_batch(rows).await
    }
}
