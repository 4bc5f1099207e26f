//! Capacitor catalog repository
//!
//! Read-only lookups against `prognostics.capacitors`. Each lookup checks a
//! connection out of the pool for the duration of one query.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use std::sync::Arc;

use crate::error::StoreError;
use crate::ingest::CatalogLookup;
use crate::models::capacitor::{self, Entity as Capacitor};

/// Repository for capacitor catalog lookups
#[derive(Debug, Clone)]
pub struct CapacitorRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl CapacitorRepository {
    /// Creates a new CapacitorRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds the catalog id registered for a channel name
    ///
    /// # Arguments
    ///
    /// * `name` - Channel name, e.g. `ES12C1`
    ///
    /// # Returns
    ///
    /// Returns the capacitor id if the name is catalogued
    pub async fn find_id_by_name(&self, name: &str) -> Result<Option<i32>, StoreError> {
        let cap_id = Capacitor::find()
            .select_only()
            .column(capacitor::Column::CapId)
            .filter(capacitor::Column::Name.eq(name))
            .into_tuple::<i32>()
            .one(&*self.db)
            .await?;
        Ok(cap_id)
    }
}

#[async_trait]
impl CatalogLookup for CapacitorRepository {
    async fn find_cap_id(&self, name: &str) -> Result<Option<i32>, StoreError> {
        self.find_id_by_name(name).await
    }
}
