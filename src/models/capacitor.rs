//! Capacitor catalog entity
//!
//! Read-only view of `prognostics.capacitors`, the reference catalog mapping
//! channel names (e.g. `ES12C1`) to stable capacitor identifiers. Rows are
//! provisioned outside this crate; the ingester only looks them up.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

/// Catalog entry for one monitored capacitor
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(schema_name = "prognostics", table_name = "capacitors")]
pub struct Model {
    /// Stable capacitor identifier (primary key)
    #[sea_orm(primary_key)]
    pub cap_id: i32,

    /// Channel name as it appears in the source files, `{group}C{index}`
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transient_reading::Entity")]
    TransientReading,
}

impl Related<super::transient_reading::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransientReading.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
