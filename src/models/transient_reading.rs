//! Transient reading entity model
//!
//! SeaORM entity for `prognostics.transient_readings`, the append-only table
//! holding one row per timestamp per capacitor.

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, NotSet, Set};

/// One aligned transient sample
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(schema_name = "prognostics", table_name = "transient_readings")]
pub struct Model {
    /// Surrogate key assigned by the database
    #[sea_orm(primary_key)]
    pub reading_id: i64,

    /// Catalog identifier of the capacitor
    pub cap_id: i32,

    /// MATLAB serial date of the sample
    #[sea_orm(column_type = "Double")]
    pub serial_date: f64,

    /// Load voltage waveform
    pub v_load: Vec<f64>,

    /// Output voltage waveform
    pub v_out: Vec<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::capacitor::Entity",
        from = "Column::CapId",
        to = "super::capacitor::Column::CapId"
    )]
    Capacitor,
}

impl Related<super::capacitor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Capacitor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A reading ready for insertion; the database assigns `reading_id`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewTransientReading {
    pub cap_id: i32,
    pub serial_date: f64,
    pub v_load: Vec<f64>,
    pub v_out: Vec<f64>,
}

impl From<NewTransientReading> for ActiveModel {
    fn from(reading: NewTransientReading) -> Self {
        ActiveModel {
            reading_id: NotSet,
            cap_id: Set(reading.cap_id),
            serial_date: Set(reading.serial_date),
            v_load: Set(reading.v_load),
            v_out: Set(reading.v_out),
        }
    }
}
