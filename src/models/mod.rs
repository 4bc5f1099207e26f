//! # Data Models
//!
//! SeaORM entities for the `prognostics` schema.

pub mod capacitor;
pub mod transient_reading;

pub use capacitor::Entity as Capacitor;
pub use transient_reading::{Entity as TransientReading, NewTransientReading};
