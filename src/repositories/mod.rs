//! # Repository Layer
//!
//! SeaORM-backed implementations of the ingestion ports: catalog lookups and
//! reading inserts against the `prognostics` schema.

pub mod capacitor;
pub mod transient_reading;

pub use capacitor::CapacitorRepository;
pub use transient_reading::TransientReadingRepository;
