//! # PCRE transient ingester
//!
//! Imports multi-channel transient voltage recordings from hierarchical
//! scientific files into the `prognostics.transient_readings` table.
//!
//! The pipeline is [`ingest::navigator`] → [`ingest::aligner`] →
//! [`ingest::loader`], driven per file by [`ingest::Importer`].

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod repositories;
pub mod source;
pub mod telemetry;
