//! Common types for field-backfill
//!
//! This crate provides the error type and configuration shared by the
//! migration engine and the command-line binary.

pub mod config;
pub mod error;

pub use config::{MigrationConfig, MigrationSettings};
pub use error::{BackfillError, Result};
