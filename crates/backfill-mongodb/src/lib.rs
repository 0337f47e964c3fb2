//! MongoDB backfill engine
//!
//! Scans one collection for documents missing a field and sets that field
//! to a fixed value, one document at a time.
//!
//! # Modules
//! - `target`: the database seam (`BackfillTarget`, `Connector`)
//! - `connection`: the MongoDB implementation of that seam
//! - `query`: filter and update documents
//! - `migrator`: the migration procedure and `run`

pub mod connection;
pub mod migrator;
pub mod query;
pub mod target;

pub use backfill_common::{BackfillError, MigrationConfig, MigrationSettings, Result};
pub use connection::{Connection, MongoConnector};
pub use migrator::{run, MigrationReport, Migrator};
pub use target::{BackfillTarget, Connector, DocumentStream};
