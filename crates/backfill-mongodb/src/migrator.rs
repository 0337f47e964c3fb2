//! The backfill procedure
//!
//! `run` is the whole operation: validate settings, connect, stream the
//! documents lacking the target field, update them one at a time, report
//! the count and release the connection.
//!
//! # Error phases
//! - configuration: returned before any connection is attempted
//! - connection: returned as-is, nothing to release
//! - operation: logged, iteration stops, the connection is still released
//!   and the partial count is reported
//!
//! # Consistency
//! The selection is evaluated by a live server-side cursor while updates
//! adding the field are issued. No snapshot isolation is requested; the
//! default cursor behavior of the server applies. A fetched document is
//! updated once and never re-examined.

use backfill_common::{BackfillError, MigrationConfig, MigrationSettings, Result};
use bson::Bson;
use futures::TryStreamExt;
use tracing::{error, info};

use crate::query::display_id;
use crate::target::{BackfillTarget, Connector};

/// Outcome of one backfill run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Number of update operations that succeeded
    pub updated: u64,
    /// Operation-phase failure that stopped the iteration, if any
    pub failure: Option<BackfillError>,
}

impl MigrationReport {
    /// True when the cursor was exhausted without error
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Sets one field to a fixed value on every document lacking it
#[derive(Debug, Clone, PartialEq)]
pub struct Migrator {
    field: String,
    value: Bson,
}

impl Migrator {
    pub fn new(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Migrator for the configured target field and new value
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self::new(config.target_field(), config.new_value())
    }

    /// Backfill `target` and report how many documents were updated
    ///
    /// Never fails: an error while iterating or updating ends the run early
    /// and is carried in the report alongside the partial count.
    pub async fn migrate<T>(&self, target: &T) -> MigrationReport
    where
        T: BackfillTarget + ?Sized,
    {
        let mut updated = 0;
        let failure = self.apply(target, &mut updated).await.err();

        match &failure {
            None => info!("Migration complete. Total records updated: {}", updated),
            Some(e) => error!(
                kind = e.kind(),
                updated,
                "An error occurred during migration: {}",
                e
            ),
        }

        MigrationReport { updated, failure }
    }

    async fn apply<T>(&self, target: &T, updated: &mut u64) -> Result<()>
    where
        T: BackfillTarget + ?Sized,
    {
        let mut cursor = target.find_missing(&self.field).await?;

        while let Some(document) = cursor.try_next().await? {
            let id = document.get("_id").ok_or_else(|| {
                BackfillError::Operation("document returned without an _id".to_string())
            })?;

            target.set_field(id, &self.field, &self.value).await?;
            *updated += 1;
            info!("Updated record ID: {}", display_id(id));
        }

        Ok(())
    }
}

/// Run the backfill described by `settings` through `connector`
///
/// # Errors
/// - `BackfillError::Configuration` when a setting is missing; no connection is made
/// - `BackfillError::Connection` when the endpoint cannot be reached
///
/// Operation-phase failures are reported in [`MigrationReport::failure`].
pub async fn run<C>(settings: &MigrationSettings, connector: &C) -> Result<MigrationReport>
where
    C: Connector + ?Sized,
{
    let config = settings.validate()?;

    info!("Connecting to database: {}", config.database());
    let target = connector.connect(&config).await?;
    info!("Targeting collection: {}", config.collection());

    let report = Migrator::from_config(&config).migrate(&target).await;

    target.close().await;
    info!("Database connection closed.");

    Ok(report)
}
