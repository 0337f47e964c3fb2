//! Migration configuration
//!
//! Settings arrive from the environment collaborator as optional strings
//! and are validated once into a [`MigrationConfig`], which is then passed
//! explicitly into the migration.

use crate::error::{BackfillError, Result};
use std::fmt;

/// Environment key holding the MongoDB connection string
pub const MONGO_URI: &str = "MONGO_URI";
/// Environment key holding the database name
pub const DB_NAME: &str = "DB_NAME";
/// Environment key holding the collection name
pub const COLLECTION_NAME: &str = "COLLECTION_NAME";
/// Environment key holding the field to backfill
pub const TARGET_FIELD: &str = "TARGET_FIELD";
/// Environment key holding the value written into the target field
pub const NEW_VALUE: &str = "NEW_VALUE";

/// All required keys, in the order they are reported when missing
pub const REQUIRED_KEYS: [&str; 5] = [MONGO_URI, DB_NAME, COLLECTION_NAME, TARGET_FIELD, NEW_VALUE];

/// Raw settings as supplied by the environment, possibly incomplete
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MigrationSettings {
    pub mongo_uri: Option<String>,
    pub db_name: Option<String>,
    pub collection_name: Option<String>,
    pub target_field: Option<String>,
    pub new_value: Option<String>,
}

impl MigrationSettings {
    /// Build settings by looking up each required key
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use backfill_common::MigrationSettings;
    ///
    /// let env: HashMap<&str, &str> = HashMap::from([("DB_NAME", "app")]);
    /// let settings = MigrationSettings::from_lookup(|key| env.get(key).map(|v| v.to_string()));
    /// assert_eq!(settings.db_name.as_deref(), Some("app"));
    /// ```
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        Self {
            mongo_uri: lookup(MONGO_URI),
            db_name: lookup(DB_NAME),
            collection_name: lookup(COLLECTION_NAME),
            target_field: lookup(TARGET_FIELD),
            new_value: lookup(NEW_VALUE),
        }
    }

    /// Keys whose value is absent or empty
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let values = [
            &self.mongo_uri,
            &self.db_name,
            &self.collection_name,
            &self.target_field,
            &self.new_value,
        ];

        REQUIRED_KEYS
            .iter()
            .zip(values)
            .filter(|(_, value)| present(value).is_none())
            .map(|(key, _)| *key)
            .collect()
    }

    /// Validate completeness and produce the immutable configuration
    ///
    /// # Errors
    /// Returns `BackfillError::Configuration` naming every missing key.
    pub fn validate(&self) -> Result<MigrationConfig> {
        let missing = self.missing_keys();
        if !missing.is_empty() {
            return Err(BackfillError::Configuration(format!(
                "{} (check your .env file)",
                missing.join(", ")
            )));
        }

        let config = MigrationConfig {
            uri: required(&self.mongo_uri)?,
            database: required(&self.db_name)?,
            collection: required(&self.collection_name)?,
            target_field: required(&self.target_field)?,
            new_value: required(&self.new_value)?,
        };
        tracing::debug!(?config, "configuration validated");

        Ok(config)
    }
}

impl fmt::Debug for MigrationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationSettings")
            .field("mongo_uri", &self.mongo_uri.as_ref().map(|_| "<redacted>"))
            .field("db_name", &self.db_name)
            .field("collection_name", &self.collection_name)
            .field("target_field", &self.target_field)
            .field("new_value", &self.new_value)
            .finish()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn required(value: &Option<String>) -> Result<String> {
    present(value)
        .map(str::to_string)
        .ok_or_else(|| BackfillError::Configuration("incomplete settings".to_string()))
}

/// Validated configuration of one backfill run
#[derive(Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    uri: String,
    database: String,
    collection: String,
    target_field: String,
    new_value: String,
}

impl MigrationConfig {
    /// Connection string (may carry credentials, never log it)
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Field whose absence selects documents and which is then set
    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    /// Literal string written into the target field
    pub fn new_value(&self) -> &str {
        &self.new_value
    }
}

impl fmt::Debug for MigrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationConfig")
            .field("uri", &"<redacted>")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("target_field", &self.target_field)
            .field("new_value", &self.new_value)
            .finish()
    }
}
