//! MongoDB connection for the backfill

use async_trait::async_trait;
use backfill_common::{BackfillError, MigrationConfig, Result};
use bson::{doc, Bson, Document as BsonDocument};
use futures::{StreamExt, TryStreamExt};
use mongodb::{options::ClientOptions, Client, Collection, Database};
use tracing::debug;

use crate::query::{id_filter, missing_field_filter, set_field_update};
use crate::target::{BackfillTarget, Connector, DocumentStream};

/// Application name reported to the server unless the URI sets one
const APP_NAME: &str = "field-backfill";

/// Open connection with the target database and collection selected
pub struct Connection {
    client: Client,
    database: Database,
    collection: Collection<BsonDocument>,
}

impl Connection {
    /// Connect to `config.uri()` and select the configured database and collection
    ///
    /// The driver connects lazily, so the database is pinged here to surface
    /// unreachable endpoints as connection errors rather than operation errors.
    pub async fn open(config: &MigrationConfig) -> Result<Self> {
        let mut client_options = ClientOptions::parse(config.uri())
            .await
            .map_err(|e| BackfillError::Connection(e.to_string()))?;

        if client_options.app_name.is_none() {
            client_options.app_name = Some(APP_NAME.to_string());
        }

        let client = Client::with_options(client_options)
            .map_err(|e| BackfillError::Connection(e.to_string()))?;
        let database = client.database(config.database());
        let collection = database.collection::<BsonDocument>(config.collection());

        let connection = Self {
            client,
            database,
            collection,
        };
        connection.ping().await?;

        Ok(connection)
    }

    /// Get a reference to the selected collection
    pub fn collection(&self) -> &Collection<BsonDocument> {
        &self.collection
    }

    /// Check that the server answers on the selected database
    pub async fn ping(&self) -> Result<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| BackfillError::Connection(format!("Ping failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl BackfillTarget for Connection {
    async fn find_missing(&self, field: &str) -> Result<DocumentStream> {
        let filter = missing_field_filter(field);
        debug!(collection = self.collection.name(), ?filter, "opening cursor");

        let cursor = self
            .collection
            .find(filter)
            .await
            .map_err(|e| BackfillError::Operation(e.to_string()))?;

        Ok(cursor
            .map_err(|e| BackfillError::Operation(e.to_string()))
            .boxed())
    }

    async fn set_field(&self, id: &Bson, field: &str, value: &Bson) -> Result<()> {
        self.collection
            .update_one(id_filter(id), set_field_update(field, value))
            .await
            .map_err(|e| BackfillError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}

/// Connector backed by the official MongoDB driver
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

#[async_trait]
impl Connector for MongoConnector {
    type Target = Connection;

    async fn connect(&self, config: &MigrationConfig) -> Result<Connection> {
        Connection::open(config).await
    }
}
