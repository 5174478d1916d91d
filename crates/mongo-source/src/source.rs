use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use mongodb::bson::{doc, Document};
use mongodb::{Client, Database};
use sheetsync_core::{ChangeStream, Record, Result, Source, SyncError};
use tracing::{debug, info};

use crate::convert::{change_event, document_to_record};

// ─── MongoSource ──────────────────────────────────────────────────────────

/// A MongoDB database as a sync source.
///
/// Change streams need a replica set or sharded cluster; against a
/// standalone server `watch` fails and the subscriber keeps retrying.
pub struct MongoSource {
    db: Database,
}

impl MongoSource {
    /// Connect to `uri` and verify the server answers a `ping` before
    /// returning, so a bad URI fails at startup instead of on first use.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?;

        info!(database, "connected to MongoDB");
        Ok(Self { db })
    }

    /// Wrap an already-configured database handle.
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    pub fn database_name(&self) -> &str {
        self.db.name()
    }
}

#[async_trait]
impl Source for MongoSource {
    async fn list_collections(&self) -> Result<Vec<String>> {
        self.db
            .list_collection_names()
            .await
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Record>> {
        let fetch_err = |e: mongodb::error::Error| SyncError::Fetch {
            collection: collection.to_string(),
            message: e.to_string(),
        };

        let cursor = self
            .db
            .collection::<Document>(collection)
            .find(doc! {})
            .await
            .map_err(fetch_err)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(fetch_err)?;

        debug!(collection, count = docs.len(), "fetched documents");
        Ok(docs.into_iter().map(document_to_record).collect())
    }

    async fn watch(&self, collection: &str) -> Result<ChangeStream> {
        let stream = self
            .db
            .collection::<Document>(collection)
            .watch()
            .await
            .map_err(|e| SyncError::Watch {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        let name = collection.to_string();
        let events = stream.map(move |item| match item {
            Ok(event) => Ok(change_event(&name, &event)),
            Err(e) => Err(SyncError::Watch {
                collection: name.clone(),
                message: e.to_string(),
            }),
        });
        Ok(events.boxed())
    }
}
