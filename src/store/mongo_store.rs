use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::{Client, Collection};
use tracing::{debug, info, warn};

use super::MemoryStore;
use crate::memory::{Memory, StoredMemory};

/// Memory store backed by a MongoDB collection.
///
/// Documents are written flat, exactly as [`Memory`] serializes, and the
/// database assigns the `_id`.
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect to `uri` and use `database.collection`.
    pub async fn connect(uri: &str, database: &str, collection: &str) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        info!(%database, %collection, "connected to mongodb");
        Ok(Self {
            collection: client.database(database).collection(collection),
        })
    }
}

fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl MemoryStore for MongoStore {
    async fn insert(&self, memory: &Memory) -> anyhow::Result<String> {
        let document = bson::to_document(memory)?;
        let res = self.collection.insert_one(document).await?;
        let id = id_to_string(&res.inserted_id);
        debug!(%id, "inserted memory");
        Ok(id)
    }

    async fn all(&self) -> anyhow::Result<Vec<StoredMemory>> {
        let mut cursor = self.collection.find(doc! {}).await?;
        let mut out = Vec::new();
        while let Some(mut document) = cursor.try_next().await? {
            let id = document
                .remove("_id")
                .map(|id| id_to_string(&id))
                .unwrap_or_default();
            match bson::from_document::<Memory>(document) {
                Ok(memory) => out.push(StoredMemory { id, memory }),
                Err(e) => warn!(%id, error = %e, "skipping unreadable memory"),
            }
        }
        Ok(out)
    }
}
