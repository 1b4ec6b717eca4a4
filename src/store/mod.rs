// store/mod.rs - memory store implementations

mod jsonl_store;
#[cfg(feature = "mongo")]
mod mongo_store;

pub use jsonl_store::JsonlStore;
#[cfg(feature = "mongo")]
pub use mongo_store::MongoStore;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::memory::{MapMemory, Memory, StoredMemory};

/// Persistence for donated memories.
///
/// Stores only ever append; there is no update or delete.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Persist `memory` and return the identifier the store assigned.
    async fn insert(&self, memory: &Memory) -> anyhow::Result<String>;

    /// Every stored memory, in insertion order where the backend keeps one.
    async fn all(&self) -> anyhow::Result<Vec<StoredMemory>>;
}

/// Memories that carry a location, projected for the map.
pub async fn list_located(store: &dyn MemoryStore) -> anyhow::Result<Vec<MapMemory>> {
    let all = store.all().await?;
    let total = all.len();
    let located: Vec<_> = all.into_iter().filter_map(MapMemory::from_stored).collect();
    debug!(total, located = located.len(), "listing memories");
    Ok(located)
}

/// Volatile store used by tests and dry runs.
#[derive(Default)]
pub struct InMemoryStore {
    data: Mutex<Vec<StoredMemory>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored memories.
    pub async fn len(&self) -> usize {
        self.data.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.lock().await.is_empty()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn insert(&self, memory: &Memory) -> anyhow::Result<String> {
        let id = Uuid::new_v4().to_string();
        self.data.lock().await.push(StoredMemory {
            id: id.clone(),
            memory: memory.clone(),
        });
        Ok(id)
    }

    async fn all(&self) -> anyhow::Result<Vec<StoredMemory>> {
        Ok(self.data.lock().await.clone())
    }
}
