use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::MemoryStore;
use crate::memory::{Memory, StoredMemory};

const FILE_NAME: &str = "memories.jsonl";

#[derive(Serialize)]
struct Line<'a> {
    id: &'a str,
    #[serde(flatten)]
    memory: &'a Memory,
}

#[derive(Deserialize)]
struct OwnedLine {
    id: String,
    #[serde(flatten)]
    memory: Memory,
}

/// Append-only JSONL store: one memory per line in `memories.jsonl`.
pub struct JsonlStore {
    path: PathBuf,
    write: Mutex<()>,
}

impl JsonlStore {
    /// Open (creating if needed) the store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(FILE_NAME);
        debug!(path = %path.display(), "opening jsonl store");
        Ok(Self {
            path,
            write: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MemoryStore for JsonlStore {
    async fn insert(&self, memory: &Memory) -> anyhow::Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut line = serde_json::to_string(&Line { id: &id, memory })?;
        line.push('\n');
        let _guard = self.write.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        trace!(%id, "appended memory");
        Ok(id)
    }

    async fn all(&self) -> anyhow::Result<Vec<StoredMemory>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::new();
        for (n, raw) in content.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<OwnedLine>(raw) {
                Ok(l) => out.push(StoredMemory {
                    id: l.id,
                    memory: l.memory,
                }),
                Err(e) => warn!(line = n + 1, error = %e, "skipping malformed memory"),
            }
        }
        Ok(out)
    }
}
