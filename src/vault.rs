//! Durable storage for donated audio.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Uploads a local file and returns a durable URL for it.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, path: &Path) -> anyhow::Result<String>;
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("path {} has no file name", path.display()))
}

/// Keeps uploads in a local directory, served back under `public_base`.
#[derive(Clone, Debug)]
pub struct LocalVault {
    dir: PathBuf,
    public_base: String,
}

impl LocalVault {
    pub async fn open(dir: impl Into<PathBuf>, public_base: impl Into<String>) -> anyhow::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            public_base: public_base.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ObjectStore for LocalVault {
    async fn upload(&self, path: &Path) -> anyhow::Result<String> {
        let name = file_name(path)?;
        let dest = self.dir.join(&name);
        tokio::fs::copy(path, &dest).await?;
        debug!(dest = %dest.display(), "stored audio locally");
        Ok(format!("{}/{}", self.public_base.trim_end_matches('/'), name))
    }
}

/// Signed uploads to Cloudinary.
///
/// Audio goes through the `video` resource type, which is how Cloudinary
/// handles sound files.
#[derive(Clone)]
pub struct Cloudinary {
    pub base_url: String,
    pub cloud_name: String,
    pub api_key: String,
    api_secret: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for Cloudinary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cloudinary")
            .field("base_url", &self.base_url)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Default Cloudinary API host.
pub const CLOUDINARY_API: &str = "https://api.cloudinary.com";

/// SHA-256 request signature over the sorted `params` string.
pub fn sign(params: &str, api_secret: &str) -> String {
    let digest = Sha256::digest(format!("{params}{api_secret}").as_bytes());
    format!("{digest:x}")
}

impl Cloudinary {
    pub fn new(
        base_url: impl Into<String>,
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ObjectStore for Cloudinary {
    async fn upload(&self, path: &Path) -> anyhow::Result<String> {
        let name = file_name(path)?;
        let bytes = tokio::fs::read(path).await?;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(&format!("timestamp={timestamp}"), &self.api_secret);
        let url = format!(
            "{}/v1_1/{}/video/upload",
            self.base_url.trim_end_matches('/'),
            self.cloud_name
        );
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(name),
            )
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);
        let resp: UploadResponse = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!(url = %resp.secure_url, "audio uploaded");
        Ok(resp.secure_url)
    }
}
