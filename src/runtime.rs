//! Wiring: turn [`Settings`] into running services.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{Settings, StoreSettings, SttSettings, VaultSettings};
use crate::pipeline::{Pipeline, SentimentScorer};
use crate::queue::AudioQueue;
use crate::server::{self, AppState};
use crate::store::{JsonlStore, MemoryStore};
use crate::stt::{HttpStt, Stt};
use crate::translate::{LibreTranslate, Passthrough, Translator};
use crate::vault::{Cloudinary, LocalVault, ObjectStore};

pub async fn build_store(settings: &StoreSettings) -> anyhow::Result<Arc<dyn MemoryStore>> {
    match settings {
        StoreSettings::Jsonl { dir } => {
            let store = JsonlStore::open(dir).await?;
            info!(path = %store.path().display(), "using JSON lines store");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "mongo")]
        StoreSettings::Mongo {
            uri,
            database,
            collection,
        } => {
            let store = crate::store::MongoStore::connect(uri, database, collection).await?;
            info!(%database, %collection, "using mongo store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongo"))]
        StoreSettings::Mongo { .. } => anyhow::bail!("built without the `mongo` feature"),
    }
}

pub fn build_stt(settings: &SttSettings) -> anyhow::Result<Arc<dyn Stt>> {
    match settings {
        #[cfg(feature = "whisper")]
        SttSettings::Whisper {
            model,
            language,
            ffmpeg,
        } => {
            let stt = crate::stt::WhisperStt::new(model, language.as_str(), ffmpeg.as_str())
                .with_context(|| format!("loading whisper model {}", model.display()))?;
            info!(model = %model.display(), %language, "local whisper ready");
            Ok(Arc::new(stt))
        }
        #[cfg(not(feature = "whisper"))]
        SttSettings::Whisper { .. } => anyhow::bail!("built without the `whisper` feature"),
        SttSettings::Http {
            url,
            model,
            language,
            api_key,
        } => {
            info!(%url, %model, %language, "using remote transcription");
            Ok(Arc::new(HttpStt::new(
                url.as_str(),
                model.as_str(),
                language.as_str(),
                api_key.clone(),
            )))
        }
    }
}

pub async fn build_vault(settings: &VaultSettings) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match settings {
        VaultSettings::Local { dir, public_url } => {
            info!(dir = %dir.display(), %public_url, "storing audio locally");
            Ok(Arc::new(LocalVault::open(dir, public_url.as_str()).await?))
        }
        VaultSettings::Cloudinary {
            base_url,
            cloud_name,
            api_key,
            api_secret,
        } => {
            info!(%cloud_name, "uploading audio to cloudinary");
            Ok(Arc::new(Cloudinary::new(
                base_url.as_str(),
                cloud_name.as_str(),
                api_key.as_str(),
                api_secret.as_str(),
            )))
        }
    }
}

pub fn build_scorer(settings: &Settings) -> anyhow::Result<Arc<dyn SentimentScorer>> {
    let mut lexicon = aura::Lexicon::english();
    if let Some(path) = &settings.lexicon_path {
        let added = lexicon.merge_file(path)?;
        info!(path = %path.display(), added, "lexicon extended");
    }
    Ok(Arc::new(lexicon))
}

/// Build every collaborator and start the audio worker.
pub async fn build_state(settings: &Settings) -> anyhow::Result<(Arc<AppState>, JoinHandle<()>)> {
    let translator: Arc<dyn Translator> = match &settings.translator {
        Some(t) => {
            info!(url = %t.url, pivot = %settings.pivot_language, "translating before scoring");
            Arc::new(LibreTranslate::new(t.url.as_str(), t.api_key.clone()))
        }
        None => {
            warn!("no translator configured; text is scored as given");
            Arc::new(Passthrough)
        }
    };
    let pipeline = Arc::new(Pipeline {
        translator,
        scorer: build_scorer(settings)?,
        store: build_store(&settings.store).await?,
        stt: build_stt(&settings.stt)?,
        vault: build_vault(&settings.vault).await?,
        pivot_language: settings.pivot_language.clone(),
    });
    tokio::fs::create_dir_all(&settings.temp_dir)
        .await
        .with_context(|| format!("creating {}", settings.temp_dir.display()))?;
    let (queue, worker) = AudioQueue::spawn(pipeline.clone());
    let state = Arc::new(AppState {
        pipeline,
        queue,
        temp_dir: settings.temp_dir.clone(),
    });
    Ok((state, worker))
}

fn local_audio_dir(settings: &Settings) -> Option<PathBuf> {
    match &settings.vault {
        VaultSettings::Local { dir, .. } => Some(dir.clone()),
        VaultSettings::Cloudinary { .. } => None,
    }
}

/// Serve until `shutdown` resolves, then let queued audio finish.
pub async fn run(
    settings: Settings,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let (state, worker) = build_state(&settings).await?;
    let audio_dir = local_audio_dir(&settings);
    let app = server::router(state, settings.max_upload_bytes, audio_dir.as_deref());
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", settings.host, settings.port))?;
    server::serve(app, addr, shutdown).await?;
    info!("draining audio queue");
    worker.await?;
    Ok(())
}
