//! The two submission flows.
//!
//! Text is scored and stored inside the request. Audio is written to a
//! temporary file by the request handler and processed later by
//! [`Pipeline::run_audio`], which always removes the temporary file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::memory::{Location, Memory};
use crate::store::MemoryStore;
use crate::stt::Stt;
use crate::translate::Translator;
use crate::vault::ObjectStore;

/// Extension used when an upload does not carry a usable one.
pub const DEFAULT_AUDIO_EXT: &str = "webm";

/// Scores text into a polarity in `[-1, 1]`.
pub trait SentimentScorer: Send + Sync {
    fn polarity(&self, text: &str) -> anyhow::Result<f64>;
}

impl SentimentScorer for aura::Lexicon {
    fn polarity(&self, text: &str) -> anyhow::Result<f64> {
        Ok(aura::Lexicon::polarity(self, text))
    }
}

/// Failure of one stage of a submission.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("upload failed: {0}")]
    Upload(anyhow::Error),
    #[error("transcription failed: {0}")]
    Transcription(anyhow::Error),
    #[error("translation failed: {0}")]
    Translation(anyhow::Error),
    #[error("sentiment scoring failed: {0}")]
    Scoring(anyhow::Error),
    #[error("persistence failed: {0}")]
    Persistence(anyhow::Error),
}

/// What happened to a processed audio donation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioOutcome {
    Stored { id: String },
    /// The transcript was empty; nothing was stored.
    Silent,
}

/// An uploaded audio file on local disk.
///
/// The file is deleted by [`TempAudio::remove`], or on drop as a fallback.
#[derive(Debug)]
pub struct TempAudio {
    path: Option<PathBuf>,
}

impl TempAudio {
    /// Write `bytes` to a fresh `eunoia_<uuid>.<ext>` file in `dir`.
    pub async fn write(dir: &Path, ext: &str, bytes: &[u8]) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("eunoia_{}.{ext}", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote temporary audio");
        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Delete the file if it still exists.
    pub async fn remove(mut self) {
        if let Some(path) = self.path.take() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "temporary audio deleted"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to delete temporary audio"),
            }
        }
    }
}

impl Drop for TempAudio {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Pick a safe extension for an uploaded file name.
pub fn audio_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_AUDIO_EXT.to_string())
}

/// One queued audio donation.
#[derive(Debug)]
pub struct AudioJob {
    pub audio: TempAudio,
    pub location: Option<Location>,
}

/// Injected collaborators shared by both flows.
pub struct Pipeline {
    pub translator: Arc<dyn Translator>,
    pub scorer: Arc<dyn SentimentScorer>,
    pub store: Arc<dyn MemoryStore>,
    pub stt: Arc<dyn Stt>,
    pub vault: Arc<dyn ObjectStore>,
    /// Language text is translated into before scoring.
    pub pivot_language: String,
}

impl Pipeline {
    /// Translate `text`, score it and return `(polarity, aura color)`.
    pub async fn aura(&self, text: &str) -> Result<(f64, String), PipelineError> {
        let pivot = self
            .translator
            .translate(text, &self.pivot_language)
            .await
            .map_err(PipelineError::Translation)?;
        let polarity = self
            .scorer
            .polarity(&pivot)
            .map_err(PipelineError::Scoring)?;
        let color = aura::polarity_to_color(polarity);
        debug!(polarity, %color, "aura computed");
        Ok((polarity, color))
    }

    /// Synchronous text flow: score and persist, returning the new id.
    pub async fn submit_text(
        &self,
        text: &str,
        location: Option<Location>,
    ) -> Result<String, PipelineError> {
        let (_, color) = self.aura(text).await?;
        let memory = Memory::text(text, color, location);
        let id = self
            .store
            .insert(&memory)
            .await
            .map_err(PipelineError::Persistence)?;
        info!(%id, "text memory stored");
        Ok(id)
    }

    /// Upload, transcribe, score and persist one audio file.
    ///
    /// Does not touch the local file beyond reading it.
    pub async fn process_audio(
        &self,
        audio: &Path,
        location: Option<Location>,
    ) -> Result<AudioOutcome, PipelineError> {
        let audio_url = self
            .vault
            .upload(audio)
            .await
            .map_err(PipelineError::Upload)?;
        debug!(%audio_url, "audio uploaded");

        let transcript = self
            .stt
            .transcribe(audio)
            .await
            .map_err(PipelineError::Transcription)?;
        if transcript.is_silent() {
            return Ok(AudioOutcome::Silent);
        }
        info!(text = %transcript.text, "audio transcribed");

        let (_, color) = self.aura(&transcript.text).await?;
        let memory = Memory::audio(transcript.text, color, audio_url, location);
        let id = self
            .store
            .insert(&memory)
            .await
            .map_err(PipelineError::Persistence)?;
        Ok(AudioOutcome::Stored { id })
    }

    /// Background entry point: process the job, log the outcome and always
    /// delete the temporary file. Errors never reach the donor.
    pub async fn run_audio(&self, job: AudioJob) -> Result<AudioOutcome, PipelineError> {
        let AudioJob { audio, location } = job;
        info!(path = %audio.path().display(), "background audio task started");
        let res = self.process_audio(audio.path(), location).await;
        match &res {
            Ok(AudioOutcome::Stored { id }) => info!(%id, "audio memory stored"),
            Ok(AudioOutcome::Silent) => info!("transcription was silent; nothing stored"),
            Err(e) => error!(error = %e, "background audio task failed"),
        }
        audio.remove().await;
        res
    }
}
