#![cfg(test)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::memory::{Memory, StoredMemory};
use crate::pipeline::Pipeline;
use crate::store::MemoryStore;
use crate::stt::{Stt, Transcription};
use crate::translate::{Passthrough, Translator};
use crate::vault::ObjectStore;

/// [`Stt`] that always hears the same text and counts its calls.
#[derive(Clone)]
pub struct FixedStt {
    pub text: String,
    pub calls: Arc<AtomicUsize>,
}

impl FixedStt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Stt for FixedStt {
    async fn transcribe(&self, audio: &Path) -> anyhow::Result<Transcription> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(audio.exists(), "audio file missing");
        Ok(Transcription {
            text: self.text.clone(),
        })
    }
}

/// [`ObjectStore`] that pretends every upload lands on a CDN.
pub struct MockVault;

impl MockVault {
    pub const URL: &'static str = "https://cdn.example/audio.webm";
}

#[async_trait]
impl ObjectStore for MockVault {
    async fn upload(&self, _path: &Path) -> anyhow::Result<String> {
        Ok(Self::URL.to_string())
    }
}

pub struct FailingVault;

#[async_trait]
impl ObjectStore for FailingVault {
    async fn upload(&self, _path: &Path) -> anyhow::Result<String> {
        anyhow::bail!("vault offline")
    }
}

pub struct FailingStore;

#[async_trait]
impl MemoryStore for FailingStore {
    async fn insert(&self, _memory: &Memory) -> anyhow::Result<String> {
        anyhow::bail!("database offline")
    }

    async fn all(&self) -> anyhow::Result<Vec<StoredMemory>> {
        anyhow::bail!("database offline")
    }
}

/// [`Translator`] backed by a tiny Portuguese to English word list.
/// Unknown words pass through unchanged.
pub struct WordListTranslator;

#[async_trait]
impl Translator for WordListTranslator {
    async fn translate(&self, text: &str, _target: &str) -> anyhow::Result<String> {
        let words: Vec<&str> = text
            .split_whitespace()
            .map(|w| match w {
                "triste" => "sad",
                "feliz" => "happy",
                "muito" => "very",
                other => other,
            })
            .collect();
        Ok(words.join(" "))
    }
}

pub struct FailingTranslator;

#[async_trait]
impl Translator for FailingTranslator {
    async fn translate(&self, _text: &str, _target: &str) -> anyhow::Result<String> {
        anyhow::bail!("translator offline")
    }
}

/// Pipeline with a passthrough translator, the English lexicon and a mock vault.
pub fn pipeline_with(store: Arc<dyn MemoryStore>, stt: FixedStt) -> Pipeline {
    Pipeline {
        translator: Arc::new(Passthrough),
        scorer: Arc::new(aura::Lexicon::english()),
        store,
        stt: Arc::new(stt),
        vault: Arc::new(MockVault),
        pivot_language: "en".into(),
    }
}
