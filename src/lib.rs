//! Eunoia collects donated memories, as text or recorded voice, and tints
//! each one with an aura color derived from its sentiment.

pub mod config;
pub mod memory;
pub mod pipeline;
pub mod queue;
pub mod runtime;
pub mod server;
pub mod shutdown;
pub mod store;
pub mod stt;
pub mod translate;
pub mod vault;

#[cfg(test)]
mod test_helpers;

pub use config::{Cli, Command, ConfigError, Settings};
pub use memory::{Location, MapMemory, Memory, MemoryKind, StoredMemory};
pub use pipeline::{AudioJob, AudioOutcome, Pipeline, PipelineError, SentimentScorer, TempAudio};
pub use queue::AudioQueue;
pub use server::{AppState, StatusMessage, router};
pub use shutdown::shutdown_signal;
pub use store::{InMemoryStore, JsonlStore, MemoryStore, list_located};
pub use stt::{HttpStt, Stt, Transcription};
pub use translate::{LibreTranslate, Passthrough, Translator};
pub use vault::{Cloudinary, LocalVault, ObjectStore};
