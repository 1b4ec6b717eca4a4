use serde::{Deserialize, Serialize};

/// How a memory was donated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    #[serde(alias = "texto")]
    Text,
    Audio,
}

/// Coordinates attached to a memory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    /// Build a location only when both coordinates are present.
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
        match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Self { lat, lon }),
            _ => None,
        }
    }
}

/// A donated memory as it is persisted.
///
/// Records are never mutated once stored. Use [`Memory::text`] or
/// [`Memory::audio`] so `audio_url` is set exactly for audio memories.
///
/// The aliases read documents written by the first, Portuguese-keyed
/// version of the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    #[serde(alias = "tipo")]
    pub kind: MemoryKind,
    #[serde(alias = "texto_original")]
    pub original_text: String,
    #[serde(alias = "cor_aura")]
    pub aura_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, alias = "localizacao", skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Memory {
    pub fn text(
        original_text: impl Into<String>,
        aura_color: impl Into<String>,
        location: Option<Location>,
    ) -> Self {
        Self {
            kind: MemoryKind::Text,
            original_text: original_text.into(),
            aura_color: aura_color.into(),
            audio_url: None,
            location,
        }
    }

    pub fn audio(
        transcript: impl Into<String>,
        aura_color: impl Into<String>,
        audio_url: impl Into<String>,
        location: Option<Location>,
    ) -> Self {
        Self {
            kind: MemoryKind::Audio,
            original_text: transcript.into(),
            aura_color: aura_color.into(),
            audio_url: Some(audio_url.into()),
            location,
        }
    }
}

/// A memory together with the identifier its store assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMemory {
    pub id: String,
    #[serde(flatten)]
    pub memory: Memory,
}

/// Listing projection for the map: coordinates are repeated at the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMemory {
    pub id: String,
    #[serde(flatten)]
    pub memory: Memory,
    pub lat: f64,
    pub lon: f64,
}

impl MapMemory {
    /// Project a stored memory, or `None` when it carries no location.
    pub fn from_stored(stored: StoredMemory) -> Option<Self> {
        let loc = stored.memory.location?;
        Some(Self {
            id: stored.id,
            memory: stored.memory,
            lat: loc.lat,
            lon: loc.lon,
        })
    }
}
