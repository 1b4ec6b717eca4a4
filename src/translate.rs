use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Translates free text into a target language.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: &str) -> anyhow::Result<String>;
}

/// Returns the text untouched. Used when no translation service is set up,
/// which only gives sensible scores for text already in the pivot language.
#[derive(Debug, Default, Clone)]
pub struct Passthrough;

#[async_trait]
impl Translator for Passthrough {
    async fn translate(&self, text: &str, _target: &str) -> anyhow::Result<String> {
        Ok(text.to_string())
    }
}

/// Client for a LibreTranslate-compatible `/translate` endpoint.
#[derive(Clone, Debug)]
pub struct LibreTranslate {
    /// Base URL such as `http://localhost:5000`.
    pub base_url: String,
    pub api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct Request<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct Response {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl LibreTranslate {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Translator for LibreTranslate {
    async fn translate(&self, text: &str, target: &str) -> anyhow::Result<String> {
        let url = format!("{}/translate", self.base_url.trim_end_matches('/'));
        trace!(%url, %target, "translation request");
        let body = Request {
            q: text,
            source: "auto",
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };
        let resp: Response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(translated = %resp.translated_text, "translation done");
        Ok(resp.translated_text)
    }
}
