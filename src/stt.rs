//! Speech to text for donated audio.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

/// Sample rate every engine expects after decoding.
pub const SAMPLE_RATE: u32 = 16_000;

/// Result of a transcription.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Transcription {
    /// Combined text output, trimmed.
    pub text: String,
}

impl Transcription {
    /// True when nothing but whitespace was recognised.
    pub fn is_silent(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A speech recognition engine working on an audio file of any container.
#[async_trait]
pub trait Stt: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> anyhow::Result<Transcription>;
}

/// Decode `path` into mono 16 kHz signed 16-bit PCM using `ffmpeg`.
pub async fn decode_to_pcm(ffmpeg: &str, path: &Path) -> anyhow::Result<Vec<i16>> {
    let output = Command::new(ffmpeg)
        .args(["-nostdin", "-hide_banner", "-loglevel", "error", "-i"])
        .arg(path)
        .args(["-f", "s16le", "-ac", "1", "-ar"])
        .arg(SAMPLE_RATE.to_string())
        .arg("-")
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("failed to run {ffmpeg}: {e}"))?;
    if !output.status.success() {
        anyhow::bail!(
            "{ffmpeg} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    let samples: Vec<i16> = output
        .stdout
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect();
    trace!(samples = samples.len(), "decoded audio");
    Ok(samples)
}

#[cfg(feature = "whisper")]
pub use whisper::WhisperStt;

#[cfg(feature = "whisper")]
mod whisper {
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tracing::debug;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    use super::{Stt, Transcription, decode_to_pcm};

    /// Local inference with `whisper-rs`. The model is loaded once.
    pub struct WhisperStt {
        ctx: Arc<WhisperContext>,
        language: String,
        ffmpeg: String,
    }

    impl WhisperStt {
        /// Load a ggml whisper model from `model`.
        pub fn new(
            model: impl AsRef<Path>,
            language: impl Into<String>,
            ffmpeg: impl Into<String>,
        ) -> anyhow::Result<Self> {
            let path = model
                .as_ref()
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("model path must be valid UTF-8"))?;
            let ctx = WhisperContext::new_with_params(path, WhisperContextParameters::default())
                .map_err(|e| anyhow::anyhow!(e))?;
            Ok(Self {
                ctx: Arc::new(ctx),
                language: language.into(),
                ffmpeg: ffmpeg.into(),
            })
        }
    }

    #[async_trait]
    impl Stt for WhisperStt {
        async fn transcribe(&self, audio: &Path) -> anyhow::Result<Transcription> {
            let pcm = decode_to_pcm(&self.ffmpeg, audio).await?;
            let ctx = self.ctx.clone();
            let language = self.language.clone();
            let text = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
                let mut float_buf = vec![0.0f32; pcm.len()];
                whisper_rs::convert_integer_to_float_audio(&pcm, &mut float_buf)
                    .map_err(|e| anyhow::anyhow!(e))?;
                let mut state = ctx.create_state().map_err(|e| anyhow::anyhow!(e))?;
                let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
                params.set_language(Some(language.as_str()));
                params.set_print_special(false);
                params.set_print_progress(false);
                params.set_print_realtime(false);
                params.set_print_timestamps(false);
                state
                    .full(params, &float_buf)
                    .map_err(|e| anyhow::anyhow!(e))?;
                let segments = state.full_n_segments().map_err(|e| anyhow::anyhow!(e))?;
                let mut out = String::new();
                for i in 0..segments {
                    out.push_str(
                        &state
                            .full_get_segment_text(i)
                            .map_err(|e| anyhow::anyhow!(e))?,
                    );
                }
                Ok(out)
            })
            .await??;
            debug!(%text, "whisper transcription done");
            Ok(Transcription {
                text: text.trim().to_string(),
            })
        }
    }

}

/// Client for an OpenAI-compatible `/v1/audio/transcriptions` endpoint.
#[derive(Clone, Debug)]
pub struct HttpStt {
    /// Full endpoint URL.
    pub url: String,
    pub model: String,
    pub language: String,
    pub api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpStt {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        language: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            url: url.into(),
            model: model.into(),
            language: language.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Stt for HttpStt {
    async fn transcribe(&self, audio: &Path) -> anyhow::Result<Transcription> {
        let name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();
        let bytes = tokio::fs::read(audio).await?;
        let form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(name))
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "json");
        let mut req = self.client.post(&self.url).multipart(form);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let trans: Transcription = req.send().await?.error_for_status()?.json().await?;
        debug!(text = %trans.text, "remote transcription done");
        Ok(Transcription {
            text: trans.text.trim().to_string(),
        })
    }
}

/// Available whisper.cpp ggml models.
pub const MODELS: &[&str] = &[
    "tiny", "tiny.en", "base", "base.en", "small", "small.en", "medium", "medium.en", "large",
];

/// Default location of the ggml model files.
pub const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Download the ggml `model` from `base_url` into `dir`, returning the saved path.
pub async fn fetch_model(model: &str, dir: &Path, base_url: &str) -> anyhow::Result<PathBuf> {
    if !MODELS.contains(&model) {
        anyhow::bail!("unknown whisper model {model:?}; expected one of {MODELS:?}");
    }
    let url = format!("{}/ggml-{model}.bin", base_url.trim_end_matches('/'));
    debug!(%url, "downloading model");
    tokio::fs::create_dir_all(dir).await?;
    let resp = reqwest::get(&url).await?.error_for_status()?;
    let total = resp.content_length().unwrap_or(0);
    let pb = ProgressBar::new(total);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {bytes}/{total_bytes}",
    )?);
    let path = dir.join(format!("ggml-{model}.bin"));
    let mut file = tokio::fs::File::create(&path).await?;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        if total > 0 {
            pb.inc(chunk.len() as u64);
        } else {
            pb.tick();
        }
    }
    file.flush().await?;
    pb.finish_and_clear();
    trace!(path = %path.display(), "download complete");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn whitespace_transcripts_are_silent() {
        assert!(Transcription { text: " \n\t".into() }.is_silent());
        assert!(Transcription { text: String::new() }.is_silent());
        assert!(!Transcription { text: "oi".into() }.is_silent());
    }

    #[tokio::test]
    async fn http_stt_posts_file_and_trims_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/audio/transcriptions")
                    .header("authorization", "Bearer k")
                    .body_contains("name=\"language\"")
                    .body_contains("pt");
                then.status(200).json_body(json!({"text": "  bom dia  "}));
            })
            .await;

        let dir = tempdir().unwrap();
        let file = dir.path().join("a.webm");
        tokio::fs::write(&file, b"audio").await.unwrap();

        let stt = HttpStt::new(
            server.url("/v1/audio/transcriptions"),
            "whisper-1",
            "pt",
            Some("k".into()),
        );
        let t = stt.transcribe(&file).await.unwrap();
        assert_eq!(t.text, "bom dia");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_stt_missing_file_is_an_error() {
        let stt = HttpStt::new("http://127.0.0.1:9/none", "m", "pt", None);
        assert!(stt.transcribe(Path::new("/no/such/file.webm")).await.is_err());
    }

    #[tokio::test]
    async fn fetch_model_saves_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ggml-tiny.bin");
                then.status(200).body("ok");
            })
            .await;

        let dir = tempdir().unwrap();
        let path = fetch_model("tiny", dir.path(), &server.base_url())
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("ggml-tiny.bin"));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn fetch_model_rejects_unknown_names() {
        let dir = tempdir().unwrap();
        assert!(
            fetch_model("gigantic", dir.path(), "http://127.0.0.1:9")
                .await
                .is_err()
        );
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, script: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn decode_reads_little_endian_samples() {
        let dir = tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), r"printf '\001\000\377\377'");
        let pcm = decode_to_pcm(&ffmpeg, Path::new("in.webm")).await.unwrap();
        assert_eq!(pcm, vec![1, -1]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn decode_failure_reports_stderr() {
        let dir = tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), "echo 'bad input' >&2; exit 1");
        let err = decode_to_pcm(&ffmpeg, Path::new("in.webm"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad input"));
    }

    #[tokio::test]
    async fn decode_missing_binary_is_an_error() {
        assert!(
            decode_to_pcm("/no/such/ffmpeg", Path::new("in.webm"))
                .await
                .is_err()
        );
    }
}
