//! End to end donations over a real socket, with the translation and
//! transcription services mocked.

use std::net::SocketAddr;
use std::path::Path;

use eunoia::config::{Overrides, Settings, SttKind};
use eunoia::runtime::build_state;
use eunoia::{JsonlStore, MemoryKind, MemoryStore, StatusMessage, router};
use httpmock::prelude::*;
use serde_json::{Value, json};
use tempfile::tempdir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    base: String,
    stop: oneshot::Sender<()>,
    server: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl Running {
    /// Stop accepting requests and wait for queued audio to finish.
    async fn shutdown(self) {
        let _ = self.stop.send(());
        self.server.await.unwrap();
        self.worker.await.unwrap();
    }
}

fn settings(dir: &Path, mock: &MockServer) -> Settings {
    Settings::from_overrides(Overrides {
        host: Some("127.0.0.1".into()),
        data_dir: Some(dir.join("data")),
        temp_dir: Some(dir.join("tmp")),
        stt: Some(SttKind::Http),
        stt_url: Some(mock.url("/v1/audio/transcriptions")),
        translate_url: Some(mock.base_url()),
        ..Overrides::default()
    })
    .unwrap()
}

async fn start(settings: &Settings) -> Running {
    let (state, worker) = build_state(settings).await.unwrap();
    let audio_dir = settings_audio_dir(settings);
    let app = router(state, settings.max_upload_bytes, Some(audio_dir.as_path()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stopped.await;
            })
            .await
            .unwrap();
    });
    Running {
        base: format!("http://{addr}"),
        stop,
        server,
        worker,
    }
}

fn settings_audio_dir(settings: &Settings) -> std::path::PathBuf {
    match &settings.vault {
        eunoia::config::VaultSettings::Local { dir, .. } => dir.clone(),
        other => panic!("expected a local vault, got {other:?}"),
    }
}

async fn mock_services(mock: &MockServer) {
    mock.mock_async(|when, then| {
        when.method(POST).path("/translate");
        then.status(200)
            .json_body(json!({"translatedText": "what a wonderful day"}));
    })
    .await;
    mock.mock_async(|when, then| {
        when.method(POST).path("/v1/audio/transcriptions");
        then.status(200).json_body(json!({"text": "que dia maravilhoso"}));
    })
    .await;
}

#[tokio::test]
async fn text_and_audio_donations_reach_the_store() {
    let dir = tempdir().unwrap();
    let mock = MockServer::start_async().await;
    mock_services(&mock).await;
    let settings = settings(dir.path(), &mock);
    let running = start(&settings).await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new()
        .text("text", "que dia maravilhoso")
        .text("lat", "-8.05")
        .text("lon", "-34.9");
    let resp: StatusMessage = client
        .post(format!("{}/doar", running.base))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp.status, "success");

    let listed: Vec<Value> = client
        .get(format!("{}/memorias", running.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["aura_color"], "#f5a623");
    assert_eq!(listed[0]["lat"], -8.05);
    assert_eq!(listed[0]["original_text"], "que dia maravilhoso");

    let form = reqwest::multipart::Form::new().part(
        "audio_file",
        reqwest::multipart::Part::bytes(b"webm bytes".to_vec()).file_name("voice.webm"),
    );
    let resp: StatusMessage = client
        .post(format!("{}/doar", running.base))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp.status, "success");

    drop(client);
    running.shutdown().await;

    let store = JsonlStore::open(dir.path().join("data")).await.unwrap();
    let all = store.all().await.unwrap();
    assert_eq!(all.len(), 2);
    let audio = all
        .iter()
        .find(|m| m.memory.kind == MemoryKind::Audio)
        .unwrap();
    assert!(audio.memory.location.is_none());
    assert_eq!(audio.memory.original_text, "que dia maravilhoso");
    let url = audio.memory.audio_url.as_deref().unwrap();
    assert!(url.starts_with("http://127.0.0.1:8000/audio/eunoia_"));
    assert!(url.ends_with(".webm"));

    assert_eq!(std::fs::read_dir(dir.path().join("tmp")).unwrap().count(), 0);
    assert_eq!(
        std::fs::read_dir(dir.path().join("data/audio"))
            .unwrap()
            .count(),
        1
    );
}

#[tokio::test]
async fn failed_transcription_is_silent_to_the_donor() {
    let dir = tempdir().unwrap();
    let mock = MockServer::start_async().await;
    mock.mock_async(|when, then| {
        when.method(POST).path("/v1/audio/transcriptions");
        then.status(500);
    })
    .await;
    let settings = settings(dir.path(), &mock);
    let running = start(&settings).await;

    let form = reqwest::multipart::Form::new().part(
        "audio_file",
        reqwest::multipart::Part::bytes(b"noise".to_vec()).file_name("noise.ogg"),
    );
    let resp = reqwest::Client::new()
        .post(format!("{}/doar", running.base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: StatusMessage = resp.json().await.unwrap();
    assert_eq!(body.status, "success");

    running.shutdown().await;

    let store = JsonlStore::open(dir.path().join("data")).await.unwrap();
    assert!(store.all().await.unwrap().is_empty());
    assert_eq!(std::fs::read_dir(dir.path().join("tmp")).unwrap().count(), 0);
}

#[tokio::test]
async fn empty_submission_gets_soft_error() {
    let dir = tempdir().unwrap();
    let mock = MockServer::start_async().await;
    let settings = settings(dir.path(), &mock);
    let running = start(&settings).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/doar", running.base))
        .multipart(reqwest::multipart::Form::new().text("lat", "1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: StatusMessage = resp.json().await.unwrap();
    assert_eq!(body.status, "error");

    running.shutdown().await;
}
