//! Command line, environment and TOML configuration.
//!
//! Every setting can come from a flag, an environment variable or the TOML
//! file named by `--config`. Flags and environment win over the file; the
//! file wins over built-in defaults.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use daemon_common::LogLevel;
use serde::Deserialize;

use crate::stt::MODEL_BASE_URL;
use crate::vault::CLOUDINARY_API;

#[derive(Parser, Debug)]
#[command(name = "eunoia", about = "Collects donated memories and colors them by feeling")]
pub struct Cli {
    /// TOML file with default settings
    #[arg(long, env = "EUNOIA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub overrides: Overrides,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP service (the default)
    Serve,
    /// Download a ggml whisper model
    FetchModel {
        /// Model name, e.g. `tiny` or `base`
        #[arg(long, default_value = "tiny")]
        model: String,
        /// Directory the model is saved into
        #[arg(long, default_value = "models")]
        dir: PathBuf,
        #[arg(long, env = "WHISPER_MODEL_BASE_URL", default_value = MODEL_BASE_URL)]
        base_url: String,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Jsonl,
    Mongo,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SttKind {
    Whisper,
    Http,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultKind {
    Local,
    Cloudinary,
}

/// Settings as given by the user. Unset fields fall back to the config file,
/// then to defaults. Every flag is accepted before or after a subcommand.
#[derive(Args, Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Overrides {
    /// Address to bind
    #[arg(long, env = "EUNOIA_HOST", global = true)]
    pub host: Option<String>,
    #[arg(long, env = "EUNOIA_PORT", global = true)]
    pub port: Option<u16>,
    /// Logging verbosity level
    #[arg(long, env = "EUNOIA_LOG_LEVEL", global = true)]
    pub log_level: Option<LogLevel>,
    /// Run as a background daemon
    #[arg(short = 'd', long, global = true)]
    pub daemon: bool,

    #[arg(long, env = "EUNOIA_STORE", global = true)]
    pub store: Option<StoreKind>,
    /// Directory for the JSON lines store and local audio
    #[arg(long, env = "EUNOIA_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,
    #[arg(long, env = "MONGO_URI", global = true)]
    pub mongo_uri: Option<String>,
    #[arg(long, env = "EUNOIA_MONGO_DATABASE", global = true)]
    pub mongo_database: Option<String>,
    #[arg(long, env = "EUNOIA_MONGO_COLLECTION", global = true)]
    pub mongo_collection: Option<String>,

    #[arg(long, env = "EUNOIA_STT", global = true)]
    pub stt: Option<SttKind>,
    /// Path to a ggml whisper model
    #[arg(long, env = "WHISPER_MODEL", global = true)]
    pub whisper_model: Option<PathBuf>,
    /// OpenAI-compatible transcription endpoint
    #[arg(long, env = "EUNOIA_STT_URL", global = true)]
    pub stt_url: Option<String>,
    #[arg(long, env = "EUNOIA_STT_MODEL", global = true)]
    pub stt_model: Option<String>,
    #[arg(long, env = "EUNOIA_STT_API_KEY", hide_env_values = true, global = true)]
    pub stt_api_key: Option<String>,
    /// Language spoken in donated audio
    #[arg(long, env = "EUNOIA_STT_LANGUAGE", global = true)]
    pub stt_language: Option<String>,
    #[arg(long, env = "EUNOIA_FFMPEG", global = true)]
    pub ffmpeg: Option<String>,

    /// LibreTranslate base URL; without it text is scored untranslated
    #[arg(long, env = "EUNOIA_TRANSLATE_URL", global = true)]
    pub translate_url: Option<String>,
    #[arg(long, env = "EUNOIA_TRANSLATE_API_KEY", hide_env_values = true, global = true)]
    pub translate_api_key: Option<String>,
    /// Language text is translated into before scoring
    #[arg(long, env = "EUNOIA_PIVOT_LANGUAGE", global = true)]
    pub pivot_language: Option<String>,

    #[arg(long, env = "EUNOIA_VAULT", global = true)]
    pub vault: Option<VaultKind>,
    #[arg(long, env = "EUNOIA_VAULT_DIR", global = true)]
    pub vault_dir: Option<PathBuf>,
    /// Public base URL of the local vault
    #[arg(long, env = "EUNOIA_VAULT_PUBLIC_URL", global = true)]
    pub vault_public_url: Option<String>,
    #[arg(long, env = "CLOUDINARY_CLOUD_NAME", global = true)]
    pub cloudinary_cloud_name: Option<String>,
    #[arg(long, env = "CLOUDINARY_API_KEY", hide_env_values = true, global = true)]
    pub cloudinary_api_key: Option<String>,
    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true, global = true)]
    pub cloudinary_api_secret: Option<String>,
    #[arg(long, env = "CLOUDINARY_BASE_URL", global = true)]
    pub cloudinary_base_url: Option<String>,

    /// Where uploads wait for processing
    #[arg(long, env = "EUNOIA_TEMP_DIR", global = true)]
    pub temp_dir: Option<PathBuf>,
    /// TOML file with extra `[words]` for the sentiment lexicon
    #[arg(long, env = "EUNOIA_LEXICON", global = true)]
    pub lexicon_path: Option<PathBuf>,
    #[arg(long, env = "EUNOIA_MAX_UPLOAD_BYTES", global = true)]
    pub max_upload_bytes: Option<usize>,
}

impl Overrides {
    /// Fill every unset field of `self` from `file`.
    pub fn merge(self, file: Overrides) -> Overrides {
        Overrides {
            host: self.host.or(file.host),
            port: self.port.or(file.port),
            log_level: self.log_level.or(file.log_level),
            daemon: self.daemon || file.daemon,
            store: self.store.or(file.store),
            data_dir: self.data_dir.or(file.data_dir),
            mongo_uri: self.mongo_uri.or(file.mongo_uri),
            mongo_database: self.mongo_database.or(file.mongo_database),
            mongo_collection: self.mongo_collection.or(file.mongo_collection),
            stt: self.stt.or(file.stt),
            whisper_model: self.whisper_model.or(file.whisper_model),
            stt_url: self.stt_url.or(file.stt_url),
            stt_model: self.stt_model.or(file.stt_model),
            stt_api_key: self.stt_api_key.or(file.stt_api_key),
            stt_language: self.stt_language.or(file.stt_language),
            ffmpeg: self.ffmpeg.or(file.ffmpeg),
            translate_url: self.translate_url.or(file.translate_url),
            translate_api_key: self.translate_api_key.or(file.translate_api_key),
            pivot_language: self.pivot_language.or(file.pivot_language),
            vault: self.vault.or(file.vault),
            vault_dir: self.vault_dir.or(file.vault_dir),
            vault_public_url: self.vault_public_url.or(file.vault_public_url),
            cloudinary_cloud_name: self.cloudinary_cloud_name.or(file.cloudinary_cloud_name),
            cloudinary_api_key: self.cloudinary_api_key.or(file.cloudinary_api_key),
            cloudinary_api_secret: self.cloudinary_api_secret.or(file.cloudinary_api_secret),
            cloudinary_base_url: self.cloudinary_base_url.or(file.cloudinary_base_url),
            temp_dir: self.temp_dir.or(file.temp_dir),
            lexicon_path: self.lexicon_path.or(file.lexicon_path),
            max_upload_bytes: self.max_upload_bytes.or(file.max_upload_bytes),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("`{0}` must be set")]
    Missing(&'static str),
    #[error("{what} needs the `{feature}` feature, which this build lacks")]
    FeatureDisabled {
        what: &'static str,
        feature: &'static str,
    },
}

/// Read overrides from a TOML file.
pub fn load_file(path: &Path) -> Result<Overrides, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq)]
pub enum StoreSettings {
    Jsonl {
        dir: PathBuf,
    },
    Mongo {
        uri: String,
        database: String,
        collection: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum SttSettings {
    Whisper {
        model: PathBuf,
        language: String,
        ffmpeg: String,
    },
    Http {
        url: String,
        model: String,
        language: String,
        api_key: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TranslatorSettings {
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Clone, PartialEq)]
pub enum VaultSettings {
    Local {
        dir: PathBuf,
        public_url: String,
    },
    Cloudinary {
        base_url: String,
        cloud_name: String,
        api_key: String,
        api_secret: String,
    },
}

impl std::fmt::Debug for VaultSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultSettings::Local { dir, public_url } => f
                .debug_struct("Local")
                .field("dir", dir)
                .field("public_url", public_url)
                .finish(),
            VaultSettings::Cloudinary {
                base_url,
                cloud_name,
                ..
            } => f
                .debug_struct("Cloudinary")
                .field("base_url", base_url)
                .field("cloud_name", cloud_name)
                .finish_non_exhaustive(),
        }
    }
}

/// Fully resolved settings.
#[derive(Clone, Debug)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub log_level: LogLevel,
    pub daemon: bool,
    pub store: StoreSettings,
    pub stt: SttSettings,
    pub translator: Option<TranslatorSettings>,
    pub pivot_language: String,
    pub vault: VaultSettings,
    pub temp_dir: PathBuf,
    pub lexicon_path: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

fn default_stt() -> SttKind {
    if cfg!(feature = "whisper") {
        SttKind::Whisper
    } else {
        SttKind::Http
    }
}

impl Settings {
    /// Apply defaults and check that every selected backend is complete.
    pub fn from_overrides(o: Overrides) -> Result<Self, ConfigError> {
        let host = o.host.unwrap_or_else(|| "0.0.0.0".into());
        let port = o.port.unwrap_or(DEFAULT_PORT);
        let data_dir = o.data_dir.unwrap_or_else(|| PathBuf::from("data"));
        let language = o.stt_language.unwrap_or_else(|| "pt".into());

        let store = match o.store.unwrap_or(StoreKind::Jsonl) {
            StoreKind::Jsonl => StoreSettings::Jsonl {
                dir: data_dir.clone(),
            },
            StoreKind::Mongo => {
                if !cfg!(feature = "mongo") {
                    return Err(ConfigError::FeatureDisabled {
                        what: "the mongo store",
                        feature: "mongo",
                    });
                }
                StoreSettings::Mongo {
                    uri: o.mongo_uri.ok_or(ConfigError::Missing("mongo_uri"))?,
                    database: o
                        .mongo_database
                        .unwrap_or_else(|| "memoria_viva_db".into()),
                    collection: o.mongo_collection.unwrap_or_else(|| "memorias".into()),
                }
            }
        };

        let stt = match o.stt.unwrap_or_else(default_stt) {
            SttKind::Whisper => {
                if !cfg!(feature = "whisper") {
                    return Err(ConfigError::FeatureDisabled {
                        what: "local whisper transcription",
                        feature: "whisper",
                    });
                }
                SttSettings::Whisper {
                    model: o
                        .whisper_model
                        .unwrap_or_else(|| PathBuf::from("models/ggml-tiny.bin")),
                    language,
                    ffmpeg: o.ffmpeg.unwrap_or_else(|| "ffmpeg".into()),
                }
            }
            SttKind::Http => SttSettings::Http {
                url: o.stt_url.ok_or(ConfigError::Missing("stt_url"))?,
                model: o.stt_model.unwrap_or_else(|| "whisper-1".into()),
                language,
                api_key: o.stt_api_key,
            },
        };

        let translator = o.translate_url.map(|url| TranslatorSettings {
            url,
            api_key: o.translate_api_key,
        });

        let vault = match o.vault.unwrap_or(VaultKind::Local) {
            VaultKind::Local => {
                let public_host = if host == "0.0.0.0" { "localhost" } else { host.as_str() };
                VaultSettings::Local {
                    dir: o.vault_dir.unwrap_or_else(|| data_dir.join("audio")),
                    public_url: o
                        .vault_public_url
                        .unwrap_or_else(|| format!("http://{public_host}:{port}/audio")),
                }
            }
            VaultKind::Cloudinary => VaultSettings::Cloudinary {
                base_url: o
                    .cloudinary_base_url
                    .unwrap_or_else(|| CLOUDINARY_API.into()),
                cloud_name: o
                    .cloudinary_cloud_name
                    .ok_or(ConfigError::Missing("cloudinary_cloud_name"))?,
                api_key: o
                    .cloudinary_api_key
                    .ok_or(ConfigError::Missing("cloudinary_api_key"))?,
                api_secret: o
                    .cloudinary_api_secret
                    .ok_or(ConfigError::Missing("cloudinary_api_secret"))?,
            },
        };

        Ok(Self {
            host,
            port,
            log_level: o.log_level.unwrap_or_default(),
            daemon: o.daemon,
            store,
            stt,
            translator,
            pivot_language: o.pivot_language.unwrap_or_else(|| "en".into()),
            vault,
            temp_dir: o
                .temp_dir
                .unwrap_or_else(|| std::env::temp_dir().join("eunoia")),
            lexicon_path: o.lexicon_path,
            max_upload_bytes: o.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }
}

impl Cli {
    /// Overrides from the command line merged over the config file, if any.
    pub fn overrides(&self) -> Result<Overrides, ConfigError> {
        let file = match &self.config {
            Some(path) => load_file(path)?,
            None => Overrides::default(),
        };
        Ok(self.overrides.clone().merge(file))
    }

    pub fn settings(&self) -> Result<Settings, ConfigError> {
        Settings::from_overrides(self.overrides()?)
    }
}
