use facelogin_core::DEFAULT_MATCH_THRESHOLD;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
const ENCODER_MODEL_FILE: &str = "face_encoder_128.onnx";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Daemon configuration.
///
/// Resolved as defaults, then an optional TOML file, then `FACELOGIN_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the HTTP server listens on.
    pub bind_addr: SocketAddr,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Directory uploaded files are written to.
    pub upload_dir: PathBuf,
    /// Maximum (exclusive) descriptor distance for a positive match.
    pub match_threshold: f64,
    /// Request body limit for uploads, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            model_dir: PathBuf::from("models"),
            db_path: PathBuf::from("users.db"),
            upload_dir: PathBuf::from("uploaded_files"),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load from `path` (or `$FACELOGIN_CONFIG`) if given, then apply env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("FACELOGIN_CONFIG").map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
                tracing::info!(path = %path.display(), "loading config file");
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `FACELOGIN_*` overrides from `lookup`. Unparseable values are
    /// ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env_parse(&lookup, "FACELOGIN_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("FACELOGIN_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("FACELOGIN_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("FACELOGIN_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = env_parse(&lookup, "FACELOGIN_MATCH_THRESHOLD") {
            self.match_threshold = v;
        }
        if let Some(v) = env_parse(&lookup, "FACELOGIN_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.match_threshold.is_finite() || self.match_threshold <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "match_threshold must be a positive number, got {}",
                self.match_threshold
            )));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max_upload_bytes must be greater than 0".into()));
        }
        Ok(())
    }

    /// Path to the SCRFD detection model.
    pub fn detector_model_path(&self) -> PathBuf {
        self.model_dir.join(DETECTOR_MODEL_FILE)
    }

    /// Path to the 128-d face encoder model.
    pub fn encoder_model_path(&self) -> PathBuf {
        self.model_dir.join(ENCODER_MODEL_FILE)
    }
}

fn env_parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
