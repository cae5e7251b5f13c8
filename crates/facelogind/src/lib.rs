//! Face login service: enrollment, face match login and per-user files.

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod files;
pub mod routes;

use anyhow::Context;
use auth::Authenticator;
use config::Config;
use facelogin_core::OnnxFaceEncoder;
use facelogin_store::{Store, UploadDir};
use files::FileManager;

/// Open the store, upload directory and face models named by `config`.
pub fn open_services(config: &Config) -> anyhow::Result<(Authenticator, FileManager)> {
    let store = Store::open(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path.display()))?;
    let uploads = UploadDir::open(&config.upload_dir)
        .with_context(|| format!("opening upload directory {}", config.upload_dir.display()))?;

    let encoder = OnnxFaceEncoder::load(&config.detector_model_path(), &config.encoder_model_path())
        .with_context(|| format!("loading face models from {}", config.model_dir.display()))?;
    tracing::info!(model_dir = %config.model_dir.display(), "face models loaded");

    let auth = Authenticator::new(Box::new(encoder), store.clone(), config.match_threshold);
    Ok((auth, FileManager::new(store, uploads)))
}
