//! Enrollment and face login over the record store.

use facelogin_core::{EncodeError, EuclideanMatcher, FaceEncoder, Matcher};
use facelogin_store::{check_username, Store, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no face detected")]
    NoFaceDetected,
    #[error("username already exists: {0}")]
    DuplicateUsername(String),
    #[error("face not recognized")]
    NoMatch,
    #[error("username is empty or contains path characters")]
    InvalidUsername,
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("face encoder: {0}")]
    Encoder(EncodeError),
    #[error("store: {0}")]
    Store(StoreError),
    #[error("engine thread exited")]
    EngineUnavailable,
}

impl From<EncodeError> for AuthError {
    fn from(e: EncodeError) -> Self {
        match e {
            EncodeError::Decode(decode) => AuthError::InvalidImage(decode.to_string()),
            other => AuthError::Encoder(other),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateUsername(name) => AuthError::DuplicateUsername(name),
            StoreError::InvalidUsername(_) => AuthError::InvalidUsername,
            other => AuthError::Store(other),
        }
    }
}

/// Runs descriptor extraction and gallery matching against the store.
///
/// Operations take `&mut self` because inference sessions are stateful; the
/// daemon owns one instance on its engine thread.
pub struct Authenticator {
    encoder: Box<dyn FaceEncoder + Send>,
    store: Store,
    threshold: f64,
}

impl Authenticator {
    pub fn new(encoder: Box<dyn FaceEncoder + Send>, store: Store, threshold: f64) -> Self {
        Self { encoder, store, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Enroll `username` with the face found in `image`.
    pub fn register(&mut self, username: &str, image: &[u8]) -> Result<(), AuthError> {
        let username = username.trim();
        check_username(username)?;

        let descriptor = self.encoder.encode(image)?.ok_or(AuthError::NoFaceDetected)?;
        self.store.insert_user(username, &descriptor)?;
        tracing::info!(user = username, "enrolled");
        Ok(())
    }

    /// Identify the enrolled user whose face is in `image`.
    pub fn login(&mut self, image: &[u8]) -> Result<String, AuthError> {
        let probe = self.encoder.encode(image)?.ok_or(AuthError::NoFaceDetected)?;
        let gallery = self.store.list_enrolled()?;
        let result = EuclideanMatcher.compare(&probe, &gallery, self.threshold);

        tracing::debug!(
            gallery = gallery.len(),
            nearest = ?result.nearest,
            threshold = self.threshold,
            "login comparison"
        );

        match result.username {
            Some(user) => {
                tracing::info!(user = %user, distance = ?result.distance, "login matched");
                Ok(user)
            }
            None => Err(AuthError::NoMatch),
        }
    }
}
