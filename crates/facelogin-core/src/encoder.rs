//! Image → descriptor pipeline.

use crate::decode::{self, DecodeError};
use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::Descriptor;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Turns encoded image bytes into a face descriptor.
///
/// `Ok(None)` means the image was readable but contained no face.
pub trait FaceEncoder {
    fn encode(&mut self, image: &[u8]) -> Result<Option<Descriptor>, EncodeError>;
}

/// SCRFD detection followed by the 128-d encoder.
pub struct OnnxFaceEncoder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceEncoder {
    pub fn load(detector_path: &Path, encoder_path: &Path) -> Result<Self, EncodeError> {
        Ok(Self {
            detector: FaceDetector::load(detector_path)?,
            recognizer: FaceRecognizer::load(encoder_path)?,
        })
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&mut self, image: &[u8]) -> Result<Option<Descriptor>, EncodeError> {
        let rgb = decode::load_rgb(image)?;
        let faces = self.detector.detect(&rgb)?;

        // Several faces: the first (most confident) detection wins.
        let Some(face) = faces.first() else {
            tracing::debug!(width = rgb.width(), height = rgb.height(), "no face detected");
            return Ok(None);
        };
        if faces.len() > 1 {
            tracing::debug!(count = faces.len(), "multiple faces detected; using the first");
        }

        let descriptor = self.recognizer.extract(&rgb, face)?;
        Ok(Some(descriptor))
    }
}
