//! facelogin-core: face descriptors and gallery matching.
//!
//! Uses SCRFD for face detection and a 128-dimensional face encoder for
//! descriptor extraction, both running via ONNX Runtime on the CPU. Matching
//! is a linear Euclidean scan over the enrolled gallery.

pub mod alignment;
pub mod decode;
pub mod detector;
pub mod encoder;
pub mod recognizer;
pub mod types;

pub use decode::{decode_data_uri, DecodeError};
pub use detector::FaceDetector;
pub use encoder::{EncodeError, FaceEncoder, OnnxFaceEncoder};
pub use recognizer::FaceRecognizer;
pub use types::{
    BoundingBox, Descriptor, DescriptorError, EnrolledFace, EuclideanMatcher, MatchResult, Matcher,
    DEFAULT_MATCH_THRESHOLD, DESCRIPTOR_DIM,
};
