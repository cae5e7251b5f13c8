use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of values in a face descriptor.
pub const DESCRIPTOR_DIM: usize = 128;

/// Size in bytes of a serialized descriptor blob.
pub const DESCRIPTOR_BYTES: usize = DESCRIPTOR_DIM * std::mem::size_of::<f64>();

/// Default maximum (exclusive) Euclidean distance for a positive match.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.45;

#[derive(Error, Debug, PartialEq)]
pub enum DescriptorError {
    #[error("expected {dim} descriptor values, got {0}", dim = DESCRIPTOR_DIM)]
    WrongLength(usize),
    #[error("expected a {size}-byte descriptor blob, got {0} bytes", size = DESCRIPTOR_BYTES)]
    WrongBlobSize(usize),
}

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Fixed-length face descriptor (128 × f64).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    values: Vec<f64>,
}

impl Descriptor {
    pub fn new(values: Vec<f64>) -> Result<Self, DescriptorError> {
        if values.len() != DESCRIPTOR_DIM {
            return Err(DescriptorError::WrongLength(values.len()));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Euclidean distance between two descriptors.
    pub fn distance(&self, other: &Descriptor) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Serialize to the stored blob layout: little-endian f64s, back to back.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Parse a stored blob. The blob must be exactly [`DESCRIPTOR_BYTES`] long.
    pub fn from_bytes(blob: &[u8]) -> Result<Self, DescriptorError> {
        if blob.len() != DESCRIPTOR_BYTES {
            return Err(DescriptorError::WrongBlobSize(blob.len()));
        }
        let values = blob
            .chunks_exact(8)
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect();
        Ok(Self { values })
    }
}

/// An enrolled gallery entry.
#[derive(Debug, Clone)]
pub struct EnrolledFace {
    pub username: String,
    pub descriptor: Descriptor,
}

/// Result of matching a probe descriptor against a gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Username of the accepted match, if any entry fell under the threshold.
    pub username: Option<String>,
    /// Distance of the accepted match.
    pub distance: Option<f64>,
    /// Smallest distance seen across the whole gallery, matched or not.
    pub nearest: Option<f64>,
}

impl MatchResult {
    pub fn matched(&self) -> bool {
        self.username.is_some()
    }
}

/// Strategy for comparing a probe descriptor against a gallery of enrolled faces.
pub trait Matcher {
    fn compare(&self, probe: &Descriptor, gallery: &[EnrolledFace], threshold: f64) -> MatchResult;
}

/// Euclidean nearest-neighbour matcher over the full gallery.
///
/// Every entry is visited. A candidate replaces the current best only when its
/// distance is strictly below both the threshold and the best distance so far,
/// so the first-seen entry wins ties.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(&self, probe: &Descriptor, gallery: &[EnrolledFace], threshold: f64) -> MatchResult {
        let mut best: Option<(usize, f64)> = None;
        let mut nearest: Option<f64> = None;

        for (i, face) in gallery.iter().enumerate() {
            let distance = probe.distance(&face.descriptor);
            nearest = Some(nearest.map_or(distance, |n| n.min(distance)));

            let improves = best.map_or(true, |(_, best_distance)| distance < best_distance);
            if distance < threshold && improves {
                best = Some((i, distance));
            }
        }

        MatchResult {
            username: best.map(|(i, _)| gallery[i].username.clone()),
            distance: best.map(|(_, d)| d),
            nearest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Descriptor with `offset` in the first component and zeros elsewhere.
    fn at(offset: f64) -> Descriptor {
        let mut values = vec![0.0; DESCRIPTOR_DIM];
        values[0] = offset;
        Descriptor::new(values).unwrap()
    }

    fn enrolled(username: &str, offset: f64) -> EnrolledFace {
        EnrolledFace { username: username.into(), descriptor: at(offset) }
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        assert_eq!(Descriptor::new(vec![0.0; 3]), Err(DescriptorError::WrongLength(3)));
    }

    #[test]
    fn test_distance_identical_is_zero() {
        assert_eq!(at(0.3).distance(&at(0.3)), 0.0);
    }

    #[test]
    fn test_distance_is_euclidean() {
        let mut values = vec![0.0; DESCRIPTOR_DIM];
        values[0] = 3.0;
        values[1] = 4.0;
        let a = Descriptor::new(values).unwrap();
        assert!((a.distance(&at(0.0)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_blob_layout() {
        let d = at(1.5);
        let blob = d.to_bytes();
        assert_eq!(blob.len(), DESCRIPTOR_BYTES);
        assert_eq!(&blob[..8], &1.5f64.to_le_bytes());
        assert_eq!(Descriptor::from_bytes(&blob).unwrap(), d);
    }

    #[test]
    fn test_from_bytes_rejects_truncated_blob() {
        assert_eq!(
            Descriptor::from_bytes(&[0u8; 100]),
            Err(DescriptorError::WrongBlobSize(100))
        );
    }

    #[test]
    fn test_identical_probe_matches_for_any_positive_threshold() {
        let gallery = vec![enrolled("alice", 0.7)];
        for threshold in [1e-9, 0.01, 0.45, 10.0] {
            let result = EuclideanMatcher.compare(&at(0.7), &gallery, threshold);
            assert_eq!(result.username.as_deref(), Some("alice"), "threshold {threshold}");
            assert_eq!(result.distance, Some(0.0));
        }
    }

    #[test]
    fn test_distance_equal_to_threshold_is_no_match() {
        let gallery = vec![enrolled("alice", 0.5)];
        let result = EuclideanMatcher.compare(&at(0.0), &gallery, 0.5);
        assert!(!result.matched());
        assert_eq!(result.nearest, Some(0.5));
    }

    #[test]
    fn test_closer_entry_wins_regardless_of_order() {
        let forward = vec![enrolled("a", 0.1), enrolled("b", 0.05)];
        let backward = vec![enrolled("b", 0.05), enrolled("a", 0.1)];
        for gallery in [forward, backward] {
            let result = EuclideanMatcher.compare(&at(0.0), &gallery, 0.45);
            assert_eq!(result.username.as_deref(), Some("b"));
        }
    }

    #[test]
    fn test_tie_keeps_first_seen() {
        let gallery = vec![enrolled("first", 0.2), enrolled("second", -0.2)];
        let result = EuclideanMatcher.compare(&at(0.0), &gallery, 0.45);
        assert_eq!(result.username.as_deref(), Some("first"));
    }

    #[test]
    fn test_out_of_threshold_entries_never_match() {
        let gallery = vec![enrolled("far", 0.9), enrolled("farther", 2.0)];
        let result = EuclideanMatcher.compare(&at(0.0), &gallery, 0.45);
        assert!(!result.matched());
        assert_eq!(result.distance, None);
        assert!((result.nearest.unwrap() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_empty_gallery() {
        let result = EuclideanMatcher.compare(&at(0.0), &[], 0.45);
        assert!(!result.matched());
        assert_eq!(result.nearest, None);
    }
}
