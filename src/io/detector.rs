//! Cat detector implementations
//!
//! The real classifier lives outside this crate. `FakeCatDetector` stands in
//! for it in the CLI; `ScriptedCatDetector` replays fixed answers for tests.

use crate::domain::error::DetectionError;
use crate::domain::ports::CatDetector;
use crate::domain::types::Image;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::debug;

fn check_threshold(confidence_threshold: f32) -> Result<(), DetectionError> {
    if (0.0..=100.0).contains(&confidence_threshold) {
        Ok(())
    } else {
        Err(DetectionError::InvalidThreshold(confidence_threshold))
    }
}

/// 64-bit FNV-1a over the image bytes
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET_BASIS, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

/// Detector that derives a stable pseudo-confidence from the image bytes
///
/// The score is a fixed function of the bytes, so the same image gets the
/// same answer for a given threshold on every platform and build.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeCatDetector;

impl FakeCatDetector {
    pub fn new() -> Self {
        Self
    }

    /// Confidence score in `[0, 100)`
    pub fn confidence(image: &Image) -> f32 {
        (fnv1a(image.bytes()) % 10_000) as f32 / 100.0
    }
}

impl CatDetector for FakeCatDetector {
    fn image_contains_cat(
        &self,
        image: &Image,
        confidence_threshold: f32,
    ) -> Result<bool, DetectionError> {
        check_threshold(confidence_threshold)?;
        if image.is_empty() {
            return Err(DetectionError::EmptyImage);
        }

        let confidence = Self::confidence(image);
        let contains_cat = confidence >= confidence_threshold;
        debug!(
            source = %image.source().unwrap_or("-"),
            bytes = %image.len(),
            confidence = %confidence,
            threshold = %confidence_threshold,
            contains_cat = %contains_cat,
            "fake_detector_scored"
        );
        Ok(contains_cat)
    }
}

/// Detector that returns queued results in order, then a fallback answer
#[derive(Debug, Default)]
pub struct ScriptedCatDetector {
    results: Mutex<VecDeque<Result<bool, DetectionError>>>,
    fallback: bool,
    thresholds_seen: Mutex<Vec<f32>>,
}

impl ScriptedCatDetector {
    /// Always answer `contains_cat`
    pub fn always(contains_cat: bool) -> Self {
        Self { fallback: contains_cat, ..Self::default() }
    }

    /// Answer each of `results` once, then `false`
    pub fn sequence(results: impl IntoIterator<Item = bool>) -> Self {
        Self { results: Mutex::new(results.into_iter().map(Ok).collect()), ..Self::default() }
    }

    /// Queue a failure for the next call
    pub fn push_error(&self, error: DetectionError) {
        self.results.lock().push_front(Err(error));
    }

    /// Thresholds passed to every call so far
    pub fn thresholds_seen(&self) -> Vec<f32> {
        self.thresholds_seen.lock().clone()
    }
}

impl CatDetector for ScriptedCatDetector {
    fn image_contains_cat(
        &self,
        _image: &Image,
        confidence_threshold: f32,
    ) -> Result<bool, DetectionError> {
        self.thresholds_seen.lock().push(confidence_threshold);
        self.results.lock().pop_front().unwrap_or(Ok(self.fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_fixed_function_of_bytes() {
        // FNV-1a of the empty input is the offset basis
        assert_eq!(fnv1a(&[]), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
        let expected = (0xaf63_dc4c_8601_ec8c_u64 % 10_000) as f32 / 100.0;
        assert_eq!(FakeCatDetector::confidence(&Image::new(b"a".to_vec())), expected);
    }

    #[test]
    fn test_fake_detector_is_deterministic() {
        let detector = FakeCatDetector::new();
        let image = Image::new(vec![7, 1, 3, 9, 42]);

        let first = detector.image_contains_cat(&image, 50.0).unwrap();
        let second = detector.image_contains_cat(&image, 50.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fake_detector_threshold_bounds() {
        let detector = FakeCatDetector::new();
        let image = Image::new(b"whiskers".to_vec());

        // Score is always below 100 and at least 0
        assert!(detector.image_contains_cat(&image, 0.0).unwrap());
        assert!(!detector.image_contains_cat(&image, 100.0).unwrap());
    }

    #[test]
    fn test_fake_detector_rejects_empty_image() {
        let result = FakeCatDetector::new().image_contains_cat(&Image::default(), 50.0);
        assert!(matches!(result, Err(DetectionError::EmptyImage)));
    }

    #[test]
    fn test_fake_detector_rejects_bad_threshold() {
        let image = Image::new(vec![1]);
        let result = FakeCatDetector::new().image_contains_cat(&image, 150.0);
        assert!(matches!(result, Err(DetectionError::InvalidThreshold(_))));
    }

    #[test]
    fn test_scripted_detector_sequence() {
        let detector = ScriptedCatDetector::sequence([true, false]);
        let image = Image::new(vec![1]);

        assert!(detector.image_contains_cat(&image, 50.0).unwrap());
        assert!(!detector.image_contains_cat(&image, 50.0).unwrap());
        assert!(!detector.image_contains_cat(&image, 25.0).unwrap());
        assert_eq!(detector.thresholds_seen(), vec![50.0, 50.0, 25.0]);
    }

    #[test]
    fn test_scripted_detector_error() {
        let detector = ScriptedCatDetector::always(true);
        detector.push_error(DetectionError::Classification { message: "offline".to_string() });
        let image = Image::new(vec![1]);

        assert!(detector.image_contains_cat(&image, 50.0).is_err());
        assert!(detector.image_contains_cat(&image, 50.0).unwrap());
    }
}
