//! Pixel comparison between a candidate and a reference image.
//!
//! # Example
//!
//! ```
//! use email_image_match::comparator::{ComparisonReason, PixelComparator};
//! use email_image_match::RasterImage;
//!
//! let white = RasterImage::from_rgba(10, 10, vec![255; 400]).unwrap();
//! let comparator = PixelComparator::new(0.8, 0.1);
//!
//! let outcome = comparator.compare(&white, &white);
//! assert!(outcome.matched);
//! assert_eq!(outcome.reason, ComparisonReason::Success);
//! ```

use crate::codec::{self, RasterImage};
use crate::diagnostics::DiagnosticsSink;
use crate::diff;
use crate::reference::ReferenceImage;
use tracing::{debug, instrument, warn};

/// Largest per-axis size difference, in pixels, that is still compared.
pub const MAX_DIMENSION_DELTA: u32 = 5;

const DEFAULT_THRESHOLD: f64 = 0.8;
const DEFAULT_PIXEL_THRESHOLD: f64 = 0.1;

/// Why a comparison ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonReason {
    /// Sizes differ by more than [`MAX_DIMENSION_DELTA`] on some axis.
    SizeMismatch,
    /// Pixels were compared but the match rate is below the threshold.
    LowMatchRate,
    /// The candidate could not be decoded.
    ParseError,
    /// The match rate reached the threshold.
    Success,
}

impl std::fmt::Display for ComparisonReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonReason::SizeMismatch => write!(f, "size_mismatch"),
            ComparisonReason::LowMatchRate => write!(f, "low_match_rate"),
            ComparisonReason::ParseError => write!(f, "parse_error"),
            ComparisonReason::Success => write!(f, "success"),
        }
    }
}

/// Result of comparing one candidate against one reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonOutcome {
    /// Whether the match rate reached the threshold.
    pub matched: bool,
    /// Fraction of compared pixels that are not mismatched, in `[0, 1]`.
    pub match_rate: f64,
    /// Why the comparison ended this way.
    pub reason: ComparisonReason,
}

impl ComparisonOutcome {
    fn rejected(reason: ComparisonReason) -> Self {
        Self {
            matched: false,
            match_rate: 0.0,
            reason,
        }
    }
}

/// Compares rasters pixel by pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelComparator {
    threshold: f64,
    pixel_threshold: f64,
}

impl PixelComparator {
    /// Creates a comparator.
    ///
    /// `threshold` is the minimum match rate for a match; `pixel_threshold` is the
    /// per-pixel colour tolerance (smaller is stricter). Both are clamped to `[0, 1]`;
    /// NaN falls back to the default.
    #[must_use]
    pub fn new(threshold: f64, pixel_threshold: f64) -> Self {
        Self {
            threshold: unit_or(threshold, DEFAULT_THRESHOLD),
            pixel_threshold: unit_or(pixel_threshold, DEFAULT_PIXEL_THRESHOLD),
        }
    }

    /// Match-rate threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Per-pixel colour tolerance.
    #[must_use]
    pub fn pixel_threshold(&self) -> f64 {
        self.pixel_threshold
    }

    /// Compares `candidate` against `reference`.
    ///
    /// Rasters whose sizes differ by more than [`MAX_DIMENSION_DELTA`] on either
    /// axis are rejected without pixel work. Smaller differences are reconciled by
    /// cropping both rasters from the top-left corner to the common size.
    #[must_use]
    pub fn compare(&self, candidate: &RasterImage, reference: &RasterImage) -> ComparisonOutcome {
        let (cw, ch) = candidate.dimensions();
        let (rw, rh) = reference.dimensions();

        if cw.abs_diff(rw) > MAX_DIMENSION_DELTA || ch.abs_diff(rh) > MAX_DIMENSION_DELTA {
            return ComparisonOutcome::rejected(ComparisonReason::SizeMismatch);
        }

        let width = cw.min(rw);
        let height = ch.min(rh);
        let total = u64::from(width) * u64::from(height);
        if total == 0 {
            return ComparisonOutcome::rejected(ComparisonReason::LowMatchRate);
        }

        let candidate = candidate.crop_top_left(width, height);
        let reference = reference.crop_top_left(width, height);

        let mismatched = diff::count_mismatched(
            candidate.pixels(),
            reference.pixels(),
            width,
            height,
            self.pixel_threshold,
        );

        #[allow(clippy::cast_precision_loss)]
        let match_rate = 1.0 - mismatched as f64 / total as f64;
        let matched = match_rate >= self.threshold;

        ComparisonOutcome {
            matched,
            match_rate,
            reason: if matched {
                ComparisonReason::Success
            } else {
                ComparisonReason::LowMatchRate
            },
        }
    }

    /// Decodes `candidate` and compares it against `reference`.
    ///
    /// A decode failure yields [`ComparisonReason::ParseError`] instead of an error.
    #[must_use]
    pub fn compare_encoded(&self, candidate: &[u8], reference: &RasterImage) -> ComparisonOutcome {
        match codec::decode(candidate) {
            Ok(raster) => self.compare(&raster, reference),
            Err(e) => {
                warn!(error = %e, "Failed to decode candidate");
                ComparisonOutcome::rejected(ComparisonReason::ParseError)
            }
        }
    }

    /// Compares and hands non-matching candidates to `sink`.
    ///
    /// Sink failures are logged and ignored.
    #[instrument(
        name = "PixelComparator::compare",
        skip_all,
        fields(reference = %reference.path().display())
    )]
    pub fn compare_and_record(
        &self,
        candidate: &RasterImage,
        reference: &ReferenceImage,
        sink: &dyn DiagnosticsSink,
    ) -> ComparisonOutcome {
        let outcome = self.compare(candidate, reference.decoded());

        debug!(
            matched = outcome.matched,
            match_rate = outcome.match_rate,
            reason = %outcome.reason,
            "Compared candidate"
        );

        if !outcome.matched {
            if let Err(e) = sink.record_failed_match(candidate, reference.path(), outcome.match_rate)
            {
                warn!(error = %e, category = %e.category(), "Failed to record diagnostics");
            }
        }

        outcome
    }
}

impl Default for PixelComparator {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_PIXEL_THRESHOLD)
    }
}

fn unit_or(value: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use image::{Rgba, RgbaImage};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RasterImage {
        RgbaImage::from_pixel(width, height, Rgba(color)).into()
    }

    /// 10x10 white raster whose left half is black.
    fn half_black() -> RasterImage {
        RgbaImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
        .into()
    }

    struct FailingSink {
        calls: AtomicUsize,
    }

    impl DiagnosticsSink for FailingSink {
        fn record_failed_match(&self, _: &RasterImage, reference: &Path, _: f64) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::DiagnosticsWrite {
                path: reference.to_path_buf(),
                source: image::ImageError::IoError(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only",
                )),
            })
        }
    }

    fn reference(raster: &RasterImage) -> ReferenceImage {
        ReferenceImage::from_bytes("ref.png", codec::encode_png(raster).unwrap()).unwrap()
    }

    #[test]
    fn test_new_sanitises_thresholds() {
        let comparator = PixelComparator::new(f64::NAN, f64::NAN);
        assert!((comparator.threshold() - 0.8).abs() < f64::EPSILON);
        assert!((comparator.pixel_threshold() - 0.1).abs() < f64::EPSILON);

        let comparator = PixelComparator::new(1.5, -0.2);
        assert!((comparator.threshold() - 1.0).abs() < f64::EPSILON);
        assert!(comparator.pixel_threshold().abs() < f64::EPSILON);

        // A NaN threshold must not silently reject everything
        let img = solid(4, 4, [9, 9, 9, 255]);
        assert!(PixelComparator::new(f64::NAN, 0.1).compare(&img, &img).matched);
    }

    #[test]
    fn test_identical_rasters_match_fully() {
        let img = solid(10, 10, [40, 80, 120, 255]);
        let outcome = PixelComparator::new(1.0, 0.1).compare(&img, &img);
        assert!(outcome.matched);
        assert!((outcome.match_rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(outcome.reason, ComparisonReason::Success);
    }

    #[test]
    fn test_half_different_rate() {
        let white = solid(10, 10, [255, 255, 255, 255]);
        let outcome = PixelComparator::new(0.8, 0.1).compare(&white, &half_black());
        assert!(!outcome.matched);
        assert!((outcome.match_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(outcome.reason, ComparisonReason::LowMatchRate);

        let outcome = PixelComparator::new(0.5, 0.1).compare(&white, &half_black());
        assert!(outcome.matched);
    }

    #[test]
    fn test_size_gate() {
        let comparator = PixelComparator::default();
        let reference = solid(20, 20, [0, 0, 0, 255]);

        // Six pixels off on either axis is rejected, even for identical content
        for candidate in [solid(26, 20, [0, 0, 0, 255]), solid(20, 14, [0, 0, 0, 255])] {
            let outcome = comparator.compare(&candidate, &reference);
            assert_eq!(outcome.reason, ComparisonReason::SizeMismatch);
            assert!(!outcome.matched);
            assert!(outcome.match_rate.abs() < f64::EPSILON);
        }

        // Five pixels off is cropped and compared
        let outcome = comparator.compare(&solid(25, 15, [0, 0, 0, 255]), &reference);
        assert_eq!(outcome.reason, ComparisonReason::Success);
        assert!((outcome.match_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_crop_is_top_left() {
        // Candidate has an extra black column on the right; after cropping to the
        // reference width it disappears.
        let candidate: RasterImage = RgbaImage::from_fn(12, 10, |x, _| {
            if x >= 10 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
        .into();
        let reference = solid(10, 10, [255, 255, 255, 255]);

        let outcome = PixelComparator::new(1.0, 0.1).compare(&candidate, &reference);
        assert!(outcome.matched);
    }

    #[test]
    fn test_compare_encoded_parse_error() {
        let reference = solid(4, 4, [0, 0, 0, 255]);
        let outcome = PixelComparator::default().compare_encoded(b"not a png", &reference);
        assert_eq!(outcome.reason, ComparisonReason::ParseError);
        assert!(!outcome.matched);
        assert!(outcome.match_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_compare_encoded_png() {
        let reference = solid(4, 4, [9, 9, 9, 255]);
        let bytes = codec::encode_png(&reference).unwrap();
        assert!(PixelComparator::default().compare_encoded(&bytes, &reference).matched);
    }

    #[test]
    fn test_failing_sink_does_not_change_outcome() {
        let comparator = PixelComparator::new(0.8, 0.1);
        let white = solid(10, 10, [255, 255, 255, 255]);
        let reference = reference(&half_black());

        let expected = comparator.compare(&white, reference.decoded());
        let sink = FailingSink {
            calls: AtomicUsize::new(0),
        };
        let outcome = comparator.compare_and_record(&white, &reference, &sink);

        assert_eq!(outcome, expected);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sink_not_called_on_match() {
        let white = solid(10, 10, [255, 255, 255, 255]);
        let sink = FailingSink {
            calls: AtomicUsize::new(0),
        };
        let outcome = PixelComparator::default().compare_and_record(&white, &reference(&white), &sink);
        assert!(outcome.matched);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }
}
