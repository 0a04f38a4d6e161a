//! Diagnostics sink for candidates that failed to match.
//!
//! Persisting a failed candidate is best-effort. Callers log and discard the
//! [`Result`] of [`DiagnosticsSink::record_failed_match`]; a sink can never change
//! a comparison outcome.

use crate::codec::RasterImage;
use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Destination for non-matching candidate screenshots.
pub trait DiagnosticsSink: Send + Sync {
    /// Persists `candidate`, which matched `reference` at `match_rate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the candidate could not be persisted.
    fn record_failed_match(
        &self,
        candidate: &RasterImage,
        reference: &Path,
        match_rate: f64,
    ) -> Result<()>;
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticsSink for NoopSink {
    fn record_failed_match(&self, _: &RasterImage, _: &Path, _: f64) -> Result<()> {
        Ok(())
    }
}

/// Sink that writes PNG files into a directory, creating it on demand.
///
/// Every write takes the next value of a sequence shared by all clones of the
/// sink, so candidates recorded within the same millisecond keep distinct names.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    sequence: Arc<AtomicU64>,
}

impl DirectorySink {
    /// Creates a sink writing into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DiagnosticsSink for DirectorySink {
    #[instrument(
        name = "DirectorySink::record",
        skip_all,
        fields(reference = %reference.display(), match_rate = match_rate)
    )]
    fn record_failed_match(
        &self,
        candidate: &RasterImage,
        reference: &Path,
        match_rate: f64,
    ) -> Result<()> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(failed_match_file_name(
            Utc::now(),
            match_rate,
            reference,
            sequence,
        ));

        std::fs::create_dir_all(&self.dir).map_err(|e| Error::DiagnosticsWrite {
            path: path.clone(),
            source: image::ImageError::IoError(e),
        })?;

        candidate
            .as_rgba()
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|source| Error::DiagnosticsWrite {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "Saved failed candidate");
        Ok(())
    }
}

/// Builds the artifact name for a failed candidate:
/// `failed_<timestamp>_rate<percent>_<reference stem>_<sequence>.png`.
///
/// The timestamp is RFC 3339 in UTC with `:` and `.` replaced by `-`.
#[must_use]
pub fn failed_match_file_name(
    timestamp: DateTime<Utc>,
    match_rate: f64,
    reference: &Path,
    sequence: u64,
) -> String {
    let timestamp = timestamp
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    let percent = (match_rate.clamp(0.0, 1.0) * 100.0).round();
    let stem = reference
        .file_stem()
        .map_or_else(|| "reference".into(), |s| s.to_string_lossy());
    format!("failed_{timestamp}_rate{percent:.0}_{stem}_{sequence}.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    #[test]
    fn test_file_name_format() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap();
        let name = failed_match_file_name(ts, 0.734, Path::new("/refs/target.png"), 4);
        assert_eq!(name, "failed_2025-03-09T14-05-07-000Z_rate73_target_4.png");
    }

    #[test]
    fn test_file_name_clamps_rate() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let name = failed_match_file_name(ts, 1.7, Path::new("logo.jpg"), 0);
        assert!(name.ends_with("_rate100_logo_0.png"));
    }

    #[test]
    fn test_directory_sink_writes_png() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path().join("debug"));
        let raster = RasterImage::from(RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])));

        sink.record_failed_match(&raster, Path::new("target.png"), 0.5)
            .unwrap();

        let written: Vec<_> = std::fs::read_dir(sink.dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(written.len(), 1);
        let name = written[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("failed_"));
        assert!(name.ends_with("_rate50_target_0.png"));

        let decoded = crate::codec::decode(&std::fs::read(&written[0]).unwrap()).unwrap();
        assert_eq!(decoded, raster);
    }

    #[test]
    fn test_directory_sink_keeps_rapid_failures_apart() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path());
        let clone = sink.clone();

        for shade in 0..5u8 {
            let raster = RasterImage::from(RgbaImage::from_pixel(1, 1, Rgba([shade, 0, 0, 255])));
            let target = if shade % 2 == 0 { &sink } else { &clone };
            target
                .record_failed_match(&raster, Path::new("ref.png"), 0.0)
                .unwrap();
        }

        let count = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_directory_sink_unwritable_dir_errors() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("occupied");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let sink = DirectorySink::new(&blocker);
        let raster = RasterImage::from(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255])));
        let err = sink
            .record_failed_match(&raster, Path::new("target.png"), 0.1)
            .unwrap_err();
        assert!(matches!(err, Error::DiagnosticsWrite { .. }));
    }
}
