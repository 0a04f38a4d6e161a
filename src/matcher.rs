//! Match decision policy: is any reference image present on the page?
//!
//! [`ImageMatcher`] ties the scanner and the comparator together. Candidates are
//! pulled from the scanner one at a time, in document order, and each is compared
//! against every reference in set order. The first pair that matches wins and the
//! scan stops there.
//!
//! # Example
//!
//! ```no_run
//! use email_image_match::{ImageMatcher, MatchConfig, ReferenceImageSet};
//! use email_image_match::page::PageSurface;
//!
//! # async fn example<P: PageSurface>(page: &P) -> email_image_match::Result<()> {
//! let config = MatchConfig::from_env()?;
//! let references = ReferenceImageSet::load(&config.images_dir)?;
//! let matcher = ImageMatcher::new(config);
//!
//! let result = matcher.find_target_image(page, &references).await;
//! if let Some(hit) = result.target() {
//!     println!("matched {} at {:.2}", hit.reference_path.display(), hit.match_rate);
//! }
//! # Ok(())
//! # }
//! ```

use crate::comparator::PixelComparator;
use crate::config::MatchConfig;
use crate::diagnostics::{DiagnosticsSink, DirectorySink};
use crate::page::PageSurface;
use crate::reference::ReferenceImageSet;
use crate::scanner::{self, CandidateElement};
use futures::StreamExt;
use std::path::PathBuf;
use std::pin::pin;
use tracing::{debug, info, instrument};

/// A confirmed hit.
#[derive(Debug, Clone)]
pub struct TargetMatch<E> {
    /// The matching element. The page still owns the underlying node.
    pub element: CandidateElement<E>,
    /// Path of the reference image that matched.
    pub reference_path: PathBuf,
    /// Match rate of the winning comparison.
    pub match_rate: f64,
}

/// Outcome of [`ImageMatcher::find_target_image`].
#[derive(Debug, Clone)]
pub enum MatchResult<E> {
    /// A candidate matched a reference.
    Found(TargetMatch<E>),
    /// Nothing on the page matched.
    NotFound,
}

impl<E> MatchResult<E> {
    /// Returns `true` for [`MatchResult::Found`].
    #[must_use]
    pub fn found(&self) -> bool {
        matches!(self, MatchResult::Found(_))
    }

    /// Returns the hit, if any.
    #[must_use]
    pub fn target(&self) -> Option<&TargetMatch<E>> {
        match self {
            MatchResult::Found(hit) => Some(hit),
            MatchResult::NotFound => None,
        }
    }

    /// Consumes the result and returns the hit, if any.
    #[must_use]
    pub fn into_target(self) -> Option<TargetMatch<E>> {
        match self {
            MatchResult::Found(hit) => Some(hit),
            MatchResult::NotFound => None,
        }
    }
}

/// Searches rendered pages for reference images.
///
/// Create with [`ImageMatcher::new`] (diagnostics written to
/// [`MatchConfig::debug_dir`]) or [`ImageMatcher::with_sink`].
pub struct ImageMatcher<S = DirectorySink> {
    config: MatchConfig,
    comparator: PixelComparator,
    sink: S,
}

impl ImageMatcher<DirectorySink> {
    /// Creates a matcher that saves failed candidates under `config.debug_dir`.
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        let sink = DirectorySink::new(config.debug_dir.clone());
        Self::with_sink(config, sink)
    }
}

impl<S: DiagnosticsSink> ImageMatcher<S> {
    /// Creates a matcher with a custom diagnostics sink.
    #[must_use]
    pub fn with_sink(config: MatchConfig, sink: S) -> Self {
        let comparator = PixelComparator::new(config.threshold, config.pixel_threshold);
        Self {
            config,
            comparator,
            sink,
        }
    }

    /// Returns the configuration in use.
    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Looks for any reference image among the page's image elements.
    ///
    /// Returns [`MatchResult::NotFound`] without touching the page when
    /// `references` is empty. Page and decode failures on individual elements are
    /// logged and treated as non-matches; this never fails.
    #[instrument(
        name = "ImageMatcher::find_target_image",
        skip_all,
        fields(
            references = references.len(),
            threshold = self.config.threshold,
            pixel_threshold = self.config.pixel_threshold
        )
    )]
    pub async fn find_target_image<P: PageSurface>(
        &self,
        page: &P,
        references: &ReferenceImageSet,
    ) -> MatchResult<P::Element> {
        if references.is_empty() {
            debug!("No reference images, skipping scan");
            return MatchResult::NotFound;
        }

        let mut candidates = pin!(scanner::scan(page, references, self.config.load_timeout));
        let mut scanned = 0usize;

        while let Some(candidate) = candidates.next().await {
            scanned += 1;

            for reference in references {
                let outcome =
                    self.comparator
                        .compare_and_record(&candidate.raster, reference, &self.sink);

                if outcome.matched {
                    info!(
                        reference = %reference.path().display(),
                        match_rate = outcome.match_rate,
                        candidates_scanned = scanned,
                        "Target image found"
                    );
                    return MatchResult::Found(TargetMatch {
                        element: candidate.element,
                        reference_path: reference.path().to_path_buf(),
                        match_rate: outcome.match_rate,
                    });
                }
            }
        }

        info!(candidates_scanned = scanned, "No target image found");
        MatchResult::NotFound
    }
}

impl<S> std::fmt::Debug for ImageMatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageMatcher")
            .field("config", &self.config)
            .field("comparator", &self.comparator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::BoundingBox;

    #[test]
    fn test_match_result_accessors() {
        let hit = MatchResult::Found(TargetMatch {
            element: CandidateElement {
                handle: 7u32,
                bounding_box: BoundingBox::new(10.0, 10.0),
            },
            reference_path: PathBuf::from("target.png"),
            match_rate: 0.93,
        });
        assert!(hit.found());
        assert_eq!(hit.target().map(|t| t.element.handle), Some(7));
        assert_eq!(
            hit.into_target().map(|t| t.reference_path),
            Some(PathBuf::from("target.png"))
        );

        let miss: MatchResult<u32> = MatchResult::NotFound;
        assert!(!miss.found());
        assert!(miss.target().is_none());
    }

    #[test]
    fn test_new_uses_debug_dir() {
        let config = MatchConfig::builder()
            .debug_dir("/tmp/matcher-debug")
            .build()
            .unwrap();
        let matcher = ImageMatcher::new(config);
        assert_eq!(matcher.sink.dir(), std::path::Path::new("/tmp/matcher-debug"));
        assert!(format!("{matcher:?}").contains("ImageMatcher"));
    }
}
