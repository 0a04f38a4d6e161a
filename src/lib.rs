//! # email-image-match
//!
//! Image-matching decision engine for webmail triage.
//!
//! Given a rendered page and a set of reference images, this crate decides whether
//! one of the references appears among the page's images. The caller uses the
//! answer to either follow the message's link and delete it, or restore it to
//! unread.
//!
//! This crate provides:
//! - Loading and caching reference images from a directory
//! - Lazily scanning a page for image elements, with a cheap size pre-filter
//! - Pixel comparison tolerant of small size and anti-aliasing differences
//! - A first-match-wins decision policy
//! - Best-effort diagnostics for candidates that did not match
//!
//! Page automation is not part of this crate. Implement [`page::PageSurface`] on top
//! of your browser driver and hand it to [`ImageMatcher::find_target_image`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use email_image_match::{ImageMatcher, MatchConfig, ReferenceImageSet};
//! use email_image_match::page::PageSurface;
//! use email_image_match::triage::MessageAction;
//!
//! # async fn example<P: PageSurface>(page: &P) -> email_image_match::Result<()> {
//! // Load references once per run
//! let config = MatchConfig::builder().images_dir("./images").build()?;
//! let references = ReferenceImageSet::load(&config.images_dir)?;
//! let matcher = ImageMatcher::new(config);
//!
//! // For each opened message
//! let result = matcher.find_target_image(page, &references).await;
//! match MessageAction::from(&result) {
//!     MessageAction::FollowAndDelete { reference_path, .. } => {
//!         println!("found {}", reference_path.display());
//!     }
//!     MessageAction::RestoreUnread => println!("no target image"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Comparing Images Directly
//!
//! ```
//! use email_image_match::comparator::PixelComparator;
//! use email_image_match::RasterImage;
//!
//! let a = RasterImage::from_rgba(2, 2, vec![0; 16]).unwrap();
//! let b = RasterImage::from_rgba(3, 2, vec![0; 24]).unwrap();
//!
//! // Sizes within 5 pixels are cropped to the common area before comparing
//! let outcome = PixelComparator::new(0.8, 0.1).compare(&a, &b);
//! assert!(outcome.matched);
//! ```
//!
//! ## Error Handling
//!
//! Only configuration and reference loading return errors. Everything that can
//! go wrong while scanning a page degrades to "no match for this element" and is
//! logged. [`Error::is_localized`] tells the two apart:
//!
//! ```
//! use email_image_match::Error;
//!
//! fn handle_error(error: &Error) {
//!     if error.is_localized() {
//!         println!("Skipped one item: {}", error);
//!     } else {
//!         println!("Cannot run: {}", error);
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. Install a subscriber in your
//! application to see the events.
//!
//! ### Span Naming Convention
//!
//! - `ReferenceImageSet::load` - Reference loading
//! - `ImageMatcher::find_target_image` - One match attempt
//! - `scanner::scan` - Element enumeration and load wait
//! - `PixelComparator::compare` - One candidate/reference comparison
//! - `DirectorySink::record` - Diagnostics write
//!
//! ### Standard Fields
//!
//! - `reference` - Reference image path
//! - `match_rate` - Fraction of matching pixels
//! - `reason` - Comparison outcome reason
//! - `candidate_index` - Element position in document order

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod codec;
pub mod comparator;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod matcher;
pub mod page;
pub mod reference;
pub mod scanner;
pub mod triage;

// Internal modules
mod diff;

// Re-exports for ergonomic API
pub use codec::RasterImage;
pub use comparator::{ComparisonOutcome, ComparisonReason, PixelComparator};
pub use config::{MatchConfig, MatchConfigBuilder};
pub use diagnostics::{DiagnosticsSink, DirectorySink, NoopSink};
pub use error::{Error, ErrorCategory, Result};
pub use matcher::{ImageMatcher, MatchResult, TargetMatch};
pub use reference::{ReferenceImage, ReferenceImageSet};
